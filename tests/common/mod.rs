#![allow(dead_code)]

use std::alloc::Layout;
use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use smallfn::{Alloc, AllocError, Global};

#[derive(Debug, Default)]
struct Stats {
    allocations: Vec<Layout>,
    deallocations: Vec<Layout>,
    limit: Option<usize>,
}

/// Records every request and forwards it to the global allocator.
///
/// Clones share their records and compare equal; separately created allocators do not.
#[derive(Clone, Debug, Default)]
pub struct Counting {
    stats: Rc<RefCell<Stats>>,
}

impl Counting {
    pub fn new() -> Counting {
        Counting::default()
    }

    /// Fails every allocation after the first `limit` ones.
    pub fn with_limit(limit: usize) -> Counting {
        let counting = Counting::default();
        counting.stats.borrow_mut().limit = Some(limit);
        counting
    }

    pub fn allocations(&self) -> Vec<Layout> {
        self.stats.borrow().allocations.clone()
    }

    pub fn deallocations(&self) -> Vec<Layout> {
        self.stats.borrow().deallocations.clone()
    }

    pub fn live(&self) -> usize {
        let stats = self.stats.borrow();
        stats.allocations.len() - stats.deallocations.len()
    }
}

impl PartialEq for Counting {
    fn eq(&self, other: &Counting) -> bool {
        Rc::ptr_eq(&self.stats, &other.stats)
    }
}

unsafe impl Alloc for Counting {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let mut stats = self.stats.borrow_mut();
        if stats.limit.is_some_and(|limit| stats.allocations.len() >= limit) {
            return Err(AllocError);
        }
        let block = Global.allocate(layout)?;
        stats.allocations.push(layout);
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.stats.borrow_mut().deallocations.push(layout);
        Global.deallocate(ptr, layout)
    }
}

/// An allocator which never has memory.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Failing;

unsafe impl Alloc for Failing {
    fn allocate(&self, _layout: Layout) -> Result<NonNull<u8>, AllocError> {
        Err(AllocError)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!("nothing was allocated");
    }
}
