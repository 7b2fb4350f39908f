//! The allocator contract used for external storage.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::sptr;

/// The allocator could not satisfy a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("memory allocation failed")]
pub struct AllocError;

/// Source of external storage for callables that do not fit inline.
///
/// # Safety
///
/// A block returned by `allocate` must be valid for reads and writes of `layout.size()` bytes
/// and aligned to `layout.align()`, until it is passed to `deallocate`.
///
/// A clone of an allocator must compare equal to it, and any allocator that compares equal to
/// the one which allocated a block must be able to deallocate that block. Functions rely on this
/// when they hand external storage over to another function.
pub unsafe trait Alloc: Clone + PartialEq {
    /// Allocates a block sized and aligned to `layout`.
    ///
    /// Zero-sized layouts are allowed.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Returns a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` of this allocator, or of one that compares
    /// equal to it, called with the same `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global memory allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Global;

unsafe impl Alloc for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            // never hand a zero-sized layout to the global allocator
            return NonNull::new(sptr::without_provenance_mut(layout.align())).ok_or(AllocError);
        }
        NonNull::new(unsafe { ::alloc::alloc::alloc(layout) }).ok_or(AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            ::alloc::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

unsafe impl<A: Alloc> Alloc for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}
