use core::alloc::Layout;
use core::any::type_name;
use core::fmt;
use core::mem::{self, MaybeUninit};
use core::ptr::{self, NonNull};

use ::alloc::alloc::handle_alloc_error;
use log::{debug, trace};

use crate::allocator::{Alloc, Global};
use crate::dispatch::{ByRef, CloneDispatch, Copyable, Dispatch, Erase, Kind, Wrapper};
use crate::identity::TypeIdentity;
use crate::signature::Signature;
use crate::space::{Buffer, S4};
use crate::sptr;
use crate::Error;

/// Where the wrapper of a function lives.
enum Slot<E: ?Sized> {
    Empty,
    /// In the inline buffer. Only the trait object metadata is kept, the data half is
    /// the buffer address, which moves together with the function.
    Inline(*mut E),
    /// In a block obtained from the function's allocator.
    External { ptr: NonNull<E>, layout: Layout },
}

/// A type-erased callable that stores small callables inline and larger ones in storage
/// obtained from an allocator.
///
/// - `S` is the call signature, written as a function pointer type: `fn(i32) -> bool`.
/// - `Space` is the inline capacity, see [`space`](crate::space).
/// - `A` is the allocator used for callables which do not fit inline.
/// - `K` is [`Copyable`] (the default) or [`MoveOnly`](crate::dispatch::MoveOnly).
///
/// # Example
///
/// ```
/// use smallfn::SmallFn;
/// use smallfn::space::S2;
///
/// let offset = 10;
/// let mut add: SmallFn<fn(i32) -> i32, S2> = SmallFn::new(move |x: i32| x + offset);
/// assert!(add.is_inline());
/// assert_eq!(add.call(5), Ok(15));
///
/// let table = [1u64; 16];
/// let mut sum: SmallFn<fn() -> u64, S2> = SmallFn::new(move || table.iter().sum::<u64>());
/// assert!(sum.is_external());
/// assert_eq!(sum.call(), Ok(16));
/// ```
pub struct SmallFn<S: Signature, Space = S4, A: Alloc = Global, K: Kind = Copyable> {
    space: MaybeUninit<Buffer<Space, A>>,
    slot: Slot<K::Erased<S>>,
    alloc: A,
}

impl<S: Signature, Space, A: Alloc, K: Kind> SmallFn<S, Space, A, K> {
    /// Size in bytes of the inline buffer.
    ///
    /// This is the size of `Space` rounded up to the alignment of a pointer and of `A`.
    pub const INLINE_CAPACITY: usize = mem::size_of::<Buffer<Space, A>>();

    /// Alignment of the inline buffer.
    pub const INLINE_ALIGN: usize = mem::align_of::<Buffer<Space, A>>();

    /// Creates an empty function.
    pub fn empty() -> SmallFn<S, Space, A, K>
    where
        A: Default,
    {
        SmallFn::empty_in(A::default())
    }

    /// Creates an empty function which will use `alloc`.
    pub fn empty_in(alloc: A) -> SmallFn<S, Space, A, K> {
        SmallFn {
            space: MaybeUninit::uninit(),
            slot: Slot::Empty,
            alloc,
        }
    }

    /// Stores `callable` inline or, if it is too large or over-aligned for the inline buffer,
    /// in a block from the default allocator.
    ///
    /// Function items keep their own zero-sized type; use [`from_fn`](SmallFn::from_fn) to
    /// store a function pointer.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the allocator fails.
    pub fn new<F>(callable: F) -> SmallFn<S, Space, A, K>
    where
        A: Default,
        K: Erase<F, S>,
    {
        SmallFn::new_in(callable, A::default())
    }

    /// Like [`new`](SmallFn::new), with an explicit allocator.
    pub fn new_in<F>(callable: F, alloc: A) -> SmallFn<S, Space, A, K>
    where
        K: Erase<F, S>,
    {
        fatal_on_alloc(SmallFn::try_new_in(callable, alloc))
    }

    /// Like [`new_in`](SmallFn::new_in), but returns [`Error::Alloc`] if the allocator fails.
    pub fn try_new_in<F>(callable: F, alloc: A) -> Result<SmallFn<S, Space, A, K>, Error>
    where
        K: Erase<F, S>,
    {
        let mut function = SmallFn::empty_in(alloc);
        function.acquire(callable)?;
        Ok(function)
    }

    /// Stores a function pointer.
    ///
    /// The type identity of the result is the function pointer type `S`.
    ///
    /// ```
    /// use smallfn::Function;
    ///
    /// fn double(x: u32) -> u32 {
    ///     x * 2
    /// }
    ///
    /// let mut f: Function<fn(u32) -> u32> = Function::from_fn(double);
    /// assert!(f.type_identity().is::<fn(u32) -> u32>());
    /// assert_eq!(f.call(4), Ok(8));
    /// ```
    pub fn from_fn(f: S) -> SmallFn<S, Space, A, K>
    where
        A: Default,
        K: Erase<S, S>,
    {
        SmallFn::new(f)
    }

    /// Like [`from_fn`](SmallFn::from_fn), with an explicit allocator.
    pub fn from_fn_in(f: S, alloc: A) -> SmallFn<S, Space, A, K>
    where
        K: Erase<S, S>,
    {
        SmallFn::new_in(f, alloc)
    }

    /// Replaces the stored callable with `callable`. The allocator is kept.
    pub fn set<F>(&mut self, callable: F)
    where
        K: Erase<F, S>,
    {
        fatal_on_alloc(self.try_set(callable))
    }

    /// Like [`set`](SmallFn::set), but returns [`Error::Alloc`] if the allocator fails,
    /// in which case the function is left empty.
    pub fn try_set<F>(&mut self, callable: F) -> Result<(), Error>
    where
        K: Erase<F, S>,
    {
        self.release();
        self.acquire(callable)
    }

    /// Binds the function to `callable` without copying or moving it.
    ///
    /// Copies of the function share the same `callable`. The type identity becomes
    /// [`ByRef<F>`](ByRef).
    ///
    /// # Safety
    ///
    /// `callable` must outlive every call made through this function and its copies, and
    /// must not be accessed otherwise while such a call runs.
    pub unsafe fn set_ref<F>(&mut self, callable: &mut F)
    where
        K: Erase<ByRef<F>, S>,
    {
        self.set(ByRef::new(callable))
    }

    /// Moves the callable out into a new function, leaving `self` empty.
    ///
    /// An inline callable is relocated into the inline buffer of the result. An external block
    /// is handed over as is: nothing is allocated or deallocated.
    pub fn take(&mut self) -> SmallFn<S, Space, A, K> {
        let mut function = SmallFn::empty_in(self.alloc.clone());
        unsafe { function.transfer(self) };
        function
    }

    /// Move assignment: drops the current callable, adopts the allocator of `source` and
    /// takes its callable, leaving `source` empty.
    pub fn move_from(&mut self, source: &mut SmallFn<S, Space, A, K>) {
        self.release();
        self.alloc = source.alloc.clone();
        unsafe { self.transfer(source) };
    }

    /// Drops the stored callable, leaving the function empty.
    pub fn reset(&mut self) {
        self.release();
    }

    /// Exchanges the callables of two functions.
    ///
    /// Both allocators must compare equal, otherwise [`Error::AllocatorMismatch`] is returned
    /// and neither function is touched. When both callables are external the blocks are
    /// exchanged directly; otherwise the callables are moved through a temporary.
    pub fn swap(&mut self, other: &mut SmallFn<S, Space, A, K>) -> Result<(), Error> {
        if self.alloc != other.alloc {
            debug!(
                "refusing to swap {} with {}: allocators differ",
                self.type_identity(),
                other.type_identity()
            );
            return Err(Error::AllocatorMismatch);
        }

        if self.is_external() && other.is_external() {
            mem::swap(&mut self.slot, &mut other.slot);
        } else {
            let mut tmp = self.take();
            self.move_from(other);
            other.move_from(&mut tmp);
        }
        Ok(())
    }

    /// Returns true if no callable is stored.
    pub fn is_empty(&self) -> bool {
        matches!(self.slot, Slot::Empty)
    }

    /// Returns true if the callable is stored in the inline buffer.
    pub fn is_inline(&self) -> bool {
        matches!(self.slot, Slot::Inline(_))
    }

    /// Returns true if the callable is stored in a block from the allocator.
    pub fn is_external(&self) -> bool {
        matches!(self.slot, Slot::External { .. })
    }

    /// The allocator used for external storage.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Type identity of the stored callable, or [`TypeIdentity::none`] if empty.
    pub fn type_identity(&self) -> TypeIdentity {
        match self.handle() {
            Some(handle) => unsafe { (*handle).type_identity() },
            None => TypeIdentity::none(),
        }
    }

    /// Returns a reference to the stored callable if it is of type `T`.
    pub fn target<T: 'static>(&self) -> Option<&T> {
        let handle = self.handle()?;
        unsafe {
            if (*handle).type_identity().is::<T>() {
                Some(&*(*handle).raw_target().cast::<T>())
            } else {
                None
            }
        }
    }

    /// Returns a mutable reference to the stored callable if it is of type `T`.
    ///
    /// ```
    /// use smallfn::Function;
    ///
    /// fn one() -> u32 {
    ///     1
    /// }
    ///
    /// fn two() -> u32 {
    ///     2
    /// }
    ///
    /// let mut f: Function<fn() -> u32> = Function::from_fn(one);
    /// *f.target_mut::<fn() -> u32>().unwrap() = two;
    /// assert_eq!(f.call(), Ok(2));
    /// ```
    pub fn target_mut<T: 'static>(&mut self) -> Option<&mut T> {
        let handle = self.handle_mut()?;
        unsafe {
            if (*handle).type_identity().is::<T>() {
                Some(&mut *(*handle).raw_target_mut().cast::<T>())
            } else {
                None
            }
        }
    }

    /// Calls the stored callable with an argument tuple.
    ///
    /// Returns [`Error::EmptyCall`] if the function is empty.
    pub fn apply(&mut self, args: S::Args) -> Result<S::Output, Error> {
        let handle = self.handle_mut().ok_or(Error::EmptyCall)?;
        Ok(unsafe { (*handle).call(args) })
    }

    fn fits_inline(layout: Layout) -> bool {
        layout.size() <= Self::INLINE_CAPACITY && layout.align() <= Self::INLINE_ALIGN
    }

    fn handle(&self) -> Option<*const K::Erased<S>> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Inline(meta) => {
                let addr = self.space.as_ptr().cast_mut().cast::<u8>();
                Some(sptr::with_metadata_of_mut(addr, *meta).cast_const())
            }
            Slot::External { ptr, .. } => Some(ptr.as_ptr().cast_const()),
        }
    }

    fn handle_mut(&mut self) -> Option<*mut K::Erased<S>> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Inline(meta) => {
                let addr = self.space.as_mut_ptr().cast::<u8>();
                Some(sptr::with_metadata_of_mut(addr, *meta))
            }
            Slot::External { ptr, .. } => Some(ptr.as_ptr()),
        }
    }

    /// Places `callable` inline or externally. The function must be empty.
    fn acquire<F>(&mut self, callable: F) -> Result<(), Error>
    where
        K: Erase<F, S>,
    {
        debug_assert!(self.is_empty());

        let layout = Layout::new::<Wrapper<F>>();
        let wrapper = Wrapper::new(callable);

        if Self::fits_inline(layout) {
            let dest = self.space.as_mut_ptr().cast::<Wrapper<F>>();
            unsafe { dest.write(wrapper) };
            let meta = <K as Erase<F, S>>::erase(ptr::null_mut());
            self.slot = Slot::Inline(meta);
        } else {
            let block = self
                .alloc
                .allocate(layout)
                .map_err(|_| Error::Alloc(layout))?;
            trace!("allocated {} bytes for {}", layout.size(), type_name::<F>());

            let dest = block.cast::<Wrapper<F>>().as_ptr();
            unsafe { dest.write(wrapper) };
            let erased = <K as Erase<F, S>>::erase(dest);
            self.slot = Slot::External {
                ptr: unsafe { NonNull::new_unchecked(erased) },
                layout,
            };
        }
        Ok(())
    }

    /// Drops the stored callable and returns external storage to the allocator.
    fn release(&mut self) {
        match mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Empty => {}
            Slot::Inline(meta) => unsafe {
                let addr = self.space.as_mut_ptr().cast::<u8>();
                ptr::drop_in_place(sptr::with_metadata_of_mut(addr, meta));
            },
            Slot::External { ptr, layout } => unsafe {
                trace!(
                    "returning {} bytes of {}",
                    layout.size(),
                    ptr.as_ref().type_identity()
                );
                ptr::drop_in_place(ptr.as_ptr());
                self.alloc.deallocate(ptr.cast(), layout);
            },
        }
    }

    /// Moves the callable of `source` into `self`, leaving `source` empty.
    ///
    /// # Safety
    ///
    /// `self` must be empty, and its allocator must compare equal to the one of `source`.
    unsafe fn transfer(&mut self, source: &mut SmallFn<S, Space, A, K>) {
        debug_assert!(self.is_empty());

        match mem::replace(&mut source.slot, Slot::Empty) {
            Slot::Empty => {}
            Slot::Inline(meta) => {
                let addr = source.space.as_mut_ptr().cast::<u8>();
                let src = sptr::with_metadata_of_mut(addr, meta);
                (*src).relocate_move(NonNull::from(&mut self.space).cast());
                self.slot = Slot::Inline(meta);
            }
            external => self.slot = external,
        }
    }
}

impl<S: Signature, Space, A: Alloc> SmallFn<S, Space, A, Copyable> {
    /// Copies the function, allocating with a clone of its allocator if the callable is
    /// external. Returns [`Error::Alloc`] if the allocator fails.
    pub fn try_clone(&self) -> Result<SmallFn<S, Space, A, Copyable>, Error> {
        let mut function = SmallFn::empty_in(self.alloc.clone());
        function.copy_from(self)?;
        Ok(function)
    }

    /// Copy assignment: drops the current callable, adopts the allocator of `source` and
    /// copies its callable.
    ///
    /// If the allocator fails, `self` is left empty and [`Error::Alloc`] is returned.
    pub fn try_clone_from(&mut self, source: &SmallFn<S, Space, A, Copyable>) -> Result<(), Error> {
        self.release();
        self.alloc = source.alloc.clone();
        self.copy_from(source)
    }

    /// Copies the callable of `source` into `self`, which must be empty.
    fn copy_from(&mut self, source: &SmallFn<S, Space, A, Copyable>) -> Result<(), Error> {
        debug_assert!(self.is_empty());

        match &source.slot {
            Slot::Empty => {}
            Slot::Inline(meta) => unsafe {
                let addr = source.space.as_ptr().cast_mut().cast::<u8>();
                let src: *const dyn CloneDispatch<S> = sptr::with_metadata_of_mut(addr, *meta);
                (*src).relocate_copy(NonNull::from(&mut self.space).cast());
                self.slot = Slot::Inline(*meta);
            },
            Slot::External { ptr, .. } => unsafe {
                let src = ptr.as_ref();
                let layout = src.layout();
                let block = self
                    .alloc
                    .allocate(layout)
                    .map_err(|_| Error::Alloc(layout))?;
                trace!("allocated {} bytes for a copy of {}", layout.size(), src.type_identity());

                let guard = BlockGuard {
                    alloc: &self.alloc,
                    block,
                    layout,
                };
                src.relocate_copy(block);
                mem::forget(guard);

                let copy = sptr::with_metadata_of_mut(block.as_ptr(), ptr.as_ptr());
                self.slot = Slot::External {
                    ptr: NonNull::new_unchecked(copy),
                    layout,
                };
            },
        }
        Ok(())
    }
}

/// Returns a block to its allocator if copying into it unwinds.
struct BlockGuard<'a, A: Alloc> {
    alloc: &'a A,
    block: NonNull<u8>,
    layout: Layout,
}

impl<A: Alloc> Drop for BlockGuard<'_, A> {
    fn drop(&mut self) {
        unsafe { self.alloc.deallocate(self.block, self.layout) }
    }
}

fn fatal_on_alloc<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::Alloc(layout)) => handle_alloc_error(layout),
        Err(error) => unreachable!("{}", error),
    }
}

impl<S: Signature, Space, A: Alloc> Clone for SmallFn<S, Space, A, Copyable> {
    fn clone(&self) -> Self {
        fatal_on_alloc(self.try_clone())
    }

    fn clone_from(&mut self, source: &Self) {
        fatal_on_alloc(self.try_clone_from(source))
    }
}

impl<S: Signature, Space, A: Alloc, K: Kind> Drop for SmallFn<S, Space, A, K> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S: Signature, Space, A: Alloc + Default, K: Kind> Default for SmallFn<S, Space, A, K> {
    fn default() -> Self {
        SmallFn::empty()
    }
}

impl<S: Signature, Space, A: Alloc, K: Kind> fmt::Debug for SmallFn<S, Space, A, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let residency = match &self.slot {
            Slot::Empty => "empty",
            Slot::Inline(_) => "inline",
            Slot::External { .. } => "external",
        };
        f.debug_struct("SmallFn")
            .field("target", &self.type_identity())
            .field("residency", &residency)
            .finish()
    }
}
