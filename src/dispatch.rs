//! The dispatch interface every stored callable is reached through.
//!
//! A [`SmallFn`](crate::SmallFn) never knows the concrete type of its callable. The callable is
//! wrapped in a [`Wrapper`] and erased to a trait object: `dyn Dispatch<S>` for move-only
//! functions, `dyn CloneDispatch<S>` for copyable ones. The function only keeps the trait object
//! metadata and the place where the wrapper lives.

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::identity::TypeIdentity;
use crate::signature::{Invoke, Signature};

/// Uniform interface over a wrapped callable.
///
/// # Safety
///
/// `layout` must be the layout of the implementing type, and `relocate_move` must leave a
/// valid value of the implementing type at `dest`. `raw_target` must point into `self`.
pub unsafe trait Dispatch<S: Signature> {
    /// Calls the wrapped callable.
    fn call(&mut self, args: S::Args) -> S::Output;

    /// Moves `self` into the uninitialized block at `dest`.
    ///
    /// # Safety
    ///
    /// `dest` must be valid for writes of `self.layout()`. Afterwards `self` is spent:
    /// it must not be used or dropped again.
    unsafe fn relocate_move(&mut self, dest: NonNull<u8>);

    /// The size and alignment of the wrapper.
    fn layout(&self) -> Layout;

    /// The static type identity of the wrapped callable.
    fn type_identity(&self) -> TypeIdentity;

    /// Untyped pointer to the wrapped callable.
    fn raw_target(&self) -> *const ();

    /// Untyped mutable pointer to the wrapped callable.
    fn raw_target_mut(&mut self) -> *mut ();
}

/// A [`Dispatch`] whose callable can be copied.
///
/// # Safety
///
/// `relocate_copy` must leave an independent valid value of the implementing type at `dest`.
pub unsafe trait CloneDispatch<S: Signature>: Dispatch<S> {
    /// Writes a copy of `self` into the uninitialized block at `dest`.
    ///
    /// # Safety
    ///
    /// `dest` must be valid for writes of `self.layout()`.
    unsafe fn relocate_copy(&self, dest: NonNull<u8>);
}

/// Holds exactly one callable and implements the dispatch interface for it.
#[repr(transparent)]
pub struct Wrapper<F> {
    callable: F,
}

impl<F> Wrapper<F> {
    pub(crate) fn new(callable: F) -> Wrapper<F> {
        Wrapper { callable }
    }
}

unsafe impl<F, S> Dispatch<S> for Wrapper<F>
where
    S: Signature,
    F: Invoke<S> + 'static,
{
    #[inline]
    fn call(&mut self, args: S::Args) -> S::Output {
        self.callable.invoke(args)
    }

    unsafe fn relocate_move(&mut self, dest: NonNull<u8>) {
        dest.cast::<Self>().as_ptr().write(ptr::read(self));
    }

    fn layout(&self) -> Layout {
        Layout::new::<Self>()
    }

    fn type_identity(&self) -> TypeIdentity {
        TypeIdentity::of::<F>()
    }

    fn raw_target(&self) -> *const () {
        ptr::addr_of!(self.callable).cast()
    }

    fn raw_target_mut(&mut self) -> *mut () {
        ptr::addr_of_mut!(self.callable).cast()
    }
}

unsafe impl<F, S> CloneDispatch<S> for Wrapper<F>
where
    S: Signature,
    F: Invoke<S> + Clone + 'static,
{
    unsafe fn relocate_copy(&self, dest: NonNull<u8>) {
        let copy = Wrapper::new(self.callable.clone());
        dest.cast::<Self>().as_ptr().write(copy);
    }
}

/// Calls a callable that lives outside of the function.
///
/// Copying a `ByRef` copies the reference, never the callable. Created by
/// [`SmallFn::set_ref`](crate::SmallFn::set_ref).
pub struct ByRef<F> {
    target: NonNull<F>,
}

impl<F> ByRef<F> {
    /// Binds to `target`.
    ///
    /// # Safety
    ///
    /// `target` must outlive every call made through the returned value and every copy of it,
    /// and must not be accessed through other references while such a call runs.
    pub unsafe fn new(target: &mut F) -> ByRef<F> {
        ByRef {
            target: NonNull::from(target),
        }
    }

    /// The address of the referenced callable.
    pub fn as_ptr(&self) -> *mut F {
        self.target.as_ptr()
    }
}

impl<F> Clone for ByRef<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for ByRef<F> {}

impl<F, S> Invoke<S> for ByRef<F>
where
    S: Signature,
    F: Invoke<S>,
{
    #[inline]
    fn invoke(&mut self, args: S::Args) -> S::Output {
        unsafe { self.target.as_mut().invoke(args) }
    }
}

mod private {
    pub trait Sealed {}
}

/// Selects the capabilities of a function: [`Copyable`] or [`MoveOnly`].
pub trait Kind: private::Sealed {
    /// The trait object stored callables are erased to.
    type Erased<S: Signature>: ?Sized + Dispatch<S>;
}

/// Functions which can be cloned; every stored callable must be `Clone`.
#[derive(Debug)]
pub enum Copyable {}

/// Functions which can only be moved; stored callables need not be `Clone`.
#[derive(Debug)]
pub enum MoveOnly {}

impl private::Sealed for Copyable {}
impl private::Sealed for MoveOnly {}

impl Kind for Copyable {
    type Erased<S: Signature> = dyn CloneDispatch<S>;
}

impl Kind for MoveOnly {
    type Erased<S: Signature> = dyn Dispatch<S>;
}

/// Callables of type `F` can be stored in functions of this kind with signature `S`.
#[diagnostic::on_unimplemented(
    message = "`{F}` cannot be stored in a `{Self}` function with signature `{S}`",
    label = "callable does not match the signature or lacks a required capability",
    note = "copyable functions only store `Clone` callables; use `UniqueFunction` for move-only callables"
)]
pub trait Erase<F, S: Signature>: Kind {
    #[doc(hidden)]
    fn erase(ptr: *mut Wrapper<F>) -> *mut Self::Erased<S>;
}

impl<F, S> Erase<F, S> for Copyable
where
    S: Signature,
    F: Invoke<S> + Clone + 'static,
{
    #[inline]
    fn erase(ptr: *mut Wrapper<F>) -> *mut dyn CloneDispatch<S> {
        ptr
    }
}

impl<F, S> Erase<F, S> for MoveOnly
where
    S: Signature,
    F: Invoke<S> + 'static,
{
    #[inline]
    fn erase(ptr: *mut Wrapper<F>) -> *mut dyn Dispatch<S> {
        ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{self, MaybeUninit};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_layout() {
        let wrapper = Wrapper::new(|x: u64| x + 1);
        let erased: &dyn Dispatch<fn(u64) -> u64> = &wrapper;
        assert_eq!(erased.layout().size(), mem::size_of_val(&wrapper.callable));

        let wrapper = Wrapper::new([0u8; 3]);
        assert_eq!(mem::size_of_val(&wrapper), 3);
    }

    fn uninit_like<T>(_: &T) -> MaybeUninit<T> {
        MaybeUninit::uninit()
    }

    #[test]
    fn test_relocate() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let mut wrapper = Wrapper::new(move || counter.set(counter.get() + 1));

        let mut copy = uninit_like(&wrapper);
        let mut moved = uninit_like(&wrapper);
        unsafe {
            let erased: &mut dyn CloneDispatch<fn()> = &mut wrapper;
            erased.relocate_copy(NonNull::from(&mut copy).cast());
            assert_eq!(Rc::strong_count(&hits), 3);

            erased.relocate_move(NonNull::from(&mut moved).cast());
            mem::forget(wrapper);
            assert_eq!(Rc::strong_count(&hits), 3);

            let copy: &mut dyn Dispatch<fn()> = copy.assume_init_mut();
            copy.call(());
            let moved: &mut dyn Dispatch<fn()> = moved.assume_init_mut();
            moved.call(());
            assert_eq!(hits.get(), 2);

            assert_eq!(copy.type_identity(), moved.type_identity());
            ptr::drop_in_place(copy);
            ptr::drop_in_place(moved);
        }
        assert_eq!(Rc::strong_count(&hits), 1);
    }

    #[test]
    fn test_by_ref() {
        let mut total = 0;
        let mut add = |x: i32| total += x;
        unsafe {
            let mut by_ref = ByRef::new(&mut add);
            let mut copy = by_ref;
            Invoke::<fn(i32)>::invoke(&mut by_ref, (2,));
            Invoke::<fn(i32)>::invoke(&mut copy, (3,));
        }
        assert_eq!(total, 5);
    }

    #[test]
    fn test_target() {
        let mut wrapper = Wrapper::new(|| 42u8);
        let erased: &mut dyn Dispatch<fn() -> u8> = &mut wrapper;
        assert_eq!(erased.raw_target(), erased.raw_target_mut().cast_const());
        assert_eq!(erased.call(()), 42);
    }
}
