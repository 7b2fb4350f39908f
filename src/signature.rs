//! Call signatures, written as function pointer types.
//!
//! A [`SmallFn<fn(i32, &'static str) -> bool>`](crate::SmallFn) stores any callable that can be
//! called as `FnMut(i32, &'static str) -> bool`. Signatures with up to eight arguments are
//! supported. Arguments are forwarded exactly as declared.
//!
//! The signature is matched through [`Invoke`], which the compiler does not use to infer closure
//! parameters: annotate them, as in `|x: i32| x > 0`.
//!
//! Higher-ranked signatures such as `fn(&str)` (which is `for<'a> fn(&'a str)`) are not
//! signatures; spell out the lifetime instead.

use crate::allocator::Alloc;
use crate::dispatch::Kind;
use crate::{Error, SmallFn};

mod private {
    pub trait Sealed {}
}

/// A call signature `fn(A0, A1, ...) -> R`.
pub trait Signature: Copy + private::Sealed {
    /// The argument list, as a tuple.
    type Args;
    /// The return type.
    type Output;
}

/// Callables which can be called with the arguments of the signature `S`.
///
/// Implemented for every `FnMut` closure, function item and function pointer with matching
/// arguments and return type.
pub trait Invoke<S: Signature> {
    /// Calls `self` with the unpacked argument tuple.
    fn invoke(&mut self, args: S::Args) -> S::Output;
}

macro_rules! signature {
    ($($arg:ident),*) => {
        impl<R, $($arg,)*> private::Sealed for fn($($arg),*) -> R {}

        impl<R, $($arg,)*> Signature for fn($($arg),*) -> R {
            type Args = ($($arg,)*);
            type Output = R;
        }

        impl<Func, R, $($arg,)*> Invoke<fn($($arg),*) -> R> for Func
        where
            Func: FnMut($($arg),*) -> R,
        {
            #[inline]
            #[allow(non_snake_case)]
            fn invoke(&mut self, ($($arg,)*): ($($arg,)*)) -> R {
                self($($arg),*)
            }
        }

        impl<R, $($arg,)* Space, A: Alloc, K: Kind> SmallFn<fn($($arg),*) -> R, Space, A, K> {
            /// Calls the stored callable and returns its result.
            ///
            /// Returns [`Error::EmptyCall`] if the function is empty.
            #[inline]
            #[allow(non_snake_case, clippy::too_many_arguments)]
            pub fn call(&mut self, $($arg: $arg),*) -> Result<R, Error> {
                self.apply(($($arg,)*))
            }
        }
    };
}

signature!();
signature!(A0);
signature!(A0, A1);
signature!(A0, A1, A2);
signature!(A0, A1, A2, A3);
signature!(A0, A1, A2, A3, A4);
signature!(A0, A1, A2, A3, A4, A5);
signature!(A0, A1, A2, A3, A4, A5, A6);
signature!(A0, A1, A2, A3, A4, A5, A6, A7);
