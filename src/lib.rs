//! # SmallFn: Allocator-Aware Type-Erased Callables
//!
//! [`SmallFn`] holds any callable matching a fixed signature, like `Box<dyn FnMut(..)>`, but
//! stores small callables inline and only asks an allocator for storage when the callable
//! does not fit. Unlike a `Box`, it is a value: copying a function copies its callable into
//! independent storage, and the original concrete callable can be recovered by type.
//!
//! ## Core Concept
//!
//! A callable is wrapped and erased behind a dispatch interface (see [`dispatch`]). When a
//! function acquires a callable it decides, once, where the wrapper lives:
//!
//! - **inline**, in the function's own buffer, if it fits the buffer's size and alignment;
//! - **external**, in a block from the function's [`Alloc`], sized exactly to the wrapper.
//!
//! ## Quick Start
//!
//! ```rust
//! use smallfn::SmallFn;
//! use smallfn::space::S4;
//!
//! let prefix = String::from("hello");
//! let mut greet: SmallFn<fn(&'static str) -> String, S4> =
//!     SmallFn::new(move |name: &'static str| format!("{prefix} {name}"));
//! assert!(greet.is_inline());
//!
//! let mut copy = greet.clone();
//! assert_eq!(copy.call("world").unwrap(), "hello world");
//!
//! // An empty function reports an error instead of calling anything
//! let mut empty: SmallFn<fn()> = SmallFn::empty();
//! assert!(empty.call().is_err());
//! ```
//!
//! ## Configuration
//!
//! ### Feature Flags
//!
//! - **`std`** (enabled by default)
//!   - Links to the standard library
//!   - Disable for `#![no_std]` environments: `default-features = false`
//!
//! - **`nightly`** (optional, requires nightly)
//!   - Rebuilds inline trait object pointers with the strict provenance API
//!
//! ### Inline Capacity
//!
//! The second parameter selects the inline capacity, see [`space`]. The buffer is rounded up
//! to the alignment of a pointer and of the allocator, so `[u8; 20]` gives 24 bytes on 64-bit
//! targets:
//!
//! ```rust
//! use smallfn::SmallFn;
//!
//! type MyFn = SmallFn<fn() -> u8, [u8; 20]>;
//! assert_eq!(MyFn::INLINE_CAPACITY, 20usize.next_multiple_of(core::mem::align_of::<usize>()));
//! ```
//!
//! **Important**: Alignment matters! A callable whose alignment exceeds the buffer alignment
//! is stored externally regardless of its size.
//!
//! ### Allocators
//!
//! The third parameter is the allocator, [`Global`] by default. The allocator travels with the
//! function through copies and moves; see [`Alloc`] for the contract.
//!
//! ### Copyable and Move-Only Functions
//!
//! By default a function is [`Clone`] and only accepts `Clone` callables. Anything else is
//! rejected at compile time:
//!
//! ```compile_fail
//! use smallfn::SboFunction;
//! use smallfn::space::S2;
//!
//! struct Token;
//! let token = Token;
//! let f: SboFunction<fn(), S2> = SboFunction::new(move || drop(&token));
//! ```
//!
//! [`UniqueFunction`] lifts the requirement and drops the copy operations instead:
//!
//! ```rust
//! use smallfn::UniqueFunction;
//!
//! struct Token;
//! let token = Token;
//! let mut f: UniqueFunction<fn() -> usize> = UniqueFunction::new(move || core::mem::size_of_val(&token));
//! assert_eq!(f.call(), Ok(0));
//! ```
//!
//! ## Advanced Usage
//!
//! ### Recovering the Callable
//!
//! ```rust
//! use smallfn::Function;
//!
//! fn answer() -> u32 {
//!     42
//! }
//!
//! let f: Function<fn() -> u32> = Function::from_fn(answer);
//! assert!(f.type_identity().is::<fn() -> u32>());
//! assert!(f.target::<fn() -> u32>().is_some());
//! assert!(f.target::<fn() -> u64>().is_none());
//! ```
//!
//! ### Swapping
//!
//! [`SmallFn::swap`] refuses to exchange storage between functions whose allocators do not
//! compare equal.

#![cfg_attr(feature = "nightly", feature(strict_provenance, set_ptr_value))]
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(stable_features)]
#![deny(missing_docs)]
#![deny(clippy::as_conversions)]

extern crate alloc;

pub mod allocator;
pub mod dispatch;
mod error;
mod identity;
pub mod signature;
mod smallfn;
pub mod space;
mod sptr;

pub use crate::allocator::{Alloc, AllocError, Global};
pub use crate::dispatch::{ByRef, Copyable, MoveOnly};
pub use crate::error::Error;
pub use crate::identity::TypeIdentity;
pub use crate::signature::{Invoke, Signature};
pub use crate::smallfn::SmallFn;

use crate::space::S0;

/// A copyable function without inline buffer, using the global allocator.
pub type Function<S> = SmallFn<S, S0, Global, Copyable>;

/// A copyable function without inline buffer, using the allocator `A`.
pub type AaFunction<S, A> = SmallFn<S, S0, A, Copyable>;

/// A copyable function with inline capacity `Space`, using the global allocator.
pub type SboFunction<S, Space> = SmallFn<S, Space, Global, Copyable>;

/// A move-only function, which can store callables that are not `Clone`.
pub type UniqueFunction<S, Space = space::S4, A = Global> = SmallFn<S, Space, A, MoveOnly>;
