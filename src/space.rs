//! Space types which decide the inline capacity of a [`SmallFn`](crate::SmallFn).
//!
//! The actual inline buffer is the space rounded up so that it can host a pointer-aligned
//! wrapper and matches the alignment of the allocator stored beside it, see [`inline_capacity`].

/// No inline buffer: every callable that occupies memory is stored externally.
pub type S0 = [usize; 0];

/// Represents 1 * usize space
pub type S1 = [usize; 1];

/// Represents 2 * usize space
pub type S2 = [usize; 2];

/// Represents 4 * usize space
pub type S4 = [usize; 4];

/// Represents 8 * usize space
pub type S8 = [usize; 8];

/// Represents 16 * usize space
pub type S16 = [usize; 16];

/// Represents 32 * usize space
pub type S32 = [usize; 32];

/// Represents 64 * usize space
pub type S64 = [usize; 64];

/// Rounds `size` up to the next multiple of `align`.
///
/// This is the sizing rule of the inline buffer: the declared space is rounded up to the
/// larger of pointer alignment and allocator alignment, wasting at most one alignment unit.
///
/// ```
/// use smallfn::space::inline_capacity;
///
/// assert_eq!(inline_capacity(20, 8), 24);
/// assert_eq!(inline_capacity(24, 8), 24);
/// assert_eq!(inline_capacity(0, 8), 0);
/// ```
pub const fn inline_capacity(size: usize, align: usize) -> usize {
    (size / align + if size % align == 0 { 0 } else { 1 }) * align
}

/// The inline buffer embedded in every container.
///
/// The zero-length arrays only contribute alignment.
#[repr(C)]
pub(crate) struct Buffer<Space, A> {
    _space: Space,
    _ptr_align: [*const (); 0],
    _alloc_align: [A; 0],
}
