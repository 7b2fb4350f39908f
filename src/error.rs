use core::alloc::Layout;

/// Errors raised by [`SmallFn`](crate::SmallFn) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The allocator could not provide external storage for a callable.
    #[error("allocation of {} bytes (align {}) failed", .0.size(), .0.align())]
    Alloc(Layout),

    /// An empty function was called.
    #[error("bad function call: the function is empty")]
    EmptyCall,

    /// Two functions whose allocators do not compare equal were swapped.
    #[error("cannot exchange storage between functions with unequal allocators")]
    AllocatorMismatch,
}

impl Error {
    /// Returns true if this is an allocation failure.
    pub fn is_alloc(&self) -> bool {
        matches!(self, Error::Alloc(_))
    }
}
