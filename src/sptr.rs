#[cfg(feature = "nightly")]
mod implementation {
    pub use core::ptr::without_provenance_mut;

    pub fn with_metadata_of_mut<U: ?Sized>(addr: *mut u8, meta: *mut U) -> *mut U {
        addr.with_metadata_of(meta.cast_const())
    }
}

#[cfg(not(feature = "nightly"))]
#[allow(clippy::as_conversions)]
mod implementation {
    use core::ptr::addr_of_mut;

    pub fn without_provenance_mut<T>(addr: usize) -> *mut T {
        addr as _
    }

    /// Puts `addr` into the data half of the (possibly fat) pointer `meta`.
    ///
    /// `build.rs` checks that the data pointer is the first word of a trait object.
    pub fn with_metadata_of_mut<U: ?Sized>(addr: *mut u8, mut meta: *mut U) -> *mut U {
        let meta_ptr = addr_of_mut!(meta).cast::<usize>();
        unsafe { meta_ptr.write(addr as usize) }
        meta
    }
}

pub use implementation::*;
