use std::ptr;

#[allow(dead_code)]
struct Sample(usize);

trait Callable {
    fn call(&self) -> usize;
}

impl Callable for Sample {
    fn call(&self) -> usize {
        self.0
    }
}

fn layout_broken(what: &str) {
    panic!(
        concat!(
            "Assumptions on layout are broken, smallfn rebuilds pointers to inline callables ",
            "by writing the data address into the first word of a trait object pointer, ",
            "which no longer holds for {:?}; build with the `nightly` feature or report it"
        ),
        what
    );
}

/// Checks that the data address is the first word of a trait object pointer, both for
/// pointers to real values and for the null-based pointers kept for inline callables.
fn test_dyn_layout() {
    #[repr(C)]
    struct DynObj {
        data_ptr: *const u8,
        vtable: *const u8,
    }

    let sample = Box::new(Sample(100));
    let data_ptr = Box::into_raw(sample);

    let trait_obj: *const dyn Callable = data_ptr;
    let repr: DynObj = unsafe { ptr::read(ptr::addr_of!(trait_obj).cast::<DynObj>()) };
    if repr.data_ptr != data_ptr.cast::<u8>() {
        layout_broken("trait objects");
    }

    let null_obj: *const dyn Callable = ptr::null::<Sample>();
    let null_repr: DynObj = unsafe { ptr::read(ptr::addr_of!(null_obj).cast::<DynObj>()) };
    if !null_repr.data_ptr.is_null() || null_repr.vtable != repr.vtable {
        layout_broken("null trait objects");
    }

    let out = unsafe { Box::from_raw(data_ptr) };
    assert_eq!(out.call(), 100);
}

fn main() {
    // NOTE: host layout may differ from target layout, this only catches the common case.
    test_dyn_layout();
}
