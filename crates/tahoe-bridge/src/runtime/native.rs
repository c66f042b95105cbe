//! The Objective-C runtime of the host process (macOS).
//!
//! `objc_msgSend` is declared without a signature and cast to one typed
//! function pointer per call shape, so struct arguments and returns follow
//! the platform ABI. On x86_64 a returned `NSRect` goes through
//! `objc_msgSend_stret`.

use std::ffi::{CStr, c_char, c_void};
use std::mem;

use super::{Imp, Runtime};
use crate::geometry::Geometry;
use crate::handle::{Id, Sel};

#[cfg(target_arch = "aarch64")]
type Bool = bool;
#[cfg(not(target_arch = "aarch64"))]
type Bool = i8;

#[cfg(target_arch = "aarch64")]
const fn objc_bool(value: bool) -> Bool {
    value
}
#[cfg(not(target_arch = "aarch64"))]
const fn objc_bool(value: bool) -> Bool {
    value as i8
}

#[cfg(target_arch = "aarch64")]
const fn from_objc_bool(value: Bool) -> bool {
    value
}
#[cfg(not(target_arch = "aarch64"))]
const fn from_objc_bool(value: Bool) -> bool {
    value != 0
}

/// `OBJC_ASSOCIATION_ASSIGN`: no retain, no copy.
const ASSOCIATION_ASSIGN: usize = 0;

/// Bit marking a non-pointer isa, whose class bits sit under `ISA_MASK`.
const NONPOINTER_ISA: usize = 1;

#[cfg(target_arch = "aarch64")]
const ISA_MASK: usize = 0x0000_000f_ffff_fff8;
#[cfg(not(target_arch = "aarch64"))]
const ISA_MASK: usize = 0x0000_7fff_ffff_fff8;

#[cfg(target_arch = "aarch64")]
const TAG_MASK: usize = 1 << 63;
#[cfg(not(target_arch = "aarch64"))]
const TAG_MASK: usize = 1;

#[link(name = "objc")]
unsafe extern "C" {
    fn objc_getClass(name: *const c_char) -> Id;
    fn sel_registerName(name: *const c_char) -> *mut c_void;
    fn objc_allocateClassPair(superclass: Id, name: *const c_char, extra_bytes: usize) -> Id;
    fn class_addMethod(class: Id, name: Sel, imp: Imp, types: *const c_char) -> Bool;
    fn objc_registerClassPair(class: Id);
    fn objc_disposeClassPair(class: Id);
    fn objc_setAssociatedObject(object: Id, key: *const c_void, value: Id, policy: usize);
    fn objc_getAssociatedObject(object: Id, key: *const c_void) -> Id;

    fn objc_msgSend();
    #[cfg(target_arch = "x86_64")]
    fn objc_msgSend_stret();
}

// NSNumber and NSTimer live here
#[link(name = "Foundation", kind = "framework")]
unsafe extern "C" {}

/// Casts `objc_msgSend` to the typed signature `F`.
///
/// # Safety
///
/// `F` must be an `unsafe extern "C" fn` pointer type matching the callee.
unsafe fn msg_send<F: Copy>() -> F {
    let untyped: unsafe extern "C" fn() = objc_msgSend;
    // SAFETY: function pointers share one size; the signature is the
    // caller's promise
    unsafe { mem::transmute_copy(&untyped) }
}

#[cfg(target_arch = "x86_64")]
unsafe fn msg_send_geometry_return<F: Copy>() -> F {
    let untyped: unsafe extern "C" fn() = objc_msgSend_stret;
    unsafe { mem::transmute_copy(&untyped) }
}

#[cfg(not(target_arch = "x86_64"))]
unsafe fn msg_send_geometry_return<F: Copy>() -> F {
    unsafe { msg_send() }
}

/// The process's Objective-C runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

// SAFETY: each primitive casts objc_msgSend to exactly its shape, and
// `type_descriptor` reads one word.
unsafe impl Runtime for Native {
    fn class_named(name: &CStr) -> Id {
        // SAFETY: `name` is NUL-terminated
        unsafe { objc_getClass(name.as_ptr()) }
    }

    fn register_selector(name: &CStr) -> Option<Sel> {
        // SAFETY: `name` is NUL-terminated
        Sel::from_ptr(unsafe { sel_registerName(name.as_ptr()) })
    }

    unsafe fn allocate_class(superclass: Id, name: &CStr) -> Id {
        unsafe { objc_allocateClassPair(superclass, name.as_ptr(), 0) }
    }

    unsafe fn add_method(class: Id, sel: Sel, imp: Imp, types: &CStr) -> bool {
        from_objc_bool(unsafe { class_addMethod(class, sel, imp, types.as_ptr()) })
    }

    unsafe fn register_class(class: Id) {
        unsafe { objc_registerClassPair(class) }
    }

    unsafe fn dispose_class(class: Id) {
        unsafe { objc_disposeClassPair(class) }
    }

    unsafe fn set_associated(object: Id, key: *const c_void, value: usize) {
        unsafe { objc_setAssociatedObject(object, key, Id::from_addr(value), ASSOCIATION_ASSIGN) }
    }

    unsafe fn associated(object: Id, key: *const c_void) -> usize {
        unsafe { objc_getAssociatedObject(object, key) }.addr()
    }

    unsafe fn type_descriptor(object: Id) -> usize {
        let raw = unsafe { object.as_ptr().cast::<usize>().read() };
        if raw & NONPOINTER_ISA != 0 {
            raw & ISA_MASK
        } else {
            raw
        }
    }

    fn is_tagged_pointer(id: Id) -> bool {
        id.addr() & TAG_MASK != 0
    }

    unsafe fn send_handle(receiver: Id, sel: Sel) -> Id {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel) -> Id = msg_send();
            f(receiver, sel)
        }
    }

    unsafe fn send_utf8(receiver: Id, sel: Sel, text: *const c_char) -> Id {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel, *const c_char) -> Id = msg_send();
            f(receiver, sel, text)
        }
    }

    unsafe fn send_geometry(receiver: Id, sel: Sel, rect: Geometry) -> Id {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel, Geometry) -> Id = msg_send();
            f(receiver, sel, rect)
        }
    }

    unsafe fn send_geometry_words_flag(
        receiver: Id,
        sel: Sel,
        rect: Geometry,
        first: u64,
        second: u64,
        flag: bool,
    ) -> Id {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel, Geometry, u64, u64, Bool) -> Id = msg_send();
            f(receiver, sel, rect, first, second, objc_bool(flag))
        }
    }

    unsafe fn send_void_handle(receiver: Id, sel: Sel, argument: Id) {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel, Id) = msg_send();
            f(receiver, sel, argument);
        }
    }

    unsafe fn send_void(receiver: Id, sel: Sel) {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel) = msg_send();
            f(receiver, sel);
        }
    }

    unsafe fn send_void_flag(receiver: Id, sel: Sel, flag: bool) {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel, Bool) = msg_send();
            f(receiver, sel, objc_bool(flag));
        }
    }

    unsafe fn send_returning_geometry(receiver: Id, sel: Sel) -> Geometry {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel) -> Geometry = msg_send_geometry_return();
            f(receiver, sel)
        }
    }

    unsafe fn send_returning_word(receiver: Id, sel: Sel) -> u64 {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel) -> u64 = msg_send();
            f(receiver, sel)
        }
    }

    unsafe fn send_word(receiver: Id, sel: Sel, value: u64) -> Id {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel, u64) -> Id = msg_send();
            f(receiver, sel, value)
        }
    }

    unsafe fn send_schedule_timer(
        receiver: Id,
        sel: Sel,
        interval: f64,
        target: Id,
        action: Sel,
        payload: Id,
        repeats: bool,
    ) -> Id {
        unsafe {
            let f: unsafe extern "C" fn(Id, Sel, f64, Id, Sel, Id, Bool) -> Id = msg_send();
            f(receiver, sel, interval, target, action, payload, objc_bool(repeats))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foundation_classes_resolve() {
        assert!(!Native::class_named(c"NSObject").is_nil());
        assert!(!Native::class_named(c"NSNumber").is_nil());
        assert!(Native::class_named(c"TahoeNoSuchClass").is_nil());
    }

    #[test]
    fn test_number_round_trip() {
        let class = Native::class_named(c"NSNumber");
        let make = Native::register_selector(c"numberWithUnsignedLongLong:").unwrap();
        let read = Native::register_selector(c"unsignedLongLongValue").unwrap();

        unsafe {
            let number = Native::send_word(class, make, 42);
            assert!(!number.is_nil());
            assert_eq!(Native::send_returning_word(number, read), 42);
        }
    }
}
