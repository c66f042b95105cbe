//! C entry points for hosts that link the bridge as a static library.
//!
//! Each export forwards to the dispatcher with the native runtime and maps
//! `Err` to nil, a zero rectangle or a no-op. Routing goes to the five
//! `route*` functions the host must define.

#![allow(non_snake_case)]

use std::ffi::{CStr, c_char, c_void};

use crate::construct;
use crate::diag;
use crate::dispatch;
use crate::error::{Error, HandleFault, Result};
use crate::geometry::Geometry;
use crate::handle::{self, Id, Sel};
use crate::relay::EventRouter;
use crate::runtime::native::Native;

unsafe extern "C" {
    fn routeMouseEvent(window: usize, kind: u32, button: u32, x: f64, y: f64, modifiers: u32);
    fn routeKeyboardEvent(window: usize, kind: u32, key_code: u32, character: u32, modifiers: u32);
    fn routeFocusEvent(window: usize, kind: u32);
    fn routeTickCallback(window: usize);
    fn routeWindowDidResize(window: usize, width: f64, height: f64);
}

/// Routes events to the host's `route*` functions.
pub struct ExternRouter;

impl EventRouter for ExternRouter {
    fn mouse_event(context: u64, kind: u32, button: u32, x: f64, y: f64, modifiers: u32) {
        // SAFETY: defined by the host with this signature
        unsafe { routeMouseEvent(context as usize, kind, button, x, y, modifiers) }
    }

    fn keyboard_event(context: u64, kind: u32, key_code: u32, character: u32, modifiers: u32) {
        unsafe { routeKeyboardEvent(context as usize, kind, key_code, character, modifiers) }
    }

    fn focus_event(context: u64, kind: u32) {
        unsafe { routeFocusEvent(context as usize, kind) }
    }

    fn tick_event(context: u64) {
        unsafe { routeTickCallback(context as usize) }
    }

    fn resize_event(context: u64, width: f64, height: f64) {
        unsafe { routeWindowDidResize(context as usize, width, height) }
    }
}

fn nil_on_error(result: Result<Id>) -> Id {
    result.unwrap_or(Id::NIL)
}

fn selector(operation: &'static str, raw: *mut c_void) -> Result<Sel> {
    let sel = Sel::from_ptr(raw).ok_or_else(|| Error::InvalidSelector {
        name: "(null)".to_string(),
    });
    diag::reported(operation, sel)
}

/// Reads a rectangle handed over by pointer.
unsafe fn geometry(operation: &'static str, rect: *const c_void) -> Result<Geometry> {
    let checked = handle::check_struct_pointer(rect)
        .map_err(|fault| Error::invalid_handle("rect", fault));
    diag::reported(operation, checked)?;
    // SAFETY: non-null and aligned; the host promises an NSRect behind it
    Ok(unsafe { rect.cast::<Geometry>().read() })
}

/// `-(id)sel` on an initialized receiver.
///
/// # Safety
///
/// `receiver` must be nil or a live object answering `selector` with this shape.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_wrapper(receiver: Id, selector: *mut c_void) -> Id {
    let op = "send";
    nil_on_error(
        self::selector(op, selector)
            .and_then(|sel| unsafe { dispatch::send::<Native>(receiver, sel) }),
    )
}

/// `-(id)sel:(const char *)text`.
///
/// # Safety
///
/// As [`objc_msgSend_wrapper`]; `text` must be nil or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_wrapper_string(
    receiver: Id,
    selector: *mut c_void,
    text: *const c_char,
) -> Id {
    let op = "send_utf8";
    nil_on_error(self::selector(op, selector).and_then(|sel| {
        if text.is_null() {
            let error = Error::invalid_handle("text", HandleFault::Null);
            diag::report(op, &error);
            return Err(error);
        }
        // SAFETY: non-null and NUL-terminated per the contract
        let text = unsafe { CStr::from_ptr(text) };
        unsafe { dispatch::send_c_str::<Native>(receiver, sel, text) }
    }))
}

/// `-(id)sel:(NSRect)rect`, with the rectangle passed by pointer.
///
/// # Safety
///
/// As [`objc_msgSend_wrapper`]; `rect` must point to an `NSRect`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_wrapper_rect(
    receiver: Id,
    selector: *mut c_void,
    rect: *const c_void,
) -> Id {
    let op = "send_geometry";
    nil_on_error(self::selector(op, selector).and_then(|sel| {
        let rect = unsafe { geometry(op, rect) }?;
        unsafe { dispatch::send_geometry::<Native>(receiver, sel, rect) }
    }))
}

/// `initWithContentRect:styleMask:backing:defer:` shape, with the rectangle
/// passed by pointer.
///
/// # Safety
///
/// As [`objc_msgSend_wrapper_rect`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_wrapper_4(
    receiver: Id,
    selector: *mut c_void,
    rect: *const c_void,
    first: usize,
    second: usize,
    flag: bool,
) -> Id {
    let op = "send_geometry_words_flag";
    nil_on_error(self::selector(op, selector).and_then(|sel| {
        let rect = unsafe { geometry(op, rect) }?;
        unsafe {
            dispatch::send_geometry_words_flag::<Native>(
                receiver,
                sel,
                rect,
                first as u64,
                second as u64,
                flag,
            )
        }
    }))
}

/// `-(void)sel:(id)argument`.
///
/// # Safety
///
/// As [`objc_msgSend_wrapper`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_void_1(receiver: Id, selector: *mut c_void, argument: Id) {
    let op = "send_void_object";
    let _ = self::selector(op, selector)
        .and_then(|sel| unsafe { dispatch::send_void_object::<Native>(receiver, sel, argument) });
}

/// `-(void)sel`.
///
/// # Safety
///
/// As [`objc_msgSend_wrapper`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_void_0(receiver: Id, selector: *mut c_void) {
    let op = "send_void";
    let _ = self::selector(op, selector)
        .and_then(|sel| unsafe { dispatch::send_void::<Native>(receiver, sel) });
}

/// `-(void)sel:(BOOL)flag`.
///
/// # Safety
///
/// As [`objc_msgSend_wrapper`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_void_1_bool(receiver: Id, selector: *mut c_void, flag: bool) {
    let op = "send_void_flag";
    let _ = self::selector(op, selector)
        .and_then(|sel| unsafe { dispatch::send_void_flag::<Native>(receiver, sel, flag) });
}

/// `-(NSRect)sel`. A rejected call returns a zero rectangle.
///
/// # Safety
///
/// As [`objc_msgSend_wrapper`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objc_msgSend_returns_NSRect(receiver: Id, selector: *mut c_void) -> Geometry {
    let op = "send_returning_geometry";
    self::selector(op, selector)
        .and_then(|sel| unsafe { dispatch::send_returning_geometry::<Native>(receiver, sel) })
        .unwrap_or_default()
}

/// Creates a window delegate routing resizes to `routeWindowDidResize`.
#[unsafe(no_mangle)]
pub extern "C" fn createWindowDelegate(window: usize) -> Id {
    nil_on_error(construct::create_window_delegate::<Native, ExternRouter>(window as u64))
}

/// Schedules a repeating timer routing ticks to `routeTickCallback`.
#[unsafe(no_mangle)]
pub extern "C" fn createAnimationTimer(window: usize, interval: f64) -> Id {
    nil_on_error(construct::create_animation_timer::<Native, ExternRouter>(
        window as u64,
        interval,
    ))
}
