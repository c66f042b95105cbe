//! Typed message sends.
//!
//! One operation per [`CallShape`]. Each validates its receiver and arguments,
//! and on the first failure emits a diagnostic tagged with the operation name
//! and returns `Err` without calling into the runtime. Otherwise it delivers
//! the message through the matching [`Runtime`] primitive and returns the
//! result unchanged; a nil result is not an error at this level.
//!
//! Only [`send`] reads the receiver's type descriptor. The other operations
//! are used on receivers that may be freshly allocated, and stop at the
//! address checks.
//!
//! # Example
//!
//! ```
//! use tahoe_bridge::dispatch;
//! use tahoe_bridge::runtime::headless::Headless;
//! use tahoe_bridge::{Error, Geometry, Id};
//!
//! let class = dispatch::class::<Headless>(c"NSView").unwrap();
//! let alloc = dispatch::selector::<Headless>(c"alloc").unwrap();
//! let init = dispatch::selector::<Headless>(c"initWithFrame:").unwrap();
//!
//! unsafe {
//!     let view = dispatch::send::<Headless>(class, alloc).unwrap();
//!     let view = dispatch::send_geometry::<Headless>(view, init, Geometry::sized(320.0, 240.0));
//!     assert!(view.is_ok());
//!
//!     let rejected = dispatch::send_geometry::<Headless>(Id::NIL, init, Geometry::sized(1.0, 1.0));
//!     assert!(matches!(rejected, Err(Error::InvalidHandle { .. })));
//! }
//! ```

use std::ffi::{CStr, CString};

use crate::diag;
use crate::encoding::CallShape;
use crate::error::{Error, PayloadFault, Result};
use crate::geometry::Geometry;
use crate::handle::{self, Id, Provenance, Sel};
use crate::runtime::Runtime;

/// Checks a receiver. `Initialized` also checks its type descriptor.
unsafe fn check_receiver<R: Runtime>(receiver: Id, provenance: Provenance) -> Result<()> {
    // SAFETY: forwarded from the dispatcher's caller
    unsafe { handle::validate::<R>(receiver, provenance) }
        .map_err(|fault| Error::invalid_handle("receiver", fault))
}

/// Checks 1–3 on an object argument, if one was given.
fn check_optional<R: Runtime>(role: &'static str, argument: Id) -> Result<()> {
    if argument.is_nil() {
        return Ok(());
    }
    check_required::<R>(role, argument)
}

/// Checks 1–3 on an object argument.
fn check_required<R: Runtime>(role: &'static str, argument: Id) -> Result<()> {
    // SAFETY: `Fresh` never reads through the handle
    unsafe { handle::validate::<R>(argument, Provenance::Fresh) }
        .map_err(|fault| Error::invalid_handle(role, fault))
}

fn check_word(name: &'static str, value: u64) -> Result<()> {
    if value > u64::from(u32::MAX) {
        return Err(PayloadFault::WordOutOfRange { name, value }.into());
    }
    Ok(())
}

fn trace_call(operation: &'static str, receiver: Id, sel: Sel) {
    tahoe_log::trace!(target: operation, "{receiver:?} {sel:?}");
}

/// Resolves a selector name.
///
/// # Errors
///
/// Returns [`Error::InvalidSelector`] if the runtime refuses the name.
pub fn selector<R: Runtime>(name: &CStr) -> Result<Sel> {
    let sel = R::register_selector(name).ok_or_else(|| Error::InvalidSelector {
        name: name.to_string_lossy().into_owned(),
    });
    diag::reported("selector", sel)
}

/// Looks up a registered class.
///
/// # Errors
///
/// Returns [`Error::ClassNotFound`] if no class has that name.
pub fn class<R: Runtime>(name: &CStr) -> Result<Id> {
    let class = R::class_named(name);
    let found = if class.is_nil() {
        Err(Error::ClassNotFound {
            name: name.to_string_lossy().into_owned(),
        })
    } else {
        Ok(class)
    };
    diag::reported("class", found)
}

/// `-(id)sel` on a class or an initialized instance. Applies all four
/// handle checks.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] if the receiver fails validation.
///
/// # Safety
///
/// `receiver` must point to readable memory if it passes the address checks,
/// and must respond to `sel` with this shape.
pub unsafe fn send<R: Runtime>(receiver: Id, sel: Sel) -> Result<Id> {
    let op = CallShape::NoArgsToHandle.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, Provenance::Initialized) })?;
    trace_call(op, receiver, sel);
    // SAFETY: receiver validated; shape guaranteed by the caller
    Ok(unsafe { R::send_handle(receiver, sel) })
}

/// `-(id)sel` on a receiver that may be freshly allocated, such as the
/// target of `init`. Skips the type-descriptor check.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] if the receiver fails validation.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_fresh<R: Runtime>(receiver: Id, sel: Sel) -> Result<Id> {
    let op = CallShape::NoArgsToHandle.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, Provenance::Fresh) })?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_handle(receiver, sel) })
}

/// `-(id)sel:(const char *)text`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver, or
/// [`PayloadFault::InteriorNul`] if `text` cannot be a C string.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_utf8<R: Runtime>(receiver: Id, sel: Sel, text: &str) -> Result<Id> {
    let op = CallShape::Utf8StringToHandle.operation();
    let text = diag::reported(
        op,
        unsafe { check_receiver::<R>(receiver, Provenance::Fresh) }.and_then(|()| {
            CString::new(text).map_err(|err| {
                PayloadFault::InteriorNul {
                    position: err.nul_position(),
                }
                .into()
            })
        }),
    )?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_utf8(receiver, sel, text.as_ptr()) })
}

/// [`send_utf8`] for text that is already a C string.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_c_str<R: Runtime>(receiver: Id, sel: Sel, text: &CStr) -> Result<Id> {
    let op = CallShape::Utf8StringToHandle.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, Provenance::Fresh) })?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_utf8(receiver, sel, text.as_ptr()) })
}

/// `-(id)sel:(NSRect)rect`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver, or
/// [`PayloadFault::GeometryOutOfRange`].
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_geometry<R: Runtime>(receiver: Id, sel: Sel, rect: Geometry) -> Result<Id> {
    let op = CallShape::GeometryToHandle.operation();
    diag::reported(
        op,
        unsafe { check_receiver::<R>(receiver, Provenance::Fresh) }
            .and_then(|()| Ok(rect.validate()?)),
    )?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_geometry(receiver, sel, rect) })
}

/// `-(id)sel:(NSRect)rect a:(NSUInteger)first b:(NSUInteger)second c:(BOOL)flag`,
/// the shape of `initWithContentRect:styleMask:backing:defer:`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver,
/// [`PayloadFault::GeometryOutOfRange`], or [`PayloadFault::WordOutOfRange`]
/// if either word exceeds `u32::MAX`.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_geometry_words_flag<R: Runtime>(
    receiver: Id,
    sel: Sel,
    rect: Geometry,
    first: u64,
    second: u64,
    flag: bool,
) -> Result<Id> {
    let op = CallShape::GeometryWordsFlagToHandle.operation();
    diag::reported(
        op,
        unsafe { check_receiver::<R>(receiver, Provenance::Fresh) }
            .and_then(|()| Ok(rect.validate()?))
            .and_then(|()| check_word("first word", first))
            .and_then(|()| check_word("second word", second)),
    )?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_geometry_words_flag(receiver, sel, rect, first, second, flag) })
}

/// `-(void)sel:(id)argument`. A nil argument is passed through; a non-nil
/// one gets the address checks.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] naming the receiver or the argument.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_void_object<R: Runtime>(receiver: Id, sel: Sel, argument: Id) -> Result<()> {
    let op = CallShape::HandleToVoid.operation();
    diag::reported(
        op,
        unsafe { check_receiver::<R>(receiver, Provenance::Fresh) }
            .and_then(|()| check_optional::<R>("argument", argument)),
    )?;
    trace_call(op, receiver, sel);
    unsafe { R::send_void_handle(receiver, sel, argument) };
    Ok(())
}

/// `-(void)sel`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_void<R: Runtime>(receiver: Id, sel: Sel) -> Result<()> {
    let op = CallShape::NoArgsToVoid.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, Provenance::Fresh) })?;
    trace_call(op, receiver, sel);
    unsafe { R::send_void(receiver, sel) };
    Ok(())
}

/// `-(void)sel:(BOOL)flag`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_void_flag<R: Runtime>(receiver: Id, sel: Sel, flag: bool) -> Result<()> {
    let op = CallShape::FlagToVoid.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, Provenance::Fresh) })?;
    trace_call(op, receiver, sel);
    unsafe { R::send_void_flag(receiver, sel, flag) };
    Ok(())
}

/// `-(NSRect)sel`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_returning_geometry<R: Runtime>(receiver: Id, sel: Sel) -> Result<Geometry> {
    let op = CallShape::NoArgsToGeometry.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, Provenance::Fresh) })?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_returning_geometry(receiver, sel) })
}

/// `-(unsigned long long)sel`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_returning_word<R: Runtime>(receiver: Id, sel: Sel) -> Result<u64> {
    unsafe { returning_word::<R>(receiver, sel, Provenance::Fresh) }
}

/// [`send_returning_word`] on a handle the runtime just returned, which may
/// be a tagged pointer (small `NSNumber`s are).
///
/// # Safety
///
/// `receiver` must come from the runtime and respond to `sel` with this
/// shape.
pub(crate) unsafe fn send_returning_word_from_runtime<R: Runtime>(
    receiver: Id,
    sel: Sel,
) -> Result<u64> {
    unsafe { returning_word::<R>(receiver, sel, Provenance::FromRuntime) }
}

unsafe fn returning_word<R: Runtime>(receiver: Id, sel: Sel, provenance: Provenance) -> Result<u64> {
    let op = CallShape::NoArgsToWord.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, provenance) })?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_returning_word(receiver, sel) })
}

/// `-(id)sel:(unsigned long long)value`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad receiver.
///
/// # Safety
///
/// `receiver` must respond to `sel` with this shape.
pub unsafe fn send_word<R: Runtime>(receiver: Id, sel: Sel, value: u64) -> Result<Id> {
    let op = CallShape::WordToHandle.operation();
    diag::reported(op, unsafe { check_receiver::<R>(receiver, Provenance::Fresh) })?;
    trace_call(op, receiver, sel);
    Ok(unsafe { R::send_word(receiver, sel, value) })
}

/// `+scheduledTimerWithTimeInterval:target:selector:userInfo:repeats:`.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad class, target or non-nil
/// payload, or [`PayloadFault::IntervalOutOfRange`] unless the interval is
/// finite and positive.
///
/// # Safety
///
/// `class` must respond to `sel` with this shape and `target` must respond
/// to `action`.
#[allow(clippy::too_many_arguments)]
pub unsafe fn schedule_timer<R: Runtime>(
    class: Id,
    sel: Sel,
    interval: f64,
    target: Id,
    action: Sel,
    payload: Id,
    repeats: bool,
) -> Result<Id> {
    let op = CallShape::ScheduleTimer.operation();
    let interval_ok = || -> Result<()> {
        if interval.is_finite() && interval > 0.0 {
            Ok(())
        } else {
            Err(PayloadFault::IntervalOutOfRange {
                interval,
                max: None,
            }
            .into())
        }
    };
    diag::reported(
        op,
        unsafe { check_receiver::<R>(class, Provenance::Fresh) }
            .and_then(|()| check_required::<R>("target", target))
            .and_then(|()| check_optional::<R>("payload", payload))
            .and_then(|()| interval_ok()),
    )?;
    trace_call(op, class, sel);
    Ok(unsafe { R::send_schedule_timer(class, sel, interval, target, action, payload, repeats) })
}
