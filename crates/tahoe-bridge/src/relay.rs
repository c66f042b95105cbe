//! Event relays: the bodies of synthesized methods.
//!
//! The runtime calls a relay with the `"v@:@"` signature. The relay recovers
//! the caller's context, then forwards the event to one of the caller's
//! routing entry points. Relays hold no state between firings; every firing
//! revalidates what it reads. A relay that cannot route reports why under
//! its own name and returns without calling the router.
//!
//! Relays are generic over the runtime and the router and are monomorphised
//! into plain `extern "C"` functions, one per pair, when their address is
//! taken:
//!
//! ```
//! use tahoe_bridge::relay::{self, EventRouter};
//! use tahoe_bridge::runtime::Imp;
//! use tahoe_bridge::runtime::headless::Headless;
//!
//! struct Quiet;
//!
//! impl EventRouter for Quiet {
//!     fn mouse_event(_: u64, _: u32, _: u32, _: f64, _: f64, _: u32) {}
//!     fn keyboard_event(_: u64, _: u32, _: u32, _: u32, _: u32) {}
//!     fn focus_event(_: u64, _: u32) {}
//!     fn tick_event(_: u64) {}
//!     fn resize_event(_: u64, _: f64, _: f64) {}
//! }
//!
//! let imp: Imp = relay::timer_tick::<Headless, Quiet>;
//! ```

use crate::associate::{self, CONTEXT_KEY};
use crate::diag;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::handle::{Id, Sel};
use crate::runtime::Runtime;

/// Diagnostic tag of [`window_did_resize`].
pub const RESIZE_RELAY: &str = "window_did_resize";

/// Diagnostic tag of [`timer_tick`].
pub const TICK_RELAY: &str = "timer_tick";

/// The caller's five routing entry points.
///
/// Each receives the context bound to the object the event came from.
/// Return values are not consulted; routing is a notification.
pub trait EventRouter: 'static {
    fn mouse_event(context: u64, kind: u32, button: u32, x: f64, y: f64, modifiers: u32);

    fn keyboard_event(context: u64, kind: u32, key_code: u32, character: u32, modifiers: u32);

    fn focus_event(context: u64, kind: u32);

    /// One animation frame is due.
    fn tick_event(context: u64);

    /// The window's content area now measures `width` by `height` points.
    fn resize_event(context: u64, width: f64, height: f64);
}

fn precondition(relay: &'static str, reason: &'static str) -> Error {
    Error::RoutingPrecondition { relay, reason }
}

/// `windowDidResize:` on a window delegate.
///
/// Reads the delegate's bound context, then the new size of the window's
/// content view, and calls [`EventRouter::resize_event`].
///
/// # Safety
///
/// Called by the runtime: `delegate` must be a live delegate object and
/// `notification` a live notification whose `object` is a window.
pub unsafe extern "C" fn window_did_resize<R: Runtime, E: EventRouter>(
    delegate: Id,
    _cmd: Sel,
    notification: Id,
) {
    // SAFETY: guaranteed by the runtime calling the relay
    let routed = diag::reported(RESIZE_RELAY, unsafe { resize_target::<R>(delegate, notification) });
    if let Ok((context, width, height)) = routed {
        E::resize_event(context, width, height);
    }
}

unsafe fn resize_target<R: Runtime>(delegate: Id, notification: Id) -> Result<(u64, f64, f64)> {
    let context = unsafe { associate::lookup::<R>(delegate, CONTEXT_KEY) }?
        .ok_or_else(|| precondition(RESIZE_RELAY, "no context bound to delegate"))?;

    let object = dispatch::selector::<R>(c"object")?;
    let content_view = dispatch::selector::<R>(c"contentView")?;
    let frame = dispatch::selector::<R>(c"frame")?;

    let window = unsafe { dispatch::send::<R>(notification, object) }?;
    if window.is_nil() {
        return Err(precondition(RESIZE_RELAY, "notification carries no window"));
    }
    let view = unsafe { dispatch::send::<R>(window, content_view) }?;
    if view.is_nil() {
        return Err(precondition(RESIZE_RELAY, "window has no content view"));
    }
    let rect = unsafe { dispatch::send_returning_geometry::<R>(view, frame) }?;

    Ok((context, rect.width, rect.height))
}

/// `tahoeTimerTick:` on a timer target.
///
/// Reads the context carried by the timer's `userInfo` number and calls
/// [`EventRouter::tick_event`].
///
/// # Safety
///
/// Called by the runtime: `timer` must be a live timer.
pub unsafe extern "C" fn timer_tick<R: Runtime, E: EventRouter>(_target: Id, _cmd: Sel, timer: Id) {
    // SAFETY: guaranteed by the runtime calling the relay
    if let Ok(context) = diag::reported(TICK_RELAY, unsafe { tick_context::<R>(timer) }) {
        E::tick_event(context);
    }
}

unsafe fn tick_context<R: Runtime>(timer: Id) -> Result<u64> {
    let user_info = dispatch::selector::<R>(c"userInfo")?;
    let value = dispatch::selector::<R>(c"unsignedLongLongValue")?;

    let payload = unsafe { dispatch::send::<R>(timer, user_info) }?;
    if payload.is_nil() {
        return Err(precondition(TICK_RELAY, "timer carries no payload"));
    }
    match unsafe { dispatch::send_returning_word_from_runtime::<R>(payload, value) }? {
        0 => Err(precondition(TICK_RELAY, "payload context is zero")),
        context => Ok(context),
    }
}
