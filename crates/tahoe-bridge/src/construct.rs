//! Window delegates and animation timers wired to the caller's router.
//!
//! Both helpers synthesize their relay class on first use, create one
//! instance and bind the caller's context to it. The relay class is created
//! once per process: the router type of the first call is the one every
//! later instance routes to.

use std::ffi::CStr;

use crate::associate::{self, CONTEXT_KEY};
use crate::diag;
use crate::dispatch;
use crate::error::{Error, PayloadFault, Result};
use crate::handle::Id;
use crate::relay::{self, EventRouter};
use crate::runtime::Runtime;
use crate::synth::{self, MethodSpec};

/// Class of window delegates.
pub const WINDOW_DELEGATE_CLASS: &CStr = c"TahoeWindowDelegate";

/// Class of timer targets.
pub const TIMER_TARGET_CLASS: &CStr = c"TahoeTimerTarget";

/// Selector the resize relay is installed under.
pub const RESIZE_SELECTOR: &CStr = c"windowDidResize:";

/// Selector the tick relay is installed under.
pub const TICK_SELECTOR: &CStr = c"tahoeTimerTick:";

/// Coarsest accepted animation interval, in seconds.
pub const MAX_TIMER_INTERVAL: f64 = 1.0;

const SCHEDULE_SELECTOR: &CStr = c"scheduledTimerWithTimeInterval:target:selector:userInfo:repeats:";

fn non_nil(id: Id, operation: &'static str) -> Result<Id> {
    if id.is_nil() {
        Err(Error::NilResult { operation })
    } else {
        Ok(id)
    }
}

fn check_context(context: u64) -> Result<()> {
    if context == 0 {
        return Err(PayloadFault::ZeroContext.into());
    }
    Ok(())
}

/// Allocates and initializes an instance of `class`.
///
/// # Errors
///
/// Returns [`Error::NilResult`] if `alloc` or `init` yields nil, or any
/// dispatcher rejection.
///
/// # Safety
///
/// `class` must be a live class of runtime `R` whose instances respond to
/// `init`.
pub unsafe fn instantiate<R: Runtime>(class: Id) -> Result<Id> {
    let alloc = dispatch::selector::<R>(c"alloc")?;
    let init = dispatch::selector::<R>(c"init")?;

    let object = non_nil(unsafe { dispatch::send::<R>(class, alloc) }?, "alloc")?;
    non_nil(unsafe { dispatch::send_fresh::<R>(object, init) }?, "init")
}

/// Creates a window delegate that routes `windowDidResize:` to
/// `E::resize_event(context, ..)`.
///
/// Install it with `setDelegate:` on the window.
///
/// # Errors
///
/// Returns [`PayloadFault::ZeroContext`] for a zero context, or the first
/// failure while synthesizing, instantiating or binding.
pub fn create_window_delegate<R: Runtime, E: EventRouter>(context: u64) -> Result<Id> {
    diag::reported("create_window_delegate", window_delegate::<R, E>(context))
}

fn window_delegate<R: Runtime, E: EventRouter>(context: u64) -> Result<Id> {
    check_context(context)?;

    let methods = [MethodSpec::new(
        RESIZE_SELECTOR,
        relay::window_did_resize::<R, E>,
    )];
    let class = synth::ensure_class::<R>(WINDOW_DELEGATE_CLASS, &methods)?;

    // SAFETY: `class` was synthesized from the runtime's root class
    let delegate = unsafe { instantiate::<R>(class) }?;
    // SAFETY: `delegate` was just created by the runtime
    unsafe { associate::bind::<R>(delegate, CONTEXT_KEY, context) }?;

    tahoe_log::debug!(target: "create_window_delegate", "delegate {delegate:?} for context {context}");
    Ok(delegate)
}

/// Schedules a repeating timer that calls `E::tick_event(context)` every
/// `interval` seconds, and returns the timer.
///
/// The interval must lie in `(0, MAX_TIMER_INTERVAL]`; NaN is rejected.
///
/// # Errors
///
/// Returns [`PayloadFault::ZeroContext`], [`PayloadFault::IntervalOutOfRange`],
/// or the first failure while synthesizing, instantiating, binding, wrapping
/// the context or scheduling.
pub fn create_animation_timer<R: Runtime, E: EventRouter>(context: u64, interval: f64) -> Result<Id> {
    diag::reported("create_animation_timer", animation_timer::<R, E>(context, interval))
}

fn animation_timer<R: Runtime, E: EventRouter>(context: u64, interval: f64) -> Result<Id> {
    check_context(context)?;
    if !(interval > 0.0 && interval <= MAX_TIMER_INTERVAL) {
        return Err(PayloadFault::IntervalOutOfRange {
            interval,
            max: Some(MAX_TIMER_INTERVAL),
        }
        .into());
    }

    let methods = [MethodSpec::new(TICK_SELECTOR, relay::timer_tick::<R, E>)];
    let class = synth::ensure_class::<R>(TIMER_TARGET_CLASS, &methods)?;

    // SAFETY: `class` was synthesized from the runtime's root class
    let target = unsafe { instantiate::<R>(class) }?;
    // SAFETY: `target` was just created by the runtime
    unsafe { associate::bind::<R>(target, CONTEXT_KEY, context) }?;

    let number_class = dispatch::class::<R>(c"NSNumber")?;
    let with_word = dispatch::selector::<R>(c"numberWithUnsignedLongLong:")?;
    // SAFETY: NSNumber answers numberWithUnsignedLongLong: with this shape
    let payload = unsafe { dispatch::send_word::<R>(number_class, with_word, context) }?;
    let payload = non_nil(payload, "numberWithUnsignedLongLong:")?;

    let timer_class = dispatch::class::<R>(c"NSTimer")?;
    let schedule = dispatch::selector::<R>(SCHEDULE_SELECTOR)?;
    let tick = dispatch::selector::<R>(TICK_SELECTOR)?;
    // SAFETY: `target` responds to `tick` through the class synthesized above
    let timer = unsafe {
        dispatch::schedule_timer::<R>(timer_class, schedule, interval, target, tick, payload, true)
    }?;
    let timer = non_nil(timer, "scheduledTimerWithTimeInterval:")?;

    tahoe_log::info!(
        target: "create_animation_timer",
        "timer every {interval}s for context {context}"
    );
    Ok(timer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::headless::Headless;

    struct Ignore;

    impl EventRouter for Ignore {
        fn mouse_event(_: u64, _: u32, _: u32, _: f64, _: f64, _: u32) {}
        fn keyboard_event(_: u64, _: u32, _: u32, _: u32, _: u32) {}
        fn focus_event(_: u64, _: u32) {}
        fn tick_event(_: u64) {}
        fn resize_event(_: u64, _: f64, _: f64) {}
    }

    #[test]
    fn test_delegate_carries_context() {
        let delegate = create_window_delegate::<Headless, Ignore>(0x1234).unwrap();
        let bound = unsafe { associate::lookup::<Headless>(delegate, CONTEXT_KEY) };
        assert_eq!(bound, Ok(Some(0x1234)));
        assert!(!Headless::class_named(WINDOW_DELEGATE_CLASS).is_nil());
    }

    #[test]
    fn test_zero_context_rejected_before_any_call() {
        let before = Headless::message_count();
        let (result, records) =
            tahoe_log::capture(|| create_window_delegate::<Headless, Ignore>(0));

        assert_eq!(result, Err(PayloadFault::ZeroContext.into()));
        assert_eq!(Headless::message_count(), before);
        let errors: Vec<_> = records
            .iter()
            .filter(|r| r.level == tahoe_log::Level::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].target, "create_window_delegate");
    }

    #[test]
    fn test_timer_interval_bounds() {
        for interval in [0.0, -0.5, 1.0000001, 2.0, f64::NAN, f64::INFINITY] {
            let result = create_animation_timer::<Headless, Ignore>(1, interval);
            assert!(
                matches!(result, Err(Error::InvalidPayload(PayloadFault::IntervalOutOfRange { .. }))),
                "{interval}"
            );
        }
        assert_eq!(
            create_animation_timer::<Headless, Ignore>(1, 2.0),
            Err(PayloadFault::IntervalOutOfRange {
                interval: 2.0,
                max: Some(MAX_TIMER_INTERVAL)
            }
            .into())
        );
        assert!(create_animation_timer::<Headless, Ignore>(1, 1.0).is_ok());
        assert!(create_animation_timer::<Headless, Ignore>(1, 1e-9).is_ok());
    }

    #[test]
    fn test_timer_is_scheduled_repeating() {
        let timer = create_animation_timer::<Headless, Ignore>(3, 0.25).unwrap();
        assert_eq!(Headless::timer_interval(timer), Some(0.25));

        Headless::fire_timer(timer);
        Headless::fire_timer(timer);
        assert_eq!(Headless::timer_is_valid(timer), Some(true));
    }

    #[test]
    fn test_instantiate_rejects_bad_class() {
        let result = unsafe { instantiate::<Headless>(Id::from_addr(0x0ff8)) };
        assert!(matches!(result, Err(Error::InvalidHandle { .. })));
    }
}
