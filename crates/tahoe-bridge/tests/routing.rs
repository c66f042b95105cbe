//! Events delivered by the runtime reach the router with the right context.

mod common;

use common::{Event, Recorder, errors, object, sel, window};
use tahoe_bridge::construct::{self, TIMER_TARGET_CLASS, TICK_SELECTOR, WINDOW_DELEGATE_CLASS};
use tahoe_bridge::relay::{RESIZE_RELAY, TICK_RELAY};
use tahoe_bridge::runtime::headless::Headless;
use tahoe_bridge::{
    CONTEXT_KEY, Error, Id, PayloadFault, Runtime, associate, create_animation_timer,
    create_window_delegate, dispatch,
};

fn number(value: u64) -> Id {
    let class = dispatch::class::<Headless>(c"NSNumber").unwrap();
    unsafe {
        dispatch::send_word::<Headless>(class, sel(c"numberWithUnsignedLongLong:"), value).unwrap()
    }
}

fn attach(window: Id, delegate: Id) {
    unsafe { dispatch::send_void_object::<Headless>(window, sel(c"setDelegate:"), delegate) }
        .unwrap();
}

#[test]
fn test_timer_fires_tick_with_context() {
    let timer = create_animation_timer::<Headless, Recorder>(42, 0.5).unwrap();
    assert!(Recorder::take().is_empty());

    Headless::fire_timer(timer);
    assert_eq!(Recorder::take(), vec![Event::Tick { context: 42 }]);

    Headless::fire_timer(timer);
    Headless::fire_timer(timer);
    assert_eq!(Recorder::take().len(), 2);
}

#[test]
fn test_timers_share_one_class() {
    let first = create_animation_timer::<Headless, Recorder>(1, 1.0 / 60.0).unwrap();
    let second = create_animation_timer::<Headless, Recorder>(2, 1.0 / 30.0).unwrap();

    Headless::fire_timer(second);
    Headless::fire_timer(first);

    assert_eq!(
        Recorder::take(),
        vec![Event::Tick { context: 2 }, Event::Tick { context: 1 }]
    );
    assert_eq!(Headless::class_registrations(TIMER_TARGET_CLASS), 1);
}

#[test]
fn test_timer_with_zero_payload_routes_nothing() {
    create_animation_timer::<Headless, Recorder>(9, 0.5).unwrap();
    let class = Headless::class_named(TIMER_TARGET_CLASS);
    let target = unsafe { construct::instantiate::<Headless>(class) }.unwrap();
    let timer_class = dispatch::class::<Headless>(c"NSTimer").unwrap();

    let timer = unsafe {
        dispatch::schedule_timer::<Headless>(
            timer_class,
            sel(c"scheduledTimerWithTimeInterval:target:selector:userInfo:repeats:"),
            0.5,
            target,
            sel(TICK_SELECTOR),
            number(0),
            true,
        )
    }
    .unwrap();

    let ((), records) = tahoe_log::capture(|| Headless::fire_timer(timer));
    assert!(Recorder::take().is_empty());

    let errors = errors(&records);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].target, TICK_RELAY);
}

#[test]
fn test_timer_arguments_are_checked() {
    assert_eq!(
        create_animation_timer::<Headless, Recorder>(0, 0.5),
        Err(PayloadFault::ZeroContext.into())
    );
    for interval in [0.0, -1.0, 1.5, f64::NAN] {
        assert!(
            matches!(
                create_animation_timer::<Headless, Recorder>(5, interval),
                Err(Error::InvalidPayload(PayloadFault::IntervalOutOfRange { .. }))
            ),
            "{interval}"
        );
    }
    assert!(create_animation_timer::<Headless, Recorder>(5, 1.0).is_ok());
    assert!(create_animation_timer::<Headless, Recorder>(5, 1e-6).is_ok());
}

#[test]
fn test_resize_reports_content_size() {
    let window = window(800.0, 600.0);
    let delegate = create_window_delegate::<Headless, Recorder>(7).unwrap();
    attach(window, delegate);

    assert!(Headless::resize_window(window, 800.0, 600.0));
    assert_eq!(
        Recorder::take(),
        vec![Event::Resize {
            context: 7,
            width: 800.0,
            height: 600.0
        }]
    );

    assert!(Headless::resize_window(window, 1024.0, 768.0));
    assert_eq!(
        Recorder::take(),
        vec![Event::Resize {
            context: 7,
            width: 1024.0,
            height: 768.0
        }]
    );
}

#[test]
fn test_resize_leaves_no_objects_behind() {
    let window = window(800.0, 600.0);
    let delegate = create_window_delegate::<Headless, Recorder>(8).unwrap();
    attach(window, delegate);
    let objects = Headless::object_count();

    for width in [640.0, 720.0, 800.0, 1280.0] {
        assert!(Headless::resize_window(window, width, 600.0));
    }
    assert_eq!(Recorder::take().len(), 4);
    assert_eq!(Headless::object_count(), objects);
}

#[test]
fn test_resize_without_context_routes_nothing() {
    create_window_delegate::<Headless, Recorder>(7).unwrap();
    let class = Headless::class_named(WINDOW_DELEGATE_CLASS);
    let unbound = unsafe { construct::instantiate::<Headless>(class) }.unwrap();

    let window = window(400.0, 300.0);
    attach(window, unbound);

    let (delivered, records) = tahoe_log::capture(|| Headless::resize_window(window, 500.0, 300.0));
    assert!(delivered);
    assert!(Recorder::take().is_empty());

    let errors = errors(&records);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].target, RESIZE_RELAY);
}

#[test]
fn test_unbound_delegate_stops_routing() {
    let window = window(640.0, 480.0);
    let delegate = create_window_delegate::<Headless, Recorder>(11).unwrap();
    attach(window, delegate);

    unsafe { associate::unbind::<Headless>(delegate, CONTEXT_KEY) }.unwrap();
    Headless::resize_window(window, 320.0, 240.0);
    assert!(Recorder::take().is_empty());
}

#[test]
fn test_delegate_context_round_trip() {
    let delegate = create_window_delegate::<Headless, Recorder>(0x1234).unwrap();
    let bound = unsafe { associate::lookup::<Headless>(delegate, CONTEXT_KEY) };
    assert_eq!(bound, Ok(Some(0x1234)));

    // Objects outside the bridge carry nothing
    let plain = object();
    assert_eq!(
        unsafe { associate::lookup::<Headless>(plain, CONTEXT_KEY) },
        Ok(None)
    );
}

#[test]
fn test_plain_delegate_is_not_messaged() {
    let window = window(200.0, 200.0);
    attach(window, object());

    assert!(!Headless::resize_window(window, 100.0, 100.0));
    assert!(Recorder::take().is_empty());
}
