//! Relay classes are synthesized once and reused.

mod common;

use common::{Recorder, errors};
use tahoe_bridge::construct::{RESIZE_SELECTOR, TIMER_TARGET_CLASS, WINDOW_DELEGATE_CLASS};
use tahoe_bridge::runtime::headless::Headless;
use tahoe_bridge::{
    Error, Id, MethodSpec, Runtime, Sel, create_animation_timer, create_window_delegate,
    ensure_class,
};

unsafe extern "C" fn ignore(_: Id, _: Sel, _: Id) {}

#[test]
fn test_first_use_registers_once() {
    assert!(Headless::class_named(WINDOW_DELEGATE_CLASS).is_nil());

    let delegates: Vec<Id> = (1..=5)
        .map(|context| create_window_delegate::<Headless, Recorder>(context).unwrap())
        .collect();

    assert_eq!(Headless::class_registrations(WINDOW_DELEGATE_CLASS), 1);
    let mut distinct = delegates.clone();
    distinct.sort_by_key(|id| id.addr());
    distinct.dedup();
    assert_eq!(distinct.len(), delegates.len());
}

#[test]
fn test_delegate_and_timer_classes_are_separate() {
    create_window_delegate::<Headless, Recorder>(1).unwrap();
    create_animation_timer::<Headless, Recorder>(1, 0.5).unwrap();

    let delegate_class = Headless::class_named(WINDOW_DELEGATE_CLASS);
    let timer_class = Headless::class_named(TIMER_TARGET_CLASS);
    assert!(!delegate_class.is_nil());
    assert!(!timer_class.is_nil());
    assert_ne!(delegate_class, timer_class);
}

#[test]
fn test_ensure_class_reuses_existing() {
    let methods = [MethodSpec::new(c"relay:", ignore)];
    let ((first, second), records) = tahoe_log::capture(|| {
        (
            ensure_class::<Headless>(c"RelayTarget", &methods),
            ensure_class::<Headless>(c"RelayTarget", &methods),
        )
    });

    assert_eq!(first, second);
    assert!(first.is_ok());
    assert!(errors(&records).is_empty());
    assert_eq!(Headless::class_registrations(c"RelayTarget"), 1);
}

#[test]
fn test_existing_class_keeps_its_methods() {
    create_window_delegate::<Headless, Recorder>(3).unwrap();
    let class = Headless::class_named(WINDOW_DELEGATE_CLASS);

    let methods = [MethodSpec::new(RESIZE_SELECTOR, ignore)];
    assert_eq!(
        ensure_class::<Headless>(WINDOW_DELEGATE_CLASS, &methods),
        Ok(class)
    );
}

#[test]
fn test_taken_name_fails_cleanly() {
    // NSView is registered but an existing class is returned as is
    let view = Headless::class_named(c"NSView");
    assert_eq!(ensure_class::<Headless>(c"NSView", &[]), Ok(view));

    let methods = [
        MethodSpec::new(c"twice:", ignore),
        MethodSpec::new(c"twice:", ignore),
    ];
    let (result, records) = tahoe_log::capture(|| ensure_class::<Headless>(c"Twice", &methods));
    assert!(matches!(result, Err(Error::SynthesisFailure { .. })));
    assert_eq!(errors(&records).len(), 1);

    // The name is free again after disposal
    let retry = ensure_class::<Headless>(c"Twice", &methods[..1]);
    assert!(retry.is_ok());
    assert_eq!(Headless::class_registrations(c"Twice"), 1);
}
