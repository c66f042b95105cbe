// Common test utilities for integration tests
//
// A router that records every routed event on the current thread, plus
// helpers for building toolkit objects in the headless runtime.

#![allow(dead_code)]

use std::cell::RefCell;
use std::ffi::{CStr, c_char, c_void};

use tahoe_bridge::runtime::headless::Headless;
use tahoe_bridge::{EventRouter, Geometry, Id, Imp, Runtime, Sel, dispatch};
use tahoe_log::{Level, Record};

/// One routed event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Mouse {
        context: u64,
        kind: u32,
        button: u32,
        x: f64,
        y: f64,
        modifiers: u32,
    },
    Keyboard {
        context: u64,
        kind: u32,
        key_code: u32,
        character: u32,
        modifiers: u32,
    },
    Focus {
        context: u64,
        kind: u32,
    },
    Tick {
        context: u64,
    },
    Resize {
        context: u64,
        width: f64,
        height: f64,
    },
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
}

/// Router that appends to a per-thread event list.
pub struct Recorder;

impl Recorder {
    /// Takes every event recorded so far on this thread.
    pub fn take() -> Vec<Event> {
        EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
    }

    fn push(event: Event) {
        EVENTS.with(|events| events.borrow_mut().push(event));
    }
}

impl EventRouter for Recorder {
    fn mouse_event(context: u64, kind: u32, button: u32, x: f64, y: f64, modifiers: u32) {
        Self::push(Event::Mouse {
            context,
            kind,
            button,
            x,
            y,
            modifiers,
        });
    }

    fn keyboard_event(context: u64, kind: u32, key_code: u32, character: u32, modifiers: u32) {
        Self::push(Event::Keyboard {
            context,
            kind,
            key_code,
            character,
            modifiers,
        });
    }

    fn focus_event(context: u64, kind: u32) {
        Self::push(Event::Focus { context, kind });
    }

    fn tick_event(context: u64) {
        Self::push(Event::Tick { context });
    }

    fn resize_event(context: u64, width: f64, height: f64) {
        Self::push(Event::Resize {
            context,
            width,
            height,
        });
    }
}

/// Error-level records only.
pub fn errors(records: &[Record]) -> Vec<&Record> {
    records.iter().filter(|r| r.level == Level::Error).collect()
}

pub fn sel(name: &CStr) -> Sel {
    dispatch::selector::<Headless>(name).expect("selector")
}

pub fn class(name: &CStr) -> Id {
    dispatch::class::<Headless>(name).expect("class")
}

/// An initialized window with a content view of the given size.
pub fn window(width: f64, height: f64) -> Id {
    unsafe {
        let window = dispatch::send::<Headless>(class(c"NSWindow"), sel(c"alloc")).expect("alloc");
        dispatch::send_geometry_words_flag::<Headless>(
            window,
            sel(c"initWithContentRect:styleMask:backing:defer:"),
            Geometry::new(0.0, 0.0, width, height),
            15,
            2,
            false,
        )
        .expect("init")
    }
}

/// A plain initialized object.
pub fn object() -> Id {
    unsafe {
        let object = dispatch::send::<Headless>(class(c"NSObject"), sel(c"alloc")).expect("alloc");
        dispatch::send_fresh::<Headless>(object, sel(c"init")).expect("init")
    }
}

/// The headless world, but with the x86_64 tagged-pointer rule: every odd
/// address is tagged.
pub struct OddTagged;

unsafe impl Runtime for OddTagged {
    fn class_named(name: &CStr) -> Id {
        Headless::class_named(name)
    }

    fn register_selector(name: &CStr) -> Option<Sel> {
        Headless::register_selector(name)
    }

    unsafe fn allocate_class(superclass: Id, name: &CStr) -> Id {
        unsafe { Headless::allocate_class(superclass, name) }
    }

    unsafe fn add_method(class: Id, sel: Sel, imp: Imp, types: &CStr) -> bool {
        unsafe { Headless::add_method(class, sel, imp, types) }
    }

    unsafe fn register_class(class: Id) {
        unsafe { Headless::register_class(class) }
    }

    unsafe fn dispose_class(class: Id) {
        unsafe { Headless::dispose_class(class) }
    }

    unsafe fn set_associated(object: Id, key: *const c_void, value: usize) {
        unsafe { Headless::set_associated(object, key, value) }
    }

    unsafe fn associated(object: Id, key: *const c_void) -> usize {
        unsafe { Headless::associated(object, key) }
    }

    unsafe fn type_descriptor(object: Id) -> usize {
        unsafe { Headless::type_descriptor(object) }
    }

    fn is_tagged_pointer(id: Id) -> bool {
        id.addr() & 1 != 0
    }

    unsafe fn send_handle(receiver: Id, sel: Sel) -> Id {
        unsafe { Headless::send_handle(receiver, sel) }
    }

    unsafe fn send_utf8(receiver: Id, sel: Sel, text: *const c_char) -> Id {
        unsafe { Headless::send_utf8(receiver, sel, text) }
    }

    unsafe fn send_geometry(receiver: Id, sel: Sel, rect: Geometry) -> Id {
        unsafe { Headless::send_geometry(receiver, sel, rect) }
    }

    unsafe fn send_geometry_words_flag(
        receiver: Id,
        sel: Sel,
        rect: Geometry,
        first: u64,
        second: u64,
        flag: bool,
    ) -> Id {
        unsafe { Headless::send_geometry_words_flag(receiver, sel, rect, first, second, flag) }
    }

    unsafe fn send_void_handle(receiver: Id, sel: Sel, argument: Id) {
        unsafe { Headless::send_void_handle(receiver, sel, argument) }
    }

    unsafe fn send_void(receiver: Id, sel: Sel) {
        unsafe { Headless::send_void(receiver, sel) }
    }

    unsafe fn send_void_flag(receiver: Id, sel: Sel, flag: bool) {
        unsafe { Headless::send_void_flag(receiver, sel, flag) }
    }

    unsafe fn send_returning_geometry(receiver: Id, sel: Sel) -> Geometry {
        unsafe { Headless::send_returning_geometry(receiver, sel) }
    }

    unsafe fn send_returning_word(receiver: Id, sel: Sel) -> u64 {
        unsafe { Headless::send_returning_word(receiver, sel) }
    }

    unsafe fn send_word(receiver: Id, sel: Sel, value: u64) -> Id {
        unsafe { Headless::send_word(receiver, sel, value) }
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
            Headless::send_schedule_timer(receiver, sel, interval, target, action, payload, repeats)
        }
    }
}
