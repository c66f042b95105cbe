//! An in-process stand-in for the Objective-C runtime.
//!
//! `Headless` keeps a small object world (classes, interned selectors,
//! isa-headed objects, associations, timers and windows) in a thread-local,
//! so every thread behaves like its own process. It exists for two reasons:
//! the bridge's tests run anywhere, and every message the bridge lets through
//! is counted, which makes "no foreign call was attempted" observable.
//!
//! Where the real runtime would crash (a message to something that is not an
//! object, an unrecognized selector, a call with the wrong argument layout)
//! the headless runtime records a *fault*, logs a warning and returns
//! nil/zero.
//!
//! # Example
//!
//! ```
//! use tahoe_bridge::runtime::Runtime;
//! use tahoe_bridge::runtime::headless::Headless;
//!
//! let class = Headless::class_named(c"NSNumber");
//! let sel = Headless::register_selector(c"numberWithUnsignedLongLong:").unwrap();
//! let number = unsafe { Headless::send_word(class, sel, 42) };
//!
//! let value = Headless::register_selector(c"unsignedLongLongValue").unwrap();
//! assert_eq!(unsafe { Headless::send_returning_word(number, value) }, 42);
//! assert_eq!(Headless::fault_count(), 0);
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, c_char, c_void};

mod behavior;
mod class;
mod object;
mod selector;

use self::behavior::{Args, Ret};
use self::class::{ClassTable, MethodBody};
use self::object::ObjectTable;
use self::selector::SelectorTable;
use super::{Imp, Runtime};
use crate::encoding::{CallShape, is_method_encoding};
use crate::geometry::Geometry;
use crate::handle::{Id, Sel};

const LOG_TARGET: &str = "headless";

struct World {
    selectors: SelectorTable,
    classes: ClassTable,
    objects: ObjectTable,
    messages: u64,
    faults: u64,
}

impl World {
    fn new() -> Self {
        let mut world = World {
            selectors: SelectorTable::default(),
            classes: ClassTable::default(),
            objects: ObjectTable::default(),
            messages: 0,
            faults: 0,
        };
        world.install_toolkit();
        world
    }

    fn fault(&mut self, receiver: Id, sel: Option<Sel>, what: &str) {
        self.faults += 1;
        let name = sel
            .and_then(|sel| self.selectors.name(sel))
            .map_or_else(|| "?".into(), CStr::to_string_lossy);
        tahoe_log::warn!(target: LOG_TARGET, "fault: {what} ({receiver:?} {name})");
    }

    fn is_known(&self, id: Id) -> bool {
        self.objects.contains(id) || self.classes.contains(id.addr())
    }

    /// Finds the method `receiver` runs for `sel`, as a class method if the
    /// receiver is a class.
    fn lookup(&self, receiver: Id, sel: Sel) -> Option<MethodBody> {
        let sel = sel.as_ptr() as usize;
        if self.classes.contains(receiver.addr()) {
            self.classes.resolve(receiver.addr(), sel, true)
        } else {
            let class = self.objects.get(receiver)?.class();
            self.classes.resolve(class, sel, false)
        }
    }

    /// Counts a message and resolves it, faulting where the real runtime
    /// would crash.
    fn resolve(&mut self, receiver: Id, sel: Sel, shape: CallShape) -> Option<MethodBody> {
        self.messages += 1;
        if !self.is_known(receiver) {
            self.fault(receiver, Some(sel), "message to unknown receiver");
            return None;
        }
        let Some(body) = self.lookup(receiver, sel) else {
            self.fault(receiver, Some(sel), "unrecognized selector");
            return None;
        };
        if body.shape() != shape {
            self.fault(receiver, Some(sel), "argument layout mismatch");
            return None;
        }
        Some(body)
    }
}

thread_local! {
    static WORLD: RefCell<World> = RefCell::new(World::new());
}

/// Runs `f` against this thread's world.
///
/// Never call a relay or another `Runtime` function from inside `f`.
fn with_world<T>(f: impl FnOnce(&mut World) -> T) -> T {
    WORLD.with(|world| f(&mut world.borrow_mut()))
}

/// Delivers one message.
///
/// # Safety
///
/// Relay implementations registered through `add_method` are called with
/// the world released; they must be sound for the arguments given.
unsafe fn message(receiver: Id, sel: Sel, shape: CallShape, args: Args<'_>) -> Ret {
    let Some(body) = with_world(|world| world.resolve(receiver, sel, shape)) else {
        return Ret::Void;
    };

    let native = match body {
        MethodBody::Relay(imp) => {
            if let Args::Handle(argument) = args {
                // SAFETY: the relay was registered for exactly this shape
                unsafe { imp(receiver, sel, argument) };
            }
            return Ret::Void;
        }
        MethodBody::Native(native) => native,
    };

    let outcome = with_world(|world| {
        let outcome = world.perform(native, receiver, args);
        if outcome.is_none() {
            world.fault(receiver, Some(sel), "receiver state does not support method");
        }
        outcome
    });
    let Some(outcome) = outcome else {
        return Ret::Void;
    };

    if let Some(next) = outcome.then {
        // SAFETY: forwarded from the caller
        unsafe {
            message(
                next.receiver,
                next.sel,
                CallShape::HandleToVoid,
                Args::Handle(next.argument),
            );
        }
    }
    outcome.ret
}

/// The headless runtime. All state lives in a per-thread world.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl Headless {
    /// Fires a timer once, delivering its action to its target.
    pub fn fire_timer(timer: Id) {
        if let Some(fire) = Self::register_selector(c"fire") {
            // SAFETY: headless messages never dereference the receiver
            unsafe { message(timer, fire, CallShape::NoArgsToVoid, Args::None) };
        }
    }

    /// Resizes a window and its content view, then sends
    /// `windowDidResize:` to the window's delegate if it has one that
    /// responds. Returns true if the delegate was messaged.
    pub fn resize_window(window: Id, width: f64, height: f64) -> bool {
        let resized = with_world(|world| {
            let resized = world.apply_resize(window, width, height);
            if resized.is_none() {
                world.fault(window, None, "resize of something that is not a window");
            }
            resized
        });
        let Some((delegate, notification)) = resized else {
            return false;
        };
        let responds = Self::register_selector(c"windowDidResize:").filter(|&sel| {
            !delegate.is_nil() && with_world(|world| world.lookup(delegate, sel).is_some())
        });
        if let Some(sel) = responds {
            // SAFETY: headless messages never dereference the receiver
            unsafe {
                message(delegate, sel, CallShape::HandleToVoid, Args::Handle(notification));
            }
        }
        with_world(|world| world.objects.remove(notification));
        responds.is_some()
    }

    /// Messages delivered or attempted on this thread.
    pub fn message_count() -> u64 {
        with_world(|world| world.messages)
    }

    /// Messages that would have crashed a real runtime.
    pub fn fault_count() -> u64 {
        with_world(|world| world.faults)
    }

    /// How many times a class with this name has been registered.
    pub fn class_registrations(name: &CStr) -> usize {
        with_world(|world| world.classes.registrations(name))
    }

    /// Returns the name a selector was interned under.
    pub fn selector_name(sel: Sel) -> Option<String> {
        with_world(|world| {
            world
                .selectors
                .name(sel)
                .map(|name| name.to_string_lossy().into_owned())
        })
    }

    /// Interval of a scheduled timer.
    pub fn timer_interval(timer: Id) -> Option<f64> {
        with_world(|world| world.timer_state(timer)).map(|(interval, _)| interval)
    }

    /// Whether a timer is still scheduled.
    pub fn timer_is_valid(timer: Id) -> Option<bool> {
        with_world(|world| world.timer_state(timer)).map(|(_, valid)| valid)
    }

    /// Whether a window is ordered front, or a view is not hidden.
    pub fn is_visible(id: Id) -> Option<bool> {
        with_world(|world| world.visibility(id))
    }

    /// Contents of a string object.
    pub fn string_value(id: Id) -> Option<String> {
        with_world(|world| world.text(id))
    }

    /// Number of live objects on this thread.
    pub fn object_count() -> usize {
        with_world(|world| world.objects.len())
    }
}

// SAFETY: every primitive delivers a message of the shape it is named after
// and `type_descriptor` keeps the one-word default.
unsafe impl Runtime for Headless {
    fn class_named(name: &CStr) -> Id {
        with_world(|world| world.classes.named(name)).map_or(Id::NIL, Id::from_addr)
    }

    fn register_selector(name: &CStr) -> Option<Sel> {
        with_world(|world| world.selectors.intern(name))
    }

    unsafe fn allocate_class(superclass: Id, name: &CStr) -> Id {
        with_world(|world| world.classes.allocate(superclass.addr(), name))
            .map_or(Id::NIL, Id::from_addr)
    }

    unsafe fn add_method(class: Id, sel: Sel, imp: Imp, types: &CStr) -> bool {
        let Some(types) = types.to_str().ok().filter(|types| is_method_encoding(types)) else {
            with_world(|world| world.fault(class, Some(sel), "malformed method encoding"));
            return false;
        };
        // Relays have a single fixed signature
        if types != CallShape::HandleToVoid.encoding() {
            return false;
        }
        with_world(|world| {
            world
                .classes
                .add_method(class.addr(), sel.as_ptr() as usize, MethodBody::Relay(imp), false)
        })
    }

    unsafe fn register_class(class: Id) {
        with_world(|world| {
            if !world.classes.register(class.addr()) {
                world.fault(class, None, "register of unknown or registered class");
            }
        });
    }

    unsafe fn dispose_class(class: Id) {
        with_world(|world| {
            if !world.classes.dispose(class.addr()) {
                world.fault(class, None, "dispose of unknown or registered class");
            }
        });
    }

    unsafe fn set_associated(object: Id, key: *const c_void, value: usize) {
        with_world(|world| {
            if world.is_known(object) {
                world
                    .objects
                    .set_association(object.addr(), key as usize, value);
            } else {
                world.fault(object, None, "association on unknown object");
            }
        });
    }

    unsafe fn associated(object: Id, key: *const c_void) -> usize {
        with_world(|world| {
            if world.is_known(object) {
                world.objects.association(object.addr(), key as usize)
            } else {
                world.fault(object, None, "association on unknown object");
                0
            }
        })
    }

    unsafe fn send_handle(receiver: Id, sel: Sel) -> Id {
        unsafe { message(receiver, sel, CallShape::NoArgsToHandle, Args::None) }.handle()
    }

    unsafe fn send_utf8(receiver: Id, sel: Sel, text: *const c_char) -> Id {
        if text.is_null() {
            with_world(|world| world.fault(receiver, Some(sel), "null string argument"));
            return Id::NIL;
        }
        // SAFETY: the caller guarantees a NUL-terminated string
        let text = unsafe { CStr::from_ptr(text) };
        unsafe { message(receiver, sel, CallShape::Utf8StringToHandle, Args::Text(text)) }
            .handle()
    }

    unsafe fn send_geometry(receiver: Id, sel: Sel, rect: Geometry) -> Id {
        unsafe { message(receiver, sel, CallShape::GeometryToHandle, Args::Geometry(rect)) }
            .handle()
    }

    unsafe fn send_geometry_words_flag(
        receiver: Id,
        sel: Sel,
        rect: Geometry,
        first: u64,
        second: u64,
        flag: bool,
    ) -> Id {
        let args = Args::GeometryWordsFlag(rect, first, second, flag);
        unsafe { message(receiver, sel, CallShape::GeometryWordsFlagToHandle, args) }.handle()
    }

    unsafe fn send_void_handle(receiver: Id, sel: Sel, argument: Id) {
        unsafe { message(receiver, sel, CallShape::HandleToVoid, Args::Handle(argument)) };
    }

    unsafe fn send_void(receiver: Id, sel: Sel) {
        unsafe { message(receiver, sel, CallShape::NoArgsToVoid, Args::None) };
    }

    unsafe fn send_void_flag(receiver: Id, sel: Sel, flag: bool) {
        unsafe { message(receiver, sel, CallShape::FlagToVoid, Args::Flag(flag)) };
    }

    unsafe fn send_returning_geometry(receiver: Id, sel: Sel) -> Geometry {
        unsafe { message(receiver, sel, CallShape::NoArgsToGeometry, Args::None) }.geometry()
    }

    unsafe fn send_returning_word(receiver: Id, sel: Sel) -> u64 {
        unsafe { message(receiver, sel, CallShape::NoArgsToWord, Args::None) }.word()
    }

    unsafe fn send_word(receiver: Id, sel: Sel, value: u64) -> Id {
        unsafe { message(receiver, sel, CallShape::WordToHandle, Args::Word(value)) }.handle()
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
        let args = Args::Timer {
            interval,
            target,
            action,
            payload,
            repeats,
        };
        unsafe { message(receiver, sel, CallShape::ScheduleTimer, args) }.handle()
    }
}
