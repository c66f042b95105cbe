//! The seam between the bridge and an Objective-C style message runtime.
//!
//! Everything above this module talks to the runtime through [`Runtime`].
//! Two backends implement it:
//!
//! - [`native::Native`] (macOS): libobjc and Foundation, one typed
//!   `objc_msgSend` per [`CallShape`](crate::CallShape).
//! - [`headless::Headless`]: an in-process object world with the handful of
//!   toolkit classes the bridge talks to. Used by the test suite and on
//!   platforms without libobjc.
//!
//! The trait has no `self`: relay trampolines are plain `extern "C"`
//! functions registered with the runtime, and they reach it through the type
//! parameter alone.

use std::ffi::{CStr, c_char, c_void};

use crate::geometry::Geometry;
use crate::handle::{Id, Sel};

pub mod headless;
#[cfg(target_os = "macos")]
pub mod native;

/// Implementation of a synthesized relay method: void return, self, `_cmd`
/// and one object argument (`"v@:@"`).
pub type Imp = unsafe extern "C" fn(receiver: Id, cmd: Sel, argument: Id);

/// An Objective-C style message runtime.
///
/// # Safety
///
/// Implementors must uphold the calling conventions of each primitive: the
/// `send_*` functions deliver a message of exactly the named shape, and
/// [`Runtime::type_descriptor`] reads no more than one word.
pub unsafe trait Runtime: 'static {
    /// Root class every synthesized class inherits from.
    const ROOT_CLASS: &'static CStr = c"NSObject";

    /// Looks up a registered class. Returns nil if none has that name.
    fn class_named(name: &CStr) -> Id;

    /// Interns a selector name.
    fn register_selector(name: &CStr) -> Option<Sel>;

    /// Allocates an unregistered class pair. Returns nil if the name is taken.
    ///
    /// # Safety
    ///
    /// `superclass` must be a class handle.
    unsafe fn allocate_class(superclass: Id, name: &CStr) -> Id;

    /// Adds an instance method. Returns false if the class already has one
    /// for `sel` or the runtime refuses the encoding.
    ///
    /// # Safety
    ///
    /// `class` must be a class handle.
    unsafe fn add_method(class: Id, sel: Sel, imp: Imp, types: &CStr) -> bool;

    /// Registers a class pair returned by [`Runtime::allocate_class`].
    ///
    /// # Safety
    ///
    /// `class` must be an allocated, unregistered class pair.
    unsafe fn register_class(class: Id);

    /// Destroys a class pair that was never registered.
    ///
    /// # Safety
    ///
    /// `class` must be an allocated, unregistered class pair.
    unsafe fn dispose_class(class: Id);

    /// Attaches `value` to `object` under `key` with assign (weak) semantics.
    /// A value of zero removes the association.
    ///
    /// # Safety
    ///
    /// `object` must be a live object.
    unsafe fn set_associated(object: Id, key: *const c_void, value: usize);

    /// Reads the value attached under `key`, or zero.
    ///
    /// # Safety
    ///
    /// `object` must be a live object.
    unsafe fn associated(object: Id, key: *const c_void) -> usize;

    /// Reads the type-descriptor word of an object.
    ///
    /// # Safety
    ///
    /// `object` must point to at least one readable, aligned word.
    unsafe fn type_descriptor(object: Id) -> usize {
        // SAFETY: guaranteed by the caller
        unsafe { object.as_ptr().cast::<usize>().read() }
    }

    /// Returns true if `id` encodes its value inline rather than pointing to
    /// memory.
    fn is_tagged_pointer(_id: Id) -> bool {
        false
    }

    /// `-(id)sel`
    ///
    /// # Safety
    ///
    /// `receiver` must respond to `sel` with this shape.
    unsafe fn send_handle(receiver: Id, sel: Sel) -> Id;

    /// `-(id)sel:(const char *)text`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`]; `text` must be NUL-terminated.
    unsafe fn send_utf8(receiver: Id, sel: Sel, text: *const c_char) -> Id;

    /// `-(id)sel:(NSRect)rect`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_geometry(receiver: Id, sel: Sel, rect: Geometry) -> Id;

    /// `-(id)sel:(NSRect)rect a:(NSUInteger)a b:(NSUInteger)b c:(BOOL)flag`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_geometry_words_flag(
        receiver: Id,
        sel: Sel,
        rect: Geometry,
        first: u64,
        second: u64,
        flag: bool,
    ) -> Id;

    /// `-(void)sel:(id)argument`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_void_handle(receiver: Id, sel: Sel, argument: Id);

    /// `-(void)sel`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_void(receiver: Id, sel: Sel);

    /// `-(void)sel:(BOOL)flag`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_void_flag(receiver: Id, sel: Sel, flag: bool);

    /// `-(NSRect)sel`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_returning_geometry(receiver: Id, sel: Sel) -> Geometry;

    /// `-(unsigned long long)sel`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_returning_word(receiver: Id, sel: Sel) -> u64;

    /// `-(id)sel:(unsigned long long)value`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`].
    unsafe fn send_word(receiver: Id, sel: Sel, value: u64) -> Id;

    /// `+scheduledTimerWithTimeInterval:target:selector:userInfo:repeats:`
    ///
    /// # Safety
    ///
    /// As [`Runtime::send_handle`]; `target` must respond to `action`.
    unsafe fn send_schedule_timer(
        receiver: Id,
        sel: Sel,
        interval: f64,
        target: Id,
        action: Sel,
        payload: Id,
        repeats: bool,
    ) -> Id;
}
