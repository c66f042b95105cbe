//! Built-in toolkit classes of the headless runtime.
//!
//! Just enough of Foundation and AppKit for the bridge: allocation, strings,
//! numbers, repeating timers, views, windows with delegates, and
//! notifications.

use std::ffi::CStr;

use super::World;
use super::class::MethodBody;
use super::object::Payload;
use crate::encoding::CallShape;
use crate::geometry::Geometry;
use crate::handle::{Id, Sel};

/// A built-in method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Native {
    Alloc,
    Init,
    StringWithUtf8,
    NumberWithWord,
    WordValue,
    ScheduleTimer,
    UserInfo,
    Invalidate,
    Fire,
    InitWithFrame,
    Frame,
    SetHidden,
    InitWindow,
    ContentView,
    SetDelegate,
    Delegate,
    SetTitle,
    Title,
    StyleMask,
    MakeKeyAndOrderFront,
    NotificationObject,
}

impl Native {
    pub(super) const fn shape(self) -> CallShape {
        match self {
            Native::Alloc
            | Native::Init
            | Native::UserInfo
            | Native::ContentView
            | Native::Delegate
            | Native::Title
            | Native::NotificationObject => CallShape::NoArgsToHandle,
            Native::StringWithUtf8 => CallShape::Utf8StringToHandle,
            Native::NumberWithWord => CallShape::WordToHandle,
            Native::WordValue | Native::StyleMask => CallShape::NoArgsToWord,
            Native::ScheduleTimer => CallShape::ScheduleTimer,
            Native::Invalidate | Native::Fire => CallShape::NoArgsToVoid,
            Native::InitWithFrame => CallShape::GeometryToHandle,
            Native::Frame => CallShape::NoArgsToGeometry,
            Native::SetHidden => CallShape::FlagToVoid,
            Native::InitWindow => CallShape::GeometryWordsFlagToHandle,
            Native::SetDelegate | Native::SetTitle | Native::MakeKeyAndOrderFront => {
                CallShape::HandleToVoid
            }
        }
    }
}

/// Class name, superclass name, then `(selector, body, class side)` rows.
type ClassSpec = (
    &'static CStr,
    Option<&'static CStr>,
    &'static [(&'static CStr, Native, bool)],
);

const CLASSES: &[ClassSpec] = &[
    (
        c"NSObject",
        None,
        &[(c"alloc", Native::Alloc, true), (c"init", Native::Init, false)],
    ),
    (
        c"NSString",
        Some(c"NSObject"),
        &[(c"stringWithUTF8String:", Native::StringWithUtf8, true)],
    ),
    (
        c"NSNumber",
        Some(c"NSObject"),
        &[
            (c"numberWithUnsignedLongLong:", Native::NumberWithWord, true),
            (c"unsignedLongLongValue", Native::WordValue, false),
        ],
    ),
    (
        c"NSTimer",
        Some(c"NSObject"),
        &[
            (
                c"scheduledTimerWithTimeInterval:target:selector:userInfo:repeats:",
                Native::ScheduleTimer,
                true,
            ),
            (c"userInfo", Native::UserInfo, false),
            (c"invalidate", Native::Invalidate, false),
            (c"fire", Native::Fire, false),
        ],
    ),
    (
        c"NSView",
        Some(c"NSObject"),
        &[
            (c"initWithFrame:", Native::InitWithFrame, false),
            (c"frame", Native::Frame, false),
            (c"setHidden:", Native::SetHidden, false),
        ],
    ),
    (
        c"NSWindow",
        Some(c"NSObject"),
        &[
            (
                c"initWithContentRect:styleMask:backing:defer:",
                Native::InitWindow,
                false,
            ),
            (c"frame", Native::Frame, false),
            (c"contentView", Native::ContentView, false),
            (c"setDelegate:", Native::SetDelegate, false),
            (c"delegate", Native::Delegate, false),
            (c"setTitle:", Native::SetTitle, false),
            (c"title", Native::Title, false),
            (c"styleMask", Native::StyleMask, false),
            (c"makeKeyAndOrderFront:", Native::MakeKeyAndOrderFront, false),
        ],
    ),
    (
        c"NSNotification",
        Some(c"NSObject"),
        &[(c"object", Native::NotificationObject, false)],
    ),
];

/// Decoded message arguments.
#[derive(Debug, Clone, Copy)]
pub(super) enum Args<'a> {
    None,
    Text(&'a CStr),
    Geometry(Geometry),
    GeometryWordsFlag(Geometry, u64, u64, bool),
    Handle(Id),
    Flag(bool),
    Word(u64),
    Timer {
        interval: f64,
        target: Id,
        action: Sel,
        payload: Id,
        repeats: bool,
    },
}

/// A method's return value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Ret {
    Void,
    Handle(Id),
    Geometry(Geometry),
    Word(u64),
}

impl Ret {
    pub(super) fn handle(self) -> Id {
        match self {
            Ret::Handle(id) => id,
            _ => Id::NIL,
        }
    }

    pub(super) fn geometry(self) -> Geometry {
        match self {
            Ret::Geometry(rect) => rect,
            _ => Geometry::default(),
        }
    }

    pub(super) fn word(self) -> u64 {
        match self {
            Ret::Word(value) => value,
            _ => 0,
        }
    }
}

/// A `-(void)sel:(id)argument` message to deliver once the world is no
/// longer borrowed, since its target may be a relay that calls back in.
#[derive(Debug, Clone, Copy)]
pub(super) struct Deferred {
    pub(super) receiver: Id,
    pub(super) sel: Sel,
    pub(super) argument: Id,
}

pub(super) struct Outcome {
    pub(super) ret: Ret,
    pub(super) then: Option<Deferred>,
}

impl From<Ret> for Outcome {
    fn from(ret: Ret) -> Self {
        Outcome { ret, then: None }
    }
}

impl World {
    /// Defines the built-in classes.
    pub(super) fn install_toolkit(&mut self) {
        for (name, superclass, methods) in CLASSES {
            let superclass = superclass.and_then(|name| self.classes.named(name));
            let class = self.classes.define(name, superclass);
            for (selector, native, class_side) in *methods {
                if let Some(sel) = self.selectors.intern(selector) {
                    let added = self.classes.add_method(
                        class,
                        sel.as_ptr() as usize,
                        MethodBody::Native(*native),
                        *class_side,
                    );
                    debug_assert!(added, "duplicate toolkit method");
                }
            }
        }
    }

    fn class_addr(&self, name: &CStr) -> usize {
        self.classes.named(name).unwrap_or(0)
    }

    /// Runs a built-in method. Returns `None` when the receiver's state
    /// does not support it.
    pub(super) fn perform(&mut self, native: Native, receiver: Id, args: Args<'_>) -> Option<Outcome> {
        let outcome = match (native, args) {
            (Native::Alloc, Args::None) => {
                Ret::Handle(self.objects.create(receiver.addr(), Payload::Plain)).into()
            }
            (Native::Init, Args::None) => Ret::Handle(receiver).into(),
            (Native::StringWithUtf8, Args::Text(text)) => {
                let class = self.class_addr(c"NSString");
                let bytes = text.to_bytes().to_vec();
                Ret::Handle(self.objects.create(class, Payload::Text(bytes))).into()
            }
            (Native::NumberWithWord, Args::Word(value)) => {
                let class = self.class_addr(c"NSNumber");
                Ret::Handle(self.objects.create(class, Payload::Number(value))).into()
            }
            (Native::WordValue, Args::None) => match self.objects.get(receiver)?.payload {
                Payload::Number(value) => Ret::Word(value).into(),
                _ => return None,
            },
            (
                Native::ScheduleTimer,
                Args::Timer {
                    interval,
                    target,
                    action,
                    payload,
                    repeats,
                },
            ) => {
                let class = self.class_addr(c"NSTimer");
                let timer = Payload::Timer {
                    interval,
                    target,
                    action,
                    user_info: payload,
                    repeats,
                    valid: true,
                };
                Ret::Handle(self.objects.create(class, timer)).into()
            }
            (Native::UserInfo, Args::None) => match self.objects.get(receiver)?.payload {
                Payload::Timer { user_info, .. } => Ret::Handle(user_info).into(),
                _ => return None,
            },
            (Native::Invalidate, Args::None) => match &mut self.objects.get_mut(receiver)?.payload {
                Payload::Timer { valid, .. } => {
                    *valid = false;
                    Ret::Void.into()
                }
                _ => return None,
            },
            (Native::Fire, Args::None) => match &mut self.objects.get_mut(receiver)?.payload {
                Payload::Timer {
                    target,
                    action,
                    repeats,
                    valid,
                    ..
                } => {
                    let then = valid.then_some(Deferred {
                        receiver: *target,
                        sel: *action,
                        argument: receiver,
                    });
                    if !*repeats {
                        *valid = false;
                    }
                    Outcome { ret: Ret::Void, then }
                }
                _ => return None,
            },
            (Native::InitWithFrame, Args::Geometry(frame)) => {
                let record = self.objects.get_mut(receiver)?;
                record.payload = Payload::View {
                    frame,
                    hidden: false,
                };
                Ret::Handle(receiver).into()
            }
            (Native::Frame, Args::None) => match self.objects.get(receiver)?.payload {
                Payload::View { frame, .. } | Payload::Window { frame, .. } => {
                    Ret::Geometry(frame).into()
                }
                _ => return None,
            },
            (Native::SetHidden, Args::Flag(flag)) => {
                match &mut self.objects.get_mut(receiver)?.payload {
                    Payload::View { hidden, .. } => {
                        *hidden = flag;
                        Ret::Void.into()
                    }
                    _ => return None,
                }
            }
            (Native::InitWindow, Args::GeometryWordsFlag(frame, style_mask, _backing, _defer)) => {
                if !self.objects.contains(receiver) {
                    return None;
                }
                let view_class = self.class_addr(c"NSView");
                let content_view = self.objects.create(
                    view_class,
                    Payload::View {
                        frame: Geometry::sized(frame.width, frame.height),
                        hidden: false,
                    },
                );
                let record = self.objects.get_mut(receiver)?;
                record.payload = Payload::Window {
                    frame,
                    style_mask,
                    content_view,
                    delegate: Id::NIL,
                    title: Id::NIL,
                    visible: false,
                };
                Ret::Handle(receiver).into()
            }
            (Native::ContentView, Args::None) => match self.objects.get(receiver)?.payload {
                Payload::Window { content_view, .. } => Ret::Handle(content_view).into(),
                _ => return None,
            },
            (Native::Delegate, Args::None) => match self.objects.get(receiver)?.payload {
                Payload::Window { delegate, .. } => Ret::Handle(delegate).into(),
                _ => return None,
            },
            (Native::Title, Args::None) => match self.objects.get(receiver)?.payload {
                Payload::Window { title, .. } => Ret::Handle(title).into(),
                _ => return None,
            },
            (Native::StyleMask, Args::None) => match self.objects.get(receiver)?.payload {
                Payload::Window { style_mask, .. } => Ret::Word(style_mask).into(),
                _ => return None,
            },
            (Native::SetDelegate, Args::Handle(value)) => {
                match &mut self.objects.get_mut(receiver)?.payload {
                    Payload::Window { delegate, .. } => {
                        *delegate = value;
                        Ret::Void.into()
                    }
                    _ => return None,
                }
            }
            (Native::SetTitle, Args::Handle(value)) => {
                match &mut self.objects.get_mut(receiver)?.payload {
                    Payload::Window { title, .. } => {
                        *title = value;
                        Ret::Void.into()
                    }
                    _ => return None,
                }
            }
            (Native::MakeKeyAndOrderFront, Args::Handle(_)) => {
                match &mut self.objects.get_mut(receiver)?.payload {
                    Payload::Window { visible, .. } => {
                        *visible = true;
                        Ret::Void.into()
                    }
                    _ => return None,
                }
            }
            (Native::NotificationObject, Args::None) => {
                match self.objects.get(receiver)?.payload {
                    Payload::Notification { object } => Ret::Handle(object).into(),
                    _ => return None,
                }
            }
            _ => return None,
        };
        Some(outcome)
    }

    /// Resizes a window and its content view, and builds the notification
    /// its delegate would receive.
    pub(super) fn apply_resize(&mut self, window: Id, width: f64, height: f64) -> Option<(Id, Id)> {
        let (content_view, delegate) = match &mut self.objects.get_mut(window)?.payload {
            Payload::Window {
                frame,
                content_view,
                delegate,
                ..
            } => {
                frame.width = width;
                frame.height = height;
                (*content_view, *delegate)
            }
            _ => return None,
        };
        if let Some(record) = self.objects.get_mut(content_view) {
            if let Payload::View { frame, .. } = &mut record.payload {
                *frame = Geometry::sized(width, height);
            }
        }
        let class = self.class_addr(c"NSNotification");
        let notification = self
            .objects
            .create(class, Payload::Notification { object: window });
        Some((delegate, notification))
    }

    pub(super) fn timer_state(&self, timer: Id) -> Option<(f64, bool)> {
        match self.objects.get(timer)?.payload {
            Payload::Timer {
                interval, valid, ..
            } => Some((interval, valid)),
            _ => None,
        }
    }

    pub(super) fn visibility(&self, id: Id) -> Option<bool> {
        match self.objects.get(id)?.payload {
            Payload::View { hidden, .. } => Some(!hidden),
            Payload::Window { visible, .. } => Some(visible),
            _ => None,
        }
    }

    pub(super) fn text(&self, id: Id) -> Option<String> {
        match &self.objects.get(id)?.payload {
            Payload::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}
