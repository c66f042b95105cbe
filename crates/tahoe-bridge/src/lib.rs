//! `tahoe-bridge`: a validated bridge into the Objective-C message runtime
//!
//! The bridge lets a caller message toolkit objects it does not own and get
//! toolkit events back. It provides:
//!
//! - **Typed dispatch**: one checked `objc_msgSend` call site per argument
//!   and return layout, so struct arguments land where the ABI expects them
//! - **Handle validation**: obviously bad handles are rejected with a
//!   diagnostic instead of crashing inside the runtime
//! - **Class synthesis**: delegate and timer-target classes created at run
//!   time, once, whose methods relay events to the caller
//! - **Context association**: the caller's context rides on toolkit objects
//!   through the runtime's weak associated storage
//!
//! # Architecture
//!
//! - [`handle`] and [`geometry`]: the values that cross the boundary and
//!   their checks
//! - [`dispatch`]: the typed sends
//! - [`synth`], [`associate`], [`relay`]: callback delivery
//! - [`construct`]: window delegates and animation timers
//! - [`runtime`]: the [`Runtime`] seam, with the macOS runtime and a
//!   headless one for tests
//!
//! # Example
//!
//! ```rust
//! use tahoe_bridge::runtime::headless::Headless;
//! use tahoe_bridge::{EventRouter, create_animation_timer};
//!
//! struct Router;
//!
//! impl EventRouter for Router {
//!     fn mouse_event(_: u64, _: u32, _: u32, _: f64, _: f64, _: u32) {}
//!     fn keyboard_event(_: u64, _: u32, _: u32, _: u32, _: u32) {}
//!     fn focus_event(_: u64, _: u32) {}
//!     fn tick_event(context: u64) {
//!         assert_eq!(context, 42);
//!     }
//!     fn resize_event(_: u64, _: f64, _: f64) {}
//! }
//!
//! let timer = create_animation_timer::<Headless, Router>(42, 1.0 / 60.0).unwrap();
//! Headless::fire_timer(timer);
//! ```

pub mod associate;
pub mod construct;
mod diag;
pub mod dispatch;
pub mod encoding;
pub mod error;
#[cfg(all(target_os = "macos", feature = "c-abi"))]
pub mod ffi;
pub mod geometry;
pub mod handle;
pub mod relay;
pub mod runtime;
pub mod synth;

// Re-export commonly used types
pub use associate::CONTEXT_KEY;
pub use construct::{create_animation_timer, create_window_delegate};
pub use encoding::CallShape;
pub use error::{Error, HandleFault, PayloadFault, Result};
pub use geometry::Geometry;
pub use handle::{Id, Provenance, Sel};
pub use relay::EventRouter;
pub use runtime::{Imp, Runtime};
pub use synth::{MethodSpec, ensure_class};
