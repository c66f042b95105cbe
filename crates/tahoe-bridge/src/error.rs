//! Error types for the Tahoe bridge.
//!
//! Every failure the bridge can detect is recovered locally: the operation
//! returns `Err`, emits one diagnostic and never reaches the foreign runtime.
//! The only unrecovered failure is a handle that passes every heuristic but is
//! not a live object; that one surfaces inside the foreign runtime itself.

use std::fmt;

/// Which handle check rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleFault {
    /// The handle is null.
    Null,

    /// The address is below the first mapped page.
    BelowMinimum {
        /// The rejected address.
        addr: usize,
    },

    /// The address is not word aligned.
    Misaligned {
        /// The rejected address.
        addr: usize,
    },

    /// The first word at the address is not a plausible type descriptor.
    BadTypeDescriptor {
        /// The object address.
        addr: usize,
        /// The type-descriptor word read from it.
        isa: usize,
    },
}

impl fmt::Display for HandleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleFault::Null => write!(f, "null"),
            HandleFault::BelowMinimum { addr } => {
                write!(f, "address {addr:#x} below minimum")
            }
            HandleFault::Misaligned { addr } => {
                write!(f, "address {addr:#x} not word aligned")
            }
            HandleFault::BadTypeDescriptor { addr, isa } => {
                write!(f, "object {addr:#x} has implausible type descriptor {isa:#x}")
            }
        }
    }
}

/// A malformed non-handle argument.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadFault {
    /// Width or height outside `0..=16384`, or not a number.
    GeometryOutOfRange {
        /// Requested width.
        width: f64,
        /// Requested height.
        height: f64,
    },

    /// A count-like word does not fit in 32 bits.
    WordOutOfRange {
        /// Argument name (e.g. `style_mask`).
        name: &'static str,
        /// The rejected value.
        value: u64,
    },

    /// A string argument contains an interior NUL byte.
    InteriorNul {
        /// Byte offset of the first NUL.
        position: usize,
    },

    /// A timer interval that is not positive and finite, or above `max`.
    IntervalOutOfRange {
        /// The rejected interval in seconds.
        interval: f64,
        /// Upper bound of the check that failed, if it had one.
        max: Option<f64>,
    },

    /// A context of zero, which relays read as "unbound".
    ZeroContext,

    /// A context that does not fit in a machine word.
    ContextTooWide {
        /// The rejected context.
        value: u64,
    },
}

impl fmt::Display for PayloadFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadFault::GeometryOutOfRange { width, height } => {
                write!(f, "geometry {width}x{height} outside 0..=16384")
            }
            PayloadFault::WordOutOfRange { name, value } => {
                write!(f, "{name} {value} does not fit in 32 bits")
            }
            PayloadFault::InteriorNul { position } => {
                write!(f, "string has interior NUL at byte {position}")
            }
            PayloadFault::IntervalOutOfRange {
                interval,
                max: Some(max),
            } => write!(f, "interval {interval} outside (0, {max}]"),
            PayloadFault::IntervalOutOfRange { interval, max: None } => {
                write!(f, "interval {interval} is not a positive finite number")
            }
            PayloadFault::ZeroContext => write!(f, "context is zero"),
            PayloadFault::ContextTooWide { value } => {
                write!(f, "context {value:#x} wider than a machine word")
            }
        }
    }
}

/// Errors reported by bridge operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A handle argument failed validation.
    InvalidHandle {
        /// Which argument (`receiver`, `argument`, `target`, ...).
        role: &'static str,
        /// The failed check.
        fault: HandleFault,
    },

    /// The runtime refused to produce a selector.
    InvalidSelector {
        /// The selector name.
        name: String,
    },

    /// A non-handle argument is out of its declared bounds.
    InvalidPayload(PayloadFault),

    /// A class or method could not be registered.
    SynthesisFailure {
        /// The class being synthesized.
        class: String,
        /// What went wrong.
        reason: String,
    },

    /// A relay fired without the state it needs to route the event.
    RoutingPrecondition {
        /// The relay name.
        relay: &'static str,
        /// What was missing.
        reason: &'static str,
    },

    /// A class the bridge depends on is not loaded.
    ClassNotFound {
        /// The class name.
        name: String,
    },

    /// The foreign runtime returned nil where an object was required.
    NilResult {
        /// The step that produced nil.
        operation: &'static str,
    },
}

impl Error {
    pub(crate) fn invalid_handle(role: &'static str, fault: HandleFault) -> Self {
        Error::InvalidHandle { role, fault }
    }

    pub(crate) fn synthesis(class: &str, reason: impl Into<String>) -> Self {
        Error::SynthesisFailure {
            class: class.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHandle { role, fault } => {
                write!(f, "invalid {role}: {fault}")
            }
            Error::InvalidSelector { name } => {
                write!(f, "selector '{name}' not available")
            }
            Error::InvalidPayload(fault) => write!(f, "invalid payload: {fault}"),
            Error::SynthesisFailure { class, reason } => {
                write!(f, "failed to synthesize class '{class}': {reason}")
            }
            Error::RoutingPrecondition { relay, reason } => {
                write!(f, "{relay} not routed: {reason}")
            }
            Error::ClassNotFound { name } => write!(f, "class '{name}' not found"),
            Error::NilResult { operation } => {
                write!(f, "{operation} returned nil")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<PayloadFault> for Error {
    fn from(fault: PayloadFault) -> Self {
        Error::InvalidPayload(fault)
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
