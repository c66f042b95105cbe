//! Diagnostics for rejected calls.
//!
//! Each rejection is written as one `error` record tagged with the name of the
//! operation that refused it. With the `diagnostic-backtrace` feature a
//! backtrace of the caller follows at `trace` level.

use crate::error::{Error, Result};

/// Reports a rejection under `operation`.
pub(crate) fn report(operation: &'static str, error: &Error) {
    tahoe_log::error!(target: operation, "{error}");

    #[cfg(feature = "diagnostic-backtrace")]
    if tahoe_log::enabled(tahoe_log::Level::Trace) {
        let backtrace = backtrace::Backtrace::new();
        tahoe_log::trace!(target: operation, "{backtrace:?}");
    }
}

/// Reports `result` under `operation` if it failed, then passes it through.
pub(crate) fn reported<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(error) = &result {
        report(operation, error);
    }
    result
}
