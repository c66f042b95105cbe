//! A minimal, zero-dependency logging crate for the Tahoe bridge.
//!
//! Records go to **stderr**, one line each, flushed immediately: the bridge
//! emits its diagnostics right before handing control to a foreign runtime
//! that may take the process down, so nothing may sit in a buffer.
//!
//! Every macro accepts an optional `target:` tag. The bridge uses it to name
//! the rejected operation; without it the calling module path is used.
//!
//! # Example
//!
//! ```
//! use tahoe_log::{error, info, Level};
//!
//! tahoe_log::set_level(Level::Info);
//!
//! info!("bridge ready");
//! error!(target: "send_geometry", "width {} out of range", 20_000.0);
//! ```

use std::cell::RefCell;
use std::fmt::{self, Arguments};
use std::io::{IsTerminal, Write};
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Environment variable read by [`init_from_env`] for the minimum level.
pub const LEVEL_ENV: &str = "TAHOE_LOG";

/// Log levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Rejected calls and broken invariants
    Error = 0,
    /// Recoverable oddities
    Warn = 1,
    /// One-off lifecycle events (class synthesized, timer scheduled)
    Info = 2,
    /// Per-call detail
    Debug = 3,
    /// Everything, including successful foreign calls
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring case.
    ///
    /// ```
    /// use tahoe_log::Level;
    ///
    /// assert_eq!("warn".parse::<Level>(), Ok(Level::Warn));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// The global logger.
///
/// Holds the minimum level and whether output is coloured. Obtain it through
/// [`get_logger`].
pub struct Logger {
    level: AtomicU8,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level, color: bool) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            color: AtomicBool::new(color),
        }
    }

    /// Sets the minimum level.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Turns ANSI colouring on or off.
    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }

    /// Returns true if a record at `level` passes the filter.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it at `Info` on first use.
///
/// Colour is on only when stderr is a terminal.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Info, std::io::stderr().is_terminal()))
}

/// Sets the minimum level of the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the minimum level from a level name.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if `s` does not name a level; the current
/// level is left untouched.
pub fn set_level_from_str(s: &str) -> Result<(), ParseLevelError> {
    set_level(s.parse()?);
    Ok(())
}

/// Configures the global logger from the environment.
///
/// Reads the level from [`LEVEL_ENV`] when set and disables colour when
/// `NO_COLOR` is present.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if [`LEVEL_ENV`] holds an unknown level name.
pub fn init_from_env() -> Result<(), ParseLevelError> {
    if std::env::var_os("NO_COLOR").is_some() {
        get_logger().set_color(false);
    }
    match std::env::var(LEVEL_ENV) {
        Ok(value) => set_level_from_str(&value),
        Err(_) => Ok(()),
    }
}

/// A captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Severity
    pub level: Level,
    /// Operation tag or module path
    pub target: String,
    /// Formatted message
    pub message: String,
}

thread_local! {
    static CAPTURE: RefCell<Option<Vec<Record>>> = const { RefCell::new(None) };
}

/// Restores the outer capture state if the captured closure unwinds.
struct Restore(Option<Option<Vec<Record>>>);

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            CAPTURE.with(|c| c.replace(previous));
        }
    }
}

/// Runs `f` with every record emitted on this thread diverted into a buffer.
///
/// Captured records bypass the level filter and are not written to stderr.
/// Captures nest; an inner capture does not leak into the outer one.
///
/// ```
/// use tahoe_log::{capture, error, Level};
///
/// let ((), records) = capture(|| error!(target: "send", "nil receiver"));
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].level, Level::Error);
/// assert_eq!(records[0].target, "send");
/// ```
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<Record>) {
    let previous = CAPTURE.with(|c| c.replace(Some(Vec::new())));
    let mut restore = Restore(Some(previous));
    let value = f();
    let previous = restore.0.take().flatten();
    let records = CAPTURE.with(|c| c.replace(previous)).unwrap_or_default();
    (value, records)
}

fn capturing() -> bool {
    CAPTURE.with(|c| c.borrow().is_some())
}

/// Returns true if a record at `level` would be emitted on this thread.
#[doc(hidden)]
pub fn enabled(level: Level) -> bool {
    capturing() || get_logger().enabled(level)
}

/// Writes one record. Called by the macros after [`enabled`].
#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: Arguments) {
    let captured = CAPTURE.with(|c| match c.borrow_mut().as_mut() {
        Some(buffer) => {
            buffer.push(Record {
                level,
                target: target.to_string(),
                message: args.to_string(),
            });
            true
        }
        None => false,
    });
    if captured {
        return;
    }

    let logger = get_logger();
    let mut err = std::io::stderr().lock();
    let _ = if logger.color.load(Ordering::Relaxed) {
        writeln!(err, "{}[{level}]\x1b[0m {target}: {args}", level.color_code())
    } else {
        writeln!(err, "[{level}] {target}: {args}")
    };
    let _ = err.flush();
}

/// Logs a record at an explicit level.
///
/// ```
/// use tahoe_log::{log, Level};
///
/// log!(level: Level::Info, "answer: {}", 42);
/// log!(target: "schedule_timer", level: Level::Warn, "slow tick");
/// ```
#[macro_export]
macro_rules! log {
    (target: $target:expr, level: $level:expr, $($arg:tt)+) => {{
        let level = $level;
        if $crate::enabled(level) {
            $crate::__emit(level, $target, format_args!($($arg)+));
        }
    }};
    (level: $level:expr, $($arg:tt)+) => {
        $crate::log!(target: module_path!(), level: $level, $($arg)+)
    };
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, level: $crate::Level::Error, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!(level: $crate::Level::Error, $($arg)+)
    };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, level: $crate::Level::Warn, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)+)
    };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, level: $crate::Level::Info, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!(level: $crate::Level::Info, $($arg)+)
    };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, level: $crate::Level::Debug, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)+)
    };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, level: $crate::Level::Trace, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("error".parse(), Ok(Level::Error));
        assert_eq!("WARN".parse(), Ok(Level::Warn));
        assert_eq!("warning".parse(), Ok(Level::Warn));
        assert_eq!(" Info ".parse(), Ok(Level::Info));
        assert_eq!("DEBUG".parse(), Ok(Level::Debug));
        assert_eq!("trace".parse(), Ok(Level::Trace));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Error.to_string(), "ERROR");
        assert_eq!(Level::Trace.as_str(), "TRACE");
    }

    #[test]
    fn test_logger_level_filtering() {
        let logger = Logger::new(Level::Info, false);

        assert!(logger.enabled(Level::Error));
        assert!(logger.enabled(Level::Info));
        assert!(!logger.enabled(Level::Debug));

        logger.set_level(Level::Trace);
        assert!(logger.enabled(Level::Trace));
        assert_eq!(logger.level(), Level::Trace);
    }

    #[test]
    fn test_set_level_from_str_rejects_unknown() {
        assert!(set_level_from_str("loudest").is_err());
    }

    #[test]
    fn test_capture_records_target_and_message() {
        let ((), records) = capture(|| {
            error!(target: "send_geometry", "width {} too large", 20_000);
            warn!("plain");
        });

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, "send_geometry");
        assert_eq!(records[0].message, "width 20000 too large");
        assert_eq!(records[1].level, Level::Warn);
        assert_eq!(records[1].target, module_path!());
    }

    #[test]
    fn test_capture_bypasses_level_filter() {
        let ((), records) = capture(|| trace!(target: "send", "detail"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Trace);
    }

    #[test]
    fn test_nested_capture_is_isolated() {
        let (inner, outer) = capture(|| {
            info!("outer");
            let ((), inner) = capture(|| info!("inner"));
            inner
        });

        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].message, "inner");
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].message, "outer");
    }

    #[test]
    fn test_capture_returns_value() {
        let (value, records) = capture(|| 7);
        assert_eq!(value, 7);
        assert!(records.is_empty());
    }

    #[test]
    fn test_capture_is_per_thread() {
        let ((), records) = capture(|| {
            std::thread::spawn(|| error!(target: "other", "not captured here"))
                .join()
                .unwrap();
        });
        assert!(records.is_empty());
    }
}
