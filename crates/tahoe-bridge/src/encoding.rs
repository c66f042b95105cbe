//! Call shapes and their Objective-C type encodings.
//!
//! `objc_msgSend` is untyped: receiver, selector, then whatever the callee
//! expects. Struct arguments and struct returns only land in the right
//! registers if the call site is typed, so the bridge supports a closed set
//! of layouts, one typed call per [`CallShape`].
//!
//! Encoding characters used here:
//!
//! - `v` void, `@` object, `:` selector, `#` class
//! - `B` bool, `Q` unsigned long long, `d` double
//! - `r*` const C string
//! - `{CGRect=...}` struct by value

use std::ffi::CStr;
use std::fmt;

/// Encoding of every synthesized relay method: void return, self, `_cmd`,
/// one object argument.
pub static RELAY_METHOD_TYPES: &CStr = c"v@:@";

const RECT: &str = "{CGRect={CGPoint=dd}{CGSize=dd}}";

/// The argument/return layouts the dispatcher can call with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// `-(id)m`
    NoArgsToHandle,
    /// `-(id)m:(const char *)s`
    Utf8StringToHandle,
    /// `-(id)m:(NSRect)r`
    GeometryToHandle,
    /// `-(id)m:(NSRect)r a:(NSUInteger)a b:(NSUInteger)b c:(BOOL)c`
    GeometryWordsFlagToHandle,
    /// `-(void)m:(id)o`
    HandleToVoid,
    /// `-(void)m`
    NoArgsToVoid,
    /// `-(void)m:(BOOL)b`
    FlagToVoid,
    /// `-(NSRect)m`
    NoArgsToGeometry,
    /// `-(unsigned long long)m`
    NoArgsToWord,
    /// `-(id)m:(unsigned long long)v`
    WordToHandle,
    /// `+(id)m:(double)t target:(id)o selector:(SEL)s userInfo:(id)u repeats:(BOOL)r`
    ScheduleTimer,
}

impl CallShape {
    /// Name of the dispatcher operation for this shape; used to tag
    /// diagnostics.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            CallShape::NoArgsToHandle => "send",
            CallShape::Utf8StringToHandle => "send_utf8",
            CallShape::GeometryToHandle => "send_geometry",
            CallShape::GeometryWordsFlagToHandle => "send_geometry_words_flag",
            CallShape::HandleToVoid => "send_void_object",
            CallShape::NoArgsToVoid => "send_void",
            CallShape::FlagToVoid => "send_void_flag",
            CallShape::NoArgsToGeometry => "send_returning_geometry",
            CallShape::NoArgsToWord => "send_returning_word",
            CallShape::WordToHandle => "send_word",
            CallShape::ScheduleTimer => "schedule_timer",
        }
    }

    /// Type encoding of a method with this shape.
    #[must_use]
    pub fn encoding(self) -> String {
        match self {
            CallShape::NoArgsToHandle => "@@:".to_string(),
            CallShape::Utf8StringToHandle => "@@:r*".to_string(),
            CallShape::GeometryToHandle => format!("@@:{RECT}"),
            CallShape::GeometryWordsFlagToHandle => format!("@@:{RECT}QQB"),
            CallShape::HandleToVoid => "v@:@".to_string(),
            CallShape::NoArgsToVoid => "v@:".to_string(),
            CallShape::FlagToVoid => "v@:B".to_string(),
            CallShape::NoArgsToGeometry => format!("{RECT}@:"),
            CallShape::NoArgsToWord => "Q@:".to_string(),
            CallShape::WordToHandle => "@@:Q".to_string(),
            CallShape::ScheduleTimer => "@#:d@:@B".to_string(),
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// Splits a type encoding into one entry per value.
///
/// Struct encodings are kept whole and `r` (const) qualifiers stay attached
/// to the type they qualify. Returns `None` on an unknown character or an
/// unbalanced struct.
///
/// ```
/// use tahoe_bridge::encoding::split_types;
///
/// assert_eq!(split_types("v@:@"), Some(vec!["v", "@", ":", "@"]));
/// assert_eq!(split_types("@@:r*"), Some(vec!["@", "@", ":", "r*"]));
/// assert_eq!(split_types("{S=dd}@:"), Some(vec!["{S=dd}", "@", ":"]));
/// assert_eq!(split_types("v@:x"), None);
/// ```
#[must_use]
pub fn split_types(encoding: &str) -> Option<Vec<&str>> {
    let bytes = encoding.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'r' => {
                // Qualifier; the next entry absorbs it
                i += 1;
                continue;
            }
            b'{' => {
                let mut depth = 0usize;
                loop {
                    match bytes.get(i)? {
                        b'{' => depth += 1,
                        b'}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            b'v' | b'@' | b':' | b'#' | b'B' | b'c' | b'C' | b'i' | b'I' | b'l'
            | b'L' | b'q' | b'Q' | b'f' | b'd' | b'*' | b'^' | b'?' => {}
            _ => return None,
        }
        i += 1;
        parts.push(&encoding[start..i]);
        start = i;
    }

    if start != bytes.len() {
        // Dangling qualifier
        return None;
    }
    Some(parts)
}

/// Returns true if `encoding` describes a method: a return type, `@` (or `#`
/// for class methods) for self, then `:` for `_cmd`.
#[must_use]
pub fn is_method_encoding(encoding: &str) -> bool {
    match split_types(encoding) {
        Some(parts) => parts.len() >= 3 && matches!(parts[1], "@" | "#") && parts[2] == ":",
        None => false,
    }
}
