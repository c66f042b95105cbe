//! Runtime class synthesis.
//!
//! Relay classes are created on first use: a subclass of the runtime's root
//! class, with one `"v@:@"` method per relay. Asking again for a class that
//! exists reuses it.

use std::ffi::CStr;

use crate::diag;
use crate::dispatch;
use crate::encoding::RELAY_METHOD_TYPES;
use crate::error::{Error, Result};
use crate::handle::Id;
use crate::runtime::{Imp, Runtime};

const OPERATION: &str = "ensure_class";

/// A method to install on a synthesized class.
#[derive(Debug, Clone, Copy)]
pub struct MethodSpec {
    /// Selector name, e.g. `c"windowDidResize:"`.
    pub selector: &'static CStr,
    /// The relay invoked for it.
    pub imp: Imp,
}

impl MethodSpec {
    #[must_use]
    pub const fn new(selector: &'static CStr, imp: Imp) -> Self {
        MethodSpec { selector, imp }
    }
}

/// Returns the class named `name`, creating and registering it with
/// `methods` if it does not exist yet.
///
/// For an existing class each method is still offered; the runtime keeps
/// any implementation it already has. For a new class every method must be
/// accepted, otherwise the half-built class is disposed and nothing is
/// registered.
///
/// # Errors
///
/// Returns [`Error::SynthesisFailure`] if the root class is missing, the
/// runtime refuses the class pair or any method, and
/// [`Error::InvalidSelector`] if a selector name is refused.
pub fn ensure_class<R: Runtime>(name: &CStr, methods: &[MethodSpec]) -> Result<Id> {
    let existing = R::class_named(name);
    if !existing.is_nil() {
        for method in methods {
            let sel = dispatch::selector::<R>(method.selector)?;
            // SAFETY: `existing` came from the runtime's class table
            if !unsafe { R::add_method(existing, sel, method.imp, RELAY_METHOD_TYPES) } {
                tahoe_log::debug!(
                    target: OPERATION,
                    "{}: {} already present",
                    name.to_string_lossy(),
                    method.selector.to_string_lossy()
                );
            }
        }
        return Ok(existing);
    }

    diag::reported(OPERATION, synthesize::<R>(name, methods))
}

fn synthesize<R: Runtime>(name: &CStr, methods: &[MethodSpec]) -> Result<Id> {
    let class_name = name.to_string_lossy();

    let root = R::class_named(R::ROOT_CLASS);
    if root.is_nil() {
        return Err(Error::synthesis(
            &class_name,
            format!("root class {} not found", R::ROOT_CLASS.to_string_lossy()),
        ));
    }

    // SAFETY: `root` came from the runtime's class table
    let pair = unsafe { R::allocate_class(root, name) };
    if pair.is_nil() {
        return Err(Error::synthesis(&class_name, "class pair allocation refused"));
    }

    for method in methods {
        let Some(sel) = R::register_selector(method.selector) else {
            // SAFETY: `pair` was never registered
            unsafe { R::dispose_class(pair) };
            return Err(Error::InvalidSelector {
                name: method.selector.to_string_lossy().into_owned(),
            });
        };
        // SAFETY: `pair` is the unregistered pair allocated above
        if !unsafe { R::add_method(pair, sel, method.imp, RELAY_METHOD_TYPES) } {
            unsafe { R::dispose_class(pair) };
            return Err(Error::synthesis(
                &class_name,
                format!("method {} rejected", method.selector.to_string_lossy()),
            ));
        }
    }

    // SAFETY: `pair` is allocated, complete and unregistered
    unsafe { R::register_class(pair) };
    tahoe_log::info!(target: OPERATION, "synthesized class {class_name}");
    Ok(pair)
}
