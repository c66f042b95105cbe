//! Caller context attached to runtime objects.
//!
//! Uses the runtime's own associated-object storage with assign (weak)
//! semantics: the stored value is an integer dressed as an object pointer,
//! never retained and never messaged. Keys are compared by address, so a key
//! must be a `'static` string.

use std::ffi::{CStr, c_void};

use crate::diag;
use crate::error::{Error, PayloadFault, Result};
use crate::handle::{self, Id, Provenance};
use crate::runtime::Runtime;

/// Key under which delegates and timer targets carry their window context.
pub static CONTEXT_KEY: &CStr = c"windowPtr";

fn key_ptr(key: &'static CStr) -> *const c_void {
    key.as_ptr().cast()
}

fn check_object<R: Runtime>(object: Id) -> Result<()> {
    // SAFETY: `Fresh` never reads through the handle
    unsafe { handle::validate::<R>(object, Provenance::Fresh) }
        .map_err(|fault| Error::invalid_handle("object", fault))
}

/// Attaches `value` to `object` under `key`, replacing any previous value.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad object,
/// [`PayloadFault::ZeroContext`] for zero (which reads back as unbound) and
/// [`PayloadFault::ContextTooWide`] if `value` does not fit in a pointer.
///
/// # Safety
///
/// `object` must be a live object of runtime `R`.
pub unsafe fn bind<R: Runtime>(object: Id, key: &'static CStr, value: u64) -> Result<()> {
    let word = check_object::<R>(object).and_then(|()| -> Result<usize> {
        if value == 0 {
            return Err(PayloadFault::ZeroContext.into());
        }
        usize::try_from(value).map_err(|_| PayloadFault::ContextTooWide { value }.into())
    });
    let word = diag::reported("bind", word)?;
    // SAFETY: object validated; liveness guaranteed by the caller
    unsafe { R::set_associated(object, key_ptr(key), word) };
    Ok(())
}

/// Reads the value attached to `object` under `key`.
///
/// Returns `Ok(None)` when nothing is bound; a stored zero reads the same.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad object.
///
/// # Safety
///
/// `object` must be a live object of runtime `R`.
pub unsafe fn lookup<R: Runtime>(object: Id, key: &'static CStr) -> Result<Option<u64>> {
    diag::reported("lookup", check_object::<R>(object))?;
    // SAFETY: as above
    let word = unsafe { R::associated(object, key_ptr(key)) };
    Ok((word != 0).then_some(word as u64))
}

/// Removes the value attached to `object` under `key`, for when the
/// caller's logical owner goes away before the object does.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] for a bad object.
///
/// # Safety
///
/// `object` must be a live object of runtime `R`.
pub unsafe fn unbind<R: Runtime>(object: Id, key: &'static CStr) -> Result<()> {
    diag::reported("unbind", check_object::<R>(object))?;
    unsafe { R::set_associated(object, key_ptr(key), 0) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch;
    use crate::runtime::headless::Headless;

    fn object() -> Id {
        let class = dispatch::class::<Headless>(c"NSObject").unwrap();
        let alloc = dispatch::selector::<Headless>(c"alloc").unwrap();
        unsafe { dispatch::send::<Headless>(class, alloc).unwrap() }
    }

    #[test]
    fn test_bind_then_lookup() {
        let object = object();
        unsafe {
            assert_eq!(lookup::<Headless>(object, CONTEXT_KEY), Ok(None));
            bind::<Headless>(object, CONTEXT_KEY, 0x1234).unwrap();
            assert_eq!(lookup::<Headless>(object, CONTEXT_KEY), Ok(Some(0x1234)));

            bind::<Headless>(object, CONTEXT_KEY, 7).unwrap();
            assert_eq!(lookup::<Headless>(object, CONTEXT_KEY), Ok(Some(7)));
        }
    }

    #[test]
    fn test_keys_compare_by_address() {
        static OTHER: &CStr = c"windowPtr";
        let object = object();
        unsafe {
            bind::<Headless>(object, CONTEXT_KEY, 1).unwrap();
            if !std::ptr::eq(OTHER.as_ptr(), CONTEXT_KEY.as_ptr()) {
                assert_eq!(lookup::<Headless>(object, OTHER), Ok(None));
            }
        }
    }

    #[test]
    fn test_unbind() {
        let object = object();
        unsafe {
            bind::<Headless>(object, CONTEXT_KEY, 99).unwrap();
            unbind::<Headless>(object, CONTEXT_KEY).unwrap();
            assert_eq!(lookup::<Headless>(object, CONTEXT_KEY), Ok(None));
        }
    }

    #[test]
    fn test_zero_rejected() {
        let object = object();
        let result = unsafe { bind::<Headless>(object, CONTEXT_KEY, 0) };
        assert_eq!(result, Err(PayloadFault::ZeroContext.into()));
    }

    #[test]
    fn test_bad_object_never_reaches_runtime() {
        let before = Headless::message_count();
        let faults = Headless::fault_count();
        let (result, records) = tahoe_log::capture(|| unsafe {
            bind::<Headless>(Id::from_addr(0x800), CONTEXT_KEY, 5)
        });

        assert!(matches!(result, Err(Error::InvalidHandle { role: "object", .. })));
        assert_eq!(Headless::message_count(), before);
        assert_eq!(Headless::fault_count(), faults);
        let errors: Vec<_> = records
            .iter()
            .filter(|r| r.level == tahoe_log::Level::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].target, "bind");
    }
}
