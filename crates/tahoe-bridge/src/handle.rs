//! Opaque handles and the heuristic checks applied before they cross into the
//! foreign runtime.
//!
//! A handle is a machine word naming a class or an instance. The bridge never
//! owns what it names. Before a handle is passed to the runtime it must be:
//!
//! 1. non-null;
//! 2. at or above [`MIN_ADDRESS`];
//! 3. a multiple of [`WORD_ALIGNMENT`];
//! 4. for receivers known to be initialized, its first word (the type
//!    descriptor) must itself pass 1–3 and sit at or below
//!    [`USER_SPACE_CEILING`].
//!
//! Check 4 is skipped for handles that may be freshly allocated, whose type
//! descriptor is not meaningful yet. Passing every check does not prove the
//! handle is live; a stale pointer still faults inside the runtime.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use crate::error::HandleFault;
use crate::runtime::Runtime;

/// Lowest address accepted as a real object.
pub const MIN_ADDRESS: usize = 0x1000;

/// Required alignment of object and class addresses.
pub const WORD_ALIGNMENT: usize = 8;

/// Highest address accepted for a type descriptor.
pub const USER_SPACE_CEILING: usize = 0x7fff_ffff_ffff;

/// A nullable object or class handle, as the runtime passes it around.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Id(*mut c_void);

impl Id {
    /// The null handle.
    pub const NIL: Id = Id(std::ptr::null_mut());

    /// Wraps a raw address. The value is unchecked until it reaches a
    /// dispatcher operation.
    #[must_use]
    pub fn from_addr(addr: usize) -> Self {
        Id(addr as *mut c_void)
    }

    /// Wraps a raw pointer.
    #[must_use]
    pub fn from_ptr<T>(ptr: *mut T) -> Self {
        Id(ptr.cast())
    }

    /// Returns the raw pointer.
    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    /// Returns the address.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0 as usize
    }

    /// Returns true for the null handle.
    #[must_use]
    pub fn is_nil(self) -> bool {
        self.0.is_null()
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::NIL
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "Id(nil)")
        } else {
            write!(f, "Id({:#x})", self.addr())
        }
    }
}

/// An interned selector token. Compared by identity, never dereferenced here.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Sel(NonNull<c_void>);

impl Sel {
    /// Wraps a raw selector, rejecting null.
    #[must_use]
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Sel)
    }

    /// Returns the raw pointer.
    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for Sel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sel({:p})", self.0)
    }
}

/// What the caller knows about a handle's initialization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// A class or an initialized instance; its type descriptor is checked.
    Initialized,
    /// Possibly allocated but not yet initialized; checks stop at alignment.
    Fresh,
    /// Returned by the runtime itself during a relay. May be a tagged
    /// pointer; otherwise checked like `Initialized`.
    FromRuntime,
}

/// Checks 1–3: non-null, at or above [`MIN_ADDRESS`], word aligned.
///
/// # Errors
///
/// Returns the first failed check.
///
/// ```
/// use tahoe_bridge::handle::check_address;
/// use tahoe_bridge::HandleFault;
///
/// assert_eq!(check_address(0), Err(HandleFault::Null));
/// assert_eq!(check_address(0x800), Err(HandleFault::BelowMinimum { addr: 0x800 }));
/// assert_eq!(check_address(0x1004), Err(HandleFault::Misaligned { addr: 0x1004 }));
/// assert!(check_address(0x1008).is_ok());
/// ```
pub const fn check_address(addr: usize) -> Result<(), HandleFault> {
    if addr == 0 {
        return Err(HandleFault::Null);
    }
    if addr < MIN_ADDRESS {
        return Err(HandleFault::BelowMinimum { addr });
    }
    if addr % WORD_ALIGNMENT != 0 {
        return Err(HandleFault::Misaligned { addr });
    }
    Ok(())
}

/// Check 4 applied to an already-read type-descriptor word.
///
/// # Errors
///
/// Returns [`HandleFault::BadTypeDescriptor`] if `isa` is null, below
/// [`MIN_ADDRESS`], unaligned or above [`USER_SPACE_CEILING`].
pub const fn check_type_descriptor(addr: usize, isa: usize) -> Result<(), HandleFault> {
    let plausible = isa != 0
        && isa >= MIN_ADDRESS
        && isa % WORD_ALIGNMENT == 0
        && isa <= USER_SPACE_CEILING;
    if plausible {
        Ok(())
    } else {
        Err(HandleFault::BadTypeDescriptor { addr, isa })
    }
}

/// Validates a handle before it reaches runtime `R`.
///
/// Checks 1–3 apply to every caller-supplied handle. Only
/// [`Provenance::FromRuntime`] handles may be tagged pointers, as reported
/// by [`Runtime::is_tagged_pointer`]; those carry their value inline and are
/// accepted once known non-null.
///
/// # Errors
///
/// Returns the first failed check; never panics.
///
/// # Safety
///
/// With [`Provenance::Initialized`] or [`Provenance::FromRuntime`], a
/// handle that passes checks 1–3 is dereferenced to read its type
/// descriptor, so it must point to readable memory.
pub unsafe fn validate<R: Runtime>(id: Id, provenance: Provenance) -> Result<(), HandleFault> {
    if id.is_nil() {
        return Err(HandleFault::Null);
    }
    if provenance == Provenance::FromRuntime && R::is_tagged_pointer(id) {
        return Ok(());
    }
    check_address(id.addr())?;
    if provenance == Provenance::Fresh {
        return Ok(());
    }
    // SAFETY: the caller guarantees readable memory behind an initialized
    // handle, and checks 1-3 ruled out null and unaligned reads.
    let isa = unsafe { R::type_descriptor(id) };
    check_type_descriptor(id.addr(), isa)
}

/// Checks 1–3 applied to a pointer to a by-value struct argument handed over
/// through the C ABI.
///
/// # Errors
///
/// Returns the first failed check.
pub fn check_struct_pointer<T>(ptr: *const T) -> Result<(), HandleFault> {
    check_address(ptr as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::headless::Headless;

    #[test]
    fn test_check_address_order() {
        assert_eq!(check_address(0), Err(HandleFault::Null));
        // Below minimum wins over misalignment
        assert_eq!(check_address(0x7), Err(HandleFault::BelowMinimum { addr: 0x7 }));
        assert_eq!(check_address(0xfff), Err(HandleFault::BelowMinimum { addr: 0xfff }));
        assert_eq!(check_address(0x1001), Err(HandleFault::Misaligned { addr: 0x1001 }));
        assert!(check_address(0x1000).is_ok());
    }

    #[test]
    fn test_check_type_descriptor() {
        assert!(check_type_descriptor(0x2000, 0x4000).is_ok());
        assert!(check_type_descriptor(0x2000, USER_SPACE_CEILING - 7).is_ok());

        for isa in [0, 0x800, 0x4004, USER_SPACE_CEILING + 1, usize::MAX - 7] {
            assert_eq!(
                check_type_descriptor(0x2000, isa),
                Err(HandleFault::BadTypeDescriptor { addr: 0x2000, isa })
            );
        }
    }

    #[test]
    fn test_fresh_skips_type_descriptor() {
        // First word is null: fine while the object may be uninitialized
        let storage = Box::new([0usize; 2]);
        let id = Id::from_ptr(Box::into_raw(storage));

        unsafe {
            assert!(validate::<Headless>(id, Provenance::Fresh).is_ok());
            assert_eq!(
                validate::<Headless>(id, Provenance::Initialized),
                Err(HandleFault::BadTypeDescriptor { addr: id.addr(), isa: 0 })
            );
            drop(Box::from_raw(id.as_ptr().cast::<[usize; 2]>()));
        }
    }

    #[test]
    fn test_initialized_accepts_plausible_descriptor() {
        let class_word = Box::new(0usize);
        let class_addr = &*class_word as *const usize as usize;
        let object = Box::new([class_addr, 0]);
        let id = Id::from_ptr(&*object as *const [usize; 2] as *mut [usize; 2]);

        assert!(unsafe { validate::<Headless>(id, Provenance::Initialized) }.is_ok());
    }

    #[test]
    fn test_nil_rejected_before_anything_else() {
        assert_eq!(
            unsafe { validate::<Headless>(Id::NIL, Provenance::Initialized) },
            Err(HandleFault::Null)
        );
    }

    #[test]
    fn test_id_debug() {
        assert_eq!(format!("{:?}", Id::NIL), "Id(nil)");
        assert_eq!(format!("{:?}", Id::from_addr(0x1000)), "Id(0x1000)");
    }

    #[test]
    fn test_sel_rejects_null() {
        assert!(Sel::from_ptr(std::ptr::null_mut()).is_none());
    }

    #[test]
    fn test_struct_pointer() {
        assert_eq!(check_struct_pointer(std::ptr::null::<u64>()), Err(HandleFault::Null));
        let value = 0u64;
        assert!(check_struct_pointer(&value as *const u64).is_ok());
    }
}
