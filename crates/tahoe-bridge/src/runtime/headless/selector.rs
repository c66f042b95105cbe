//! Selector interning for the headless runtime.
//!
//! Each distinct name gets one boxed record; the record's address is the
//! [`Sel`], so selectors compare by pointer like the real runtime's.

use std::ffi::{CStr, CString, c_void};

use fxhash::FxHashMap;

use crate::handle::Sel;

struct SelectorRecord {
    name: CString,
}

#[derive(Default)]
pub(super) struct SelectorTable {
    by_name: FxHashMap<CString, Box<SelectorRecord>>,
    by_addr: FxHashMap<usize, CString>,
}

impl SelectorTable {
    /// Returns the selector for `name`, interning it on first use. Empty
    /// names are refused.
    pub(super) fn intern(&mut self, name: &CStr) -> Option<Sel> {
        if name.is_empty() {
            return None;
        }
        if let Some(record) = self.by_name.get(name) {
            return Sel::from_ptr(record_ptr(record));
        }

        let record = Box::new(SelectorRecord {
            name: name.to_owned(),
        });
        let ptr = record_ptr(&record);
        self.by_addr.insert(ptr as usize, record.name.clone());
        self.by_name.insert(name.to_owned(), record);
        Sel::from_ptr(ptr)
    }

    pub(super) fn name(&self, sel: Sel) -> Option<&CStr> {
        self.by_addr.get(&(sel.as_ptr() as usize)).map(CString::as_c_str)
    }
}

fn record_ptr(record: &SelectorRecord) -> *mut c_void {
    std::ptr::from_ref(record).cast_mut().cast()
}
