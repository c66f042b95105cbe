//! Class records and the class registry of the headless runtime.
//!
//! A class record starts with an `isa` word pointing at itself, so a class
//! handle passes the same type-descriptor check as an instance. Allocated
//! pairs stay invisible to name lookup until registered, but still reserve
//! their name.

use std::ffi::{CStr, CString};

use fxhash::FxHashMap;

use super::behavior::Native;
use crate::encoding::CallShape;
use crate::runtime::Imp;

/// What runs when a method is invoked.
#[derive(Clone, Copy)]
pub(super) enum MethodBody {
    /// Built-in toolkit behaviour.
    Native(Native),
    /// A relay added through `add_method`.
    Relay(Imp),
}

impl MethodBody {
    pub(super) fn shape(self) -> CallShape {
        match self {
            MethodBody::Native(native) => native.shape(),
            MethodBody::Relay(_) => CallShape::HandleToVoid,
        }
    }
}

#[repr(C)]
pub(super) struct ClassRecord {
    // Only ever read through the raw handle
    #[allow(dead_code)]
    isa: *const ClassRecord,
    pub(super) name: CString,
    pub(super) superclass: Option<usize>,
    instance_methods: FxHashMap<usize, MethodBody>,
    class_methods: FxHashMap<usize, MethodBody>,
    registered: bool,
}

impl ClassRecord {
    fn boxed(name: &CStr, superclass: Option<usize>) -> Box<Self> {
        let mut record = Box::new(ClassRecord {
            isa: std::ptr::null(),
            name: name.to_owned(),
            superclass,
            instance_methods: FxHashMap::default(),
            class_methods: FxHashMap::default(),
            registered: false,
        });
        record.isa = std::ptr::from_ref(&*record);
        record
    }

    pub(super) fn addr(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }
}

#[derive(Default)]
pub(super) struct ClassTable {
    classes: FxHashMap<usize, Box<ClassRecord>>,
    by_name: FxHashMap<CString, usize>,
    registrations: FxHashMap<CString, usize>,
}

impl ClassTable {
    /// Defines and registers a bootstrap class.
    pub(super) fn define(&mut self, name: &CStr, superclass: Option<usize>) -> usize {
        let record = ClassRecord::boxed(name, superclass);
        let addr = record.addr();
        self.by_name.insert(name.to_owned(), addr);
        self.classes.insert(addr, record);
        self.register(addr);
        addr
    }

    /// Allocates an unregistered class pair.
    pub(super) fn allocate(&mut self, superclass: usize, name: &CStr) -> Option<usize> {
        if self.by_name.contains_key(name) || !self.classes.contains_key(&superclass) {
            return None;
        }
        let record = ClassRecord::boxed(name, Some(superclass));
        let addr = record.addr();
        self.by_name.insert(name.to_owned(), addr);
        self.classes.insert(addr, record);
        Some(addr)
    }

    pub(super) fn register(&mut self, addr: usize) -> bool {
        let Some(record) = self.classes.get_mut(&addr) else {
            return false;
        };
        if record.registered {
            return false;
        }
        record.registered = true;
        *self.registrations.entry(record.name.clone()).or_default() += 1;
        true
    }

    pub(super) fn dispose(&mut self, addr: usize) -> bool {
        match self.classes.get(&addr) {
            Some(record) if !record.registered => {}
            _ => return false,
        }
        if let Some(record) = self.classes.remove(&addr) {
            self.by_name.remove(&record.name);
        }
        true
    }

    /// Finds a registered class by name.
    pub(super) fn named(&self, name: &CStr) -> Option<usize> {
        let addr = *self.by_name.get(name)?;
        self.classes
            .get(&addr)
            .filter(|record| record.registered)
            .map(|record| record.addr())
    }

    pub(super) fn contains(&self, addr: usize) -> bool {
        self.classes.contains_key(&addr)
    }

    pub(super) fn registrations(&self, name: &CStr) -> usize {
        self.registrations.get(name).copied().unwrap_or(0)
    }

    /// Adds a method to the class's own table. Returns false if one already
    /// exists for `sel`.
    pub(super) fn add_method(
        &mut self,
        addr: usize,
        sel: usize,
        body: MethodBody,
        class_side: bool,
    ) -> bool {
        let Some(record) = self.classes.get_mut(&addr) else {
            return false;
        };
        let table = if class_side {
            &mut record.class_methods
        } else {
            &mut record.instance_methods
        };
        if table.contains_key(&sel) {
            return false;
        }
        table.insert(sel, body);
        true
    }

    /// Looks `sel` up along the superclass chain.
    pub(super) fn resolve(&self, addr: usize, sel: usize, class_side: bool) -> Option<MethodBody> {
        let mut current = Some(addr);
        while let Some(addr) = current {
            let record = self.classes.get(&addr)?;
            let table = if class_side {
                &record.class_methods
            } else {
                &record.instance_methods
            };
            if let Some(body) = table.get(&sel) {
                return Some(*body);
            }
            current = record.superclass;
        }
        None
    }
}
