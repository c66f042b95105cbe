//! Instances of the headless runtime.
//!
//! Objects live for as long as the world that created them; the headless
//! runtime has no retain/release, matching the bridge's assumption that the
//! caller owns object lifetimes. Notifications the world posts itself are
//! the exception and are removed once delivered.

use fxhash::FxHashMap;

use crate::geometry::Geometry;
use crate::handle::{Id, Sel};

/// Per-class instance state.
#[derive(Debug, Clone)]
pub(super) enum Payload {
    Plain,
    Text(Vec<u8>),
    Number(u64),
    Timer {
        interval: f64,
        target: Id,
        action: Sel,
        user_info: Id,
        repeats: bool,
        valid: bool,
    },
    View {
        frame: Geometry,
        hidden: bool,
    },
    Window {
        frame: Geometry,
        style_mask: u64,
        content_view: Id,
        delegate: Id,
        title: Id,
        visible: bool,
    },
    Notification {
        object: Id,
    },
}

/// An instance: the class address first, like a real `isa`, then state.
#[repr(C)]
pub(super) struct ObjectRecord {
    isa: usize,
    pub(super) payload: Payload,
}

impl ObjectRecord {
    pub(super) fn class(&self) -> usize {
        self.isa
    }
}

#[derive(Default)]
pub(super) struct ObjectTable {
    objects: FxHashMap<usize, Box<ObjectRecord>>,
    associations: FxHashMap<(usize, usize), usize>,
}

impl ObjectTable {
    pub(super) fn create(&mut self, class: usize, payload: Payload) -> Id {
        let record = Box::new(ObjectRecord { isa: class, payload });
        let addr = std::ptr::from_ref(&*record) as usize;
        self.objects.insert(addr, record);
        Id::from_addr(addr)
    }

    pub(super) fn get(&self, id: Id) -> Option<&ObjectRecord> {
        self.objects.get(&id.addr()).map(|record| &**record)
    }

    pub(super) fn get_mut(&mut self, id: Id) -> Option<&mut ObjectRecord> {
        self.objects.get_mut(&id.addr()).map(|record| &mut **record)
    }

    pub(super) fn contains(&self, id: Id) -> bool {
        self.objects.contains_key(&id.addr())
    }

    pub(super) fn len(&self) -> usize {
        self.objects.len()
    }

    /// Drops an object and every association it carries.
    pub(super) fn remove(&mut self, id: Id) -> bool {
        let addr = id.addr();
        self.associations.retain(|&(object, _), _| object != addr);
        self.objects.remove(&addr).is_some()
    }

    /// Stores a weak association. Zero removes it.
    pub(super) fn set_association(&mut self, object: usize, key: usize, value: usize) {
        if value == 0 {
            self.associations.remove(&(object, key));
        } else {
            self.associations.insert((object, key), value);
        }
    }

    pub(super) fn association(&self, object: usize, key: usize) -> usize {
        self.associations.get(&(object, key)).copied().unwrap_or(0)
    }
}
