//! Host functions the target may call back into while a call is in flight.

use std::collections::HashMap;
use std::rc::Rc;

use target_abi::{CallbackId, Value};

use crate::context::Bridge;
use crate::error::BridgeResult;

/// A host function reachable through a [`CallbackId`].
pub type HostFn = Rc<dyn Fn(&Bridge, &[Value]) -> BridgeResult<Value>>;

/// Entries live until removed; releasing the proxy that holds an id does not
/// drop it (see [`ProxyInstance::release_with_callbacks`](crate::ProxyInstance::release_with_callbacks)).
#[derive(Default)]
pub struct CallbackTable {
    entries: HashMap<CallbackId, HostFn>,
    next_id: u32,
}

impl CallbackTable {
    /// Ids count up from 1; after wrapping, ids still in use are skipped.
    pub fn insert(&mut self, f: HostFn) -> CallbackId {
        let id = loop {
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            let id = CallbackId::new(self.next_id);
            if !self.entries.contains_key(&id) {
                break id;
            }
        };
        self.entries.insert(id, f);
        id
    }

    pub fn remove(&mut self, id: CallbackId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Returns a clone of the entry so the caller can run it with no borrow held.
    pub fn get(&self, id: CallbackId) -> Option<HostFn> {
        self.entries.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
