use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use log::debug;

use crate::entity::Instance;
use crate::schema::KeyValue;

/// Per-entity-type identity map: key tuple → the single live instance.
///
/// Entries are weak. The map never keeps an otherwise-unreferenced instance
/// alive; dead entries are pruned on lookup and during sweeps.
pub struct IdentityMap {
    entries: Mutex<HashMap<KeyValue, Weak<Instance>>>,
}

impl IdentityMap {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// O(1) retrieval of the canonical instance for `key`, if resident.
    pub fn lookup(&self, key: &KeyValue) -> Option<Arc<Instance>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key).map(Weak::upgrade) {
            Some(Some(instance)) => Some(instance),
            Some(None) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Check-and-insert on construction: an existing live entry wins and the
    /// freshly built instance is discarded by the caller.
    pub(crate) fn canonicalize(&self, key: KeyValue, instance: Arc<Instance>) -> Arc<Instance> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        entries.insert(key, Arc::downgrade(&instance));
        instance
    }

    /// Register an instance under a key assigned by the store (surrogate
    /// insert). A live entry for that key is a programming error.
    ///
    /// # Panics
    ///
    /// Panics if the key already maps to a live instance.
    pub(crate) fn register(&self, key: KeyValue, instance: &Arc<Instance>) {
        let mut entries = self.entries.lock().unwrap();
        if entries.get(&key).and_then(Weak::upgrade).is_some() {
            panic!(
                "identity map of '{}' already holds an instance for key {}",
                instance.entity_type().name(),
                key
            );
        }
        debug!("{}: cached under generated key {}", instance.entity_type().name(), key);
        entries.insert(key, Arc::downgrade(instance));
    }

    /// Drop entries whose instance has been collected.
    pub fn sweep(&self) {
        self.entries
            .lock()
            .unwrap()
            .retain(|_, weak| weak.strong_count() > 0);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.sweep();
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
