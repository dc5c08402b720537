//! Local resource storage boundary
//!
//! Resources held by this node, keyed by the hash of their name. The
//! persistence mechanism is out of scope; the in-memory map is the base
//! implementation.

use burrow_core::{BinaryKey, Resource};
use std::collections::HashMap;

pub trait ResourceStore {
    /// Look up a resource by its key
    fn get(&self, key: &BinaryKey) -> Option<&Resource>;

    /// Insert or replace the resource at `key`
    fn insert(&mut self, key: BinaryKey, resource: Resource);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory resource store
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<BinaryKey, Resource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceStore for MemoryStore {
    fn get(&self, key: &BinaryKey) -> Option<&Resource> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: BinaryKey, resource: Resource) {
        self.entries.insert(key, resource);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
