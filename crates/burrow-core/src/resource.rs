//! Named resources stored in the network
//!
//! A resource is a name/value pair. Its position in the keyspace is the
//! hash of its name, so two resources with the same name occupy the same
//! slot regardless of value.

use crate::{BinaryKey, Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    name: String,
    value: String,
}

impl Resource {
    /// Create a resource. The name must be non-empty.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidResource("empty name".to_string()));
        }
        Ok(Self {
            name,
            value: value.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The resource's key in a `bits`-wide keyspace: the hash of its name.
    pub fn key(&self, bits: usize) -> Result<BinaryKey> {
        BinaryKey::hash_bytes(self.name.as_bytes(), bits)
    }
}
