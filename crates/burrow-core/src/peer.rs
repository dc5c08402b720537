//! Peer addresses and contacts
//!
//! A [`PeerAddress`] is the opaque transport address of a remote peer. A
//! [`Contact`] pairs a peer's keyspace identity with its resolved address;
//! the key is always derived by hashing the address, and equality and
//! ordering are by key alone.

use crate::{BinaryKey, Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// An opaque, non-empty transport address.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Create a new PeerAddress. Empty addresses are invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        if address.is_empty() {
            return Err(Error::InvalidAddress("empty address".to_string()));
        }
        Ok(Self(address))
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddress({})", self.0)
    }
}

impl FromStr for PeerAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A peer identity: a binary key plus the transport address it was
/// derived from.
#[derive(Clone)]
pub struct Contact {
    key: BinaryKey,
    address: PeerAddress,
}

impl Contact {
    /// Derives a contact from a transport address, hashing the address
    /// to `bits` bits.
    pub fn from_address(address: PeerAddress, bits: usize) -> Result<Self> {
        let key = BinaryKey::hash_bytes(address.as_str().as_bytes(), bits)?;
        Ok(Self { key, address })
    }

    /// Pairs an explicit key with an address. Used where the key is not
    /// the hash of the address (synthetic identities in tests, scratch
    /// table owners).
    pub fn new(key: BinaryKey, address: PeerAddress) -> Self {
        Self { key, address }
    }

    pub fn key(&self) -> &BinaryKey {
        &self.key
    }

    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    /// XOR distance between this contact's key and another's.
    pub fn distance(&self, other: &Contact) -> Result<BinaryKey> {
        self.key.distance(&other.key)
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Contact {}

impl Ord for Contact {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for Contact {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Contact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contact({} @ {})", self.key.to_hex(), self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_address_rejected() {
        assert!(PeerAddress::new("").is_err());
        assert!("".parse::<PeerAddress>().is_err());
    }

    #[test]
    fn contact_key_is_address_hash() {
        let address = PeerAddress::new("peer-one").unwrap();
        let contact = Contact::from_address(address.clone(), 128).unwrap();
        let expected = BinaryKey::hash_bytes(b"peer-one", 128).unwrap();
        assert_eq!(contact.key(), &expected);
        assert_eq!(contact.address(), &address);
    }

    #[test]
    fn contact_distance_is_symmetric() {
        let a = Contact::from_address(PeerAddress::new("peer-a").unwrap(), 64).unwrap();
        let b = Contact::from_address(PeerAddress::new("peer-b").unwrap(), 64).unwrap();
        assert_eq!(a.distance(&b).unwrap(), b.distance(&a).unwrap());
        assert!(a.distance(&a).unwrap().is_zero());
    }

    #[test]
    fn contact_equality_is_by_key() {
        let key = BinaryKey::hash_bytes(b"same", 64).unwrap();
        let a = Contact::new(key.clone(), PeerAddress::new("addr-a").unwrap());
        let b = Contact::new(key, PeerAddress::new("addr-b").unwrap());
        assert_eq!(a, b);
    }
}
