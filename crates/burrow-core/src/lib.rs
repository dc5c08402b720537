//! Burrow Core - Shared types and the transport boundary
//!
//! This crate provides the fundamental building blocks for the Burrow
//! distributed hash table: binary keys with XOR-metric distance, peer
//! identities, resources, and the discrete-message transport abstraction.

pub mod error;
pub mod key;
pub mod peer;
pub mod resource;
pub mod transport;

pub use error::{Error, Result};
pub use key::BinaryKey;
pub use peer::{Contact, PeerAddress};
pub use resource::Resource;
pub use transport::{ReceivedMessage, Transport};

/// Upper bound for cryptographic key widths, in bits (SHA-1 digest size).
pub const MAX_HASH_BITS: usize = 160;
