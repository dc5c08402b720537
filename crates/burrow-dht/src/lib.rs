//! Burrow DHT - Kademlia routing and lookup engine
//!
//! This crate provides the routing and lookup core of the Burrow network:
//! a bucketed routing table organising known peers by XOR distance from a
//! local owner, a wire-level request/answer action protocol, and a family
//! of per-operation state machines driving iterative lookups, direct
//! exchanges and replicated storage over any discrete-message transport.
//!
//! The engine is single-threaded and reactive: state advances only when
//! the host delivers an inbound action or enqueues a new operation. There
//! are no internal timers; hosts that need timeouts must cancel stalled
//! operations through the request manager.

pub mod action;
pub mod bucket;
pub mod builder;
pub mod pending;
pub mod propagate;
pub mod provider;
pub mod responder;
pub mod routing;
pub mod store;

use thiserror::Error;

pub use action::{Action, ActionType, OperationId, Payload};
pub use builder::ActionBuilder;
pub use bucket::KBucket;
pub use pending::{
    OutcomeCallback, PendingRequest, PendingRequestManager, RequestOutcome, RequestState,
};
pub use propagate::{ActionPropagator, QueuedPropagator};
pub use provider::{NodeDataProvider, TableProvider};
pub use responder::ActionResponder;
pub use routing::RoutingTable;
pub use store::{MemoryStore, ResourceStore};

#[derive(Error, Debug)]
pub enum DhtError {
    #[error(transparent)]
    Key(#[from] burrow_core::Error),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("action is not an answer")]
    NotAnAnswer,

    #[error("capacity {requested} exceeds the operation id space of {max}")]
    CapacityExceeded { requested: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, DhtError>;

/// Default key width for node and resource identifiers, in bits.
pub const DEFAULT_KEY_BITS: usize = 128;

/// A shorter key width option.
pub const SHORT_KEY_BITS: usize = 64;

/// Default number of nodes contacted per lookup round, and the number of
/// peers a contacted node sends back.
pub const DEFAULT_K: usize = 20;

/// A smaller lookup constant.
pub const SMALL_K: usize = 5;

/// Operation ids live in `[0, MAX_ID)`.
pub const MAX_ID: OperationId = 256;

/// Tunables for one DHT session
#[derive(Debug, Clone)]
pub struct DhtConfig {
    /// Key width in bits (also the number of routing table buckets)
    pub key_bits: usize,
    /// Lookup parallelism and answer fan-out
    pub k: usize,
    /// Maximum number of concurrently pending operations
    pub capacity: usize,
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            k: DEFAULT_K,
            capacity: MAX_ID as usize,
        }
    }
}
