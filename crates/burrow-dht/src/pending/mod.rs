//! Per-operation state machines for in-flight network operations
//!
//! A [`PendingRequest`] tracks one logical operation from the first
//! propagated action to its result. Requests never touch the transport
//! themselves: `start` and `next_step` return the actions to send, and
//! the [`PendingRequestManager`] forwards them to its propagator.
//!
//! A request only ever advances on a *pertinent* action: the expected
//! answer type, for its own operation id, while it is waiting for
//! responses (and, for single-target operations, from the peer that was
//! contacted). Everything else is silently ignored; late and duplicate
//! answers are normal traffic, not errors.

mod find_node;
mod find_value;
mod invite;
mod lookup;
mod manager;
mod ping;
mod store;

pub use find_node::FindNodeRequest;
pub use find_value::FindValueRequest;
pub use invite::InviteRequest;
pub use manager::PendingRequestManager;
pub use ping::PingRequest;
pub use store::StoreRequest;

use crate::action::{Action, OperationId};
use crate::builder::ActionBuilder;
use crate::provider::NodeDataProvider;
use burrow_core::{BinaryKey, Contact, Resource};

/// Operative state of a [`PendingRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Created but not yet started
    Idle,
    /// Waiting for the result of another request
    PendingSubrequest,
    /// Waiting for answers directed to itself; the only state in which
    /// an action can be pertinent
    PendingResponses,
    /// Finished; terminal
    Completed,
}

/// The result a completed request reports through its callback
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Ping {
        peer: Contact,
        reachable: bool,
    },
    Invite {
        peer: Contact,
        accepted: bool,
    },
    FindNode {
        target: BinaryKey,
        closest: Contact,
    },
    FindValue {
        target: BinaryKey,
        found: Option<(Contact, Resource)>,
    },
    Store {
        resource: Resource,
        new_owner: Option<Contact>,
    },
}

/// Completion callback, invoked exactly once per request
pub type OutcomeCallback = Box<dyn FnMut(OperationId, RequestOutcome)>;

/// Collaborators a request borrows while taking a step
pub struct RequestContext<'a> {
    pub builder: &'a ActionBuilder,
    pub provider: &'a mut dyn NodeDataProvider,
}

pub trait PendingRequest {
    /// The unique id correlating this request with its answers
    fn operation_id(&self) -> OperationId;

    fn state(&self) -> RequestState;

    /// Number of actions accepted by `next_step`; rejected actions never
    /// advance this counter.
    fn steps_taken(&self) -> usize;

    /// Build the first action(s). Valid only from [`RequestState::Idle`];
    /// a no-op afterwards.
    fn start(&mut self, ctx: &mut RequestContext<'_>) -> Vec<Action>;

    /// Whether `action` can be used to continue this operation
    fn is_pertinent(&self, action: &Action) -> bool;

    /// Take one step. Ignores non-pertinent actions; once completed, all
    /// further calls are no-ops.
    fn next_step(&mut self, action: &Action, ctx: &mut RequestContext<'_>) -> Vec<Action>;
}
