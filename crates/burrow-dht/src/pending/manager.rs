//! Registry of in-flight operations
//!
//! The manager allocates operation ids, starts new requests, routes
//! inbound answers to the pertinent request and forwards every outbound
//! action to its propagator. It never answers incoming requests; that is
//! the responder's job.

use super::{
    FindNodeRequest, FindValueRequest, InviteRequest, OutcomeCallback, PendingRequest,
    PingRequest, RequestContext, RequestState, StoreRequest,
};
use crate::action::{Action, OperationId};
use crate::builder::ActionBuilder;
use crate::propagate::ActionPropagator;
use crate::provider::NodeDataProvider;
use crate::{DhtConfig, DhtError, Result, MAX_ID};
use burrow_core::{BinaryKey, PeerAddress, Resource};
use tracing::warn;

pub struct PendingRequestManager<P, D> {
    config: DhtConfig,
    builder: ActionBuilder,
    propagator: P,
    provider: D,
    requests: Vec<Box<dyn PendingRequest>>,
}

impl<P: ActionPropagator, D: NodeDataProvider> PendingRequestManager<P, D> {
    /// Fails when the configured capacity exceeds the operation id space
    pub fn new(config: DhtConfig, propagator: P, provider: D) -> Result<Self> {
        if config.capacity > MAX_ID as usize {
            return Err(DhtError::CapacityExceeded {
                requested: config.capacity,
                max: MAX_ID as usize,
            });
        }
        Ok(Self {
            config,
            builder: ActionBuilder::new(),
            propagator,
            provider,
            requests: Vec::new(),
        })
    }

    pub fn config(&self) -> &DhtConfig {
        &self.config
    }

    pub fn provider(&self) -> &D {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut D {
        &mut self.provider
    }

    pub fn propagator_mut(&mut self) -> &mut P {
        &mut self.propagator
    }

    /// Number of currently registered requests
    pub fn active_len(&self) -> usize {
        self.requests.len()
    }

    /// Borrow a registered request by id
    pub fn request(&self, id: OperationId) -> Option<&dyn PendingRequest> {
        self.requests
            .iter()
            .find(|r| r.operation_id() == id)
            .map(|r| r.as_ref())
    }

    /// Ids of requests that have reached their terminal state and can be
    /// dequeued by the host
    pub fn completed_ids(&self) -> Vec<OperationId> {
        self.requests
            .iter()
            .filter(|r| r.state() == RequestState::Completed)
            .map(|r| r.operation_id())
            .collect()
    }

    /// Lowest unassigned id in `[0, capacity)`, if any
    fn free_id(&self) -> Option<OperationId> {
        if self.requests.len() >= self.config.capacity {
            return None;
        }
        (0..self.config.capacity as OperationId)
            .find(|id| self.requests.iter().all(|r| r.operation_id() != *id))
    }

    /// Register a request and propagate its opening actions
    fn launch(&mut self, mut request: Box<dyn PendingRequest>) -> OperationId {
        let id = request.operation_id();
        let mut ctx = RequestContext {
            builder: &self.builder,
            provider: &mut self.provider,
        };
        let outbound = request.start(&mut ctx);
        self.propagator.propagate_all(outbound);
        self.requests.push(request);
        id
    }

    /// Returns the allocated operation id, or `None` when every id is
    /// taken.
    pub fn enqueue_ping(
        &mut self,
        peer: &PeerAddress,
        on_complete: OutcomeCallback,
    ) -> Option<OperationId> {
        let id = self.free_id()?;
        Some(self.launch(Box::new(PingRequest::new(
            id,
            peer.clone(),
            self.config.key_bits,
            on_complete,
        ))))
    }

    pub fn enqueue_invite(
        &mut self,
        peer: &PeerAddress,
        on_complete: OutcomeCallback,
    ) -> Option<OperationId> {
        let id = self.free_id()?;
        Some(self.launch(Box::new(InviteRequest::new(
            id,
            peer.clone(),
            self.config.key_bits,
            on_complete,
        ))))
    }

    pub fn enqueue_find_node(
        &mut self,
        target: BinaryKey,
        on_complete: OutcomeCallback,
    ) -> Option<OperationId> {
        let id = self.free_id()?;
        Some(self.launch(Box::new(FindNodeRequest::new(
            id,
            target,
            self.config.k,
            self.config.key_bits,
            on_complete,
        ))))
    }

    pub fn enqueue_find_value(
        &mut self,
        target: BinaryKey,
        on_complete: OutcomeCallback,
    ) -> Option<OperationId> {
        let id = self.free_id()?;
        Some(self.launch(Box::new(FindValueRequest::new(
            id,
            target,
            self.config.k,
            self.config.key_bits,
            on_complete,
        ))))
    }

    pub fn enqueue_store(
        &mut self,
        resource: Resource,
        on_complete: OutcomeCallback,
    ) -> Option<OperationId> {
        let id = self.free_id()?;
        let target = match resource.key(self.config.key_bits) {
            Ok(target) => target,
            Err(error) => {
                warn!(%error, "cannot derive a key for the resource");
                return None;
            }
        };
        Some(self.launch(Box::new(StoreRequest::new(
            id,
            resource,
            target,
            self.config.k,
            self.config.key_bits,
            on_complete,
        ))))
    }

    /// Route an inbound answer to the first pertinent request.
    ///
    /// Passing a request-category action here is a caller error and is
    /// surfaced as such; an answer no request claims is normal traffic
    /// and reports `false`.
    pub fn continue_request(&mut self, action: &Action) -> Result<bool> {
        if !action.action_type().is_answer() {
            return Err(DhtError::NotAnAnswer);
        }
        let position = self
            .requests
            .iter()
            .position(|r| r.is_pertinent(action));
        let Some(position) = position else {
            return Ok(false);
        };
        let mut ctx = RequestContext {
            builder: &self.builder,
            provider: &mut self.provider,
        };
        let outbound = self.requests[position].next_step(action, &mut ctx);
        self.propagator.propagate_all(outbound);
        Ok(true)
    }

    /// Remove and return the request with the given id, freeing the id
    /// for immediate reuse
    pub fn dequeue(&mut self, id: OperationId) -> Option<Box<dyn PendingRequest>> {
        let position = self.requests.iter().position(|r| r.operation_id() == id)?;
        Some(self.requests.remove(position))
    }
}
