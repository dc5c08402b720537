//! STORE: locate the node closest to the resource's key, then hand the
//! resource over
//!
//! Phase one is the same convergence loop as FIND_NODE, carried by STORE
//! requests with a node-id payload and answered with peer redirects.
//! Phase two sends one final STORE with the serialized resource to the
//! converged owner and waits for its boolean acknowledgement.

use super::lookup::IterativeLookup;
use super::{OutcomeCallback, PendingRequest, RequestContext, RequestOutcome, RequestState};
use crate::action::{Action, ActionType, OperationId, Payload};
use burrow_core::{BinaryKey, Contact, Resource};
use tracing::warn;

enum Phase {
    /// Iterative search for the closest node
    Search,
    /// Resource handed to `owner`, awaiting its acknowledgement
    Deliver { owner: Contact },
}

pub struct StoreRequest {
    operation_id: OperationId,
    state: RequestState,
    steps: usize,
    resource: Resource,
    lookup: IterativeLookup,
    phase: Phase,
    on_complete: Option<OutcomeCallback>,
}

impl StoreRequest {
    pub fn new(
        operation_id: OperationId,
        resource: Resource,
        target: BinaryKey,
        k: usize,
        key_bits: usize,
        on_complete: OutcomeCallback,
    ) -> Self {
        Self {
            operation_id,
            state: RequestState::Idle,
            steps: 0,
            resource,
            lookup: IterativeLookup::new(target, k, key_bits),
            phase: Phase::Search,
            on_complete: Some(on_complete),
        }
    }

    fn build_lookups(&self, contacts: &[Contact], ctx: &mut RequestContext<'_>) -> Vec<Action> {
        contacts
            .iter()
            .filter_map(|contact| {
                match ctx.builder.store_lookup(
                    self.operation_id,
                    contact.address(),
                    self.lookup.target(),
                ) {
                    Ok(action) => Some(action),
                    Err(error) => {
                        warn!(%error, "skipping store lookup request");
                        None
                    }
                }
            })
            .collect()
    }

    fn evaluate_search(&mut self, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if !self.lookup.round_complete() {
            return Vec::new();
        }
        if self.lookup.has_candidates() {
            let contacts = self.lookup.next_round(ctx);
            if !contacts.is_empty() {
                return self.build_lookups(&contacts, ctx);
            }
        }
        // Search converged: deliver to the closest node found, or give
        // up when nobody was reachable.
        match self.lookup.best_visited().cloned() {
            Some(owner) => {
                match ctx
                    .builder
                    .store(self.operation_id, owner.address(), &self.resource)
                {
                    Ok(action) => {
                        self.phase = Phase::Deliver { owner };
                        vec![action]
                    }
                    Err(error) => {
                        warn!(%error, "could not build final store request");
                        self.complete(None);
                        Vec::new()
                    }
                }
            }
            None => {
                self.complete(None);
                Vec::new()
            }
        }
    }

    fn complete(&mut self, new_owner: Option<Contact>) {
        self.state = RequestState::Completed;
        if let Some(mut callback) = self.on_complete.take() {
            callback(
                self.operation_id,
                RequestOutcome::Store {
                    resource: self.resource.clone(),
                    new_owner,
                },
            );
        }
    }
}

impl PendingRequest for StoreRequest {
    fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    fn state(&self) -> RequestState {
        self.state
    }

    fn steps_taken(&self) -> usize {
        self.steps
    }

    fn start(&mut self, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if self.state != RequestState::Idle {
            return Vec::new();
        }
        self.state = RequestState::PendingResponses;
        let contacts = self.lookup.first_round(ctx);
        let mut actions = self.build_lookups(&contacts, ctx);
        actions.extend(self.evaluate_search(ctx));
        actions
    }

    fn is_pertinent(&self, action: &Action) -> bool {
        if self.state != RequestState::PendingResponses
            || action.action_type() != ActionType::StoreAnswer
            || action.operation_id() != self.operation_id
        {
            return false;
        }
        match &self.phase {
            Phase::Search => true,
            // The delivery is a single-target exchange: only the chosen
            // owner may answer it.
            Phase::Deliver { owner } => action.peer() == owner.address(),
        }
    }

    fn next_step(&mut self, action: &Action, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if !self.is_pertinent(action) {
            return Vec::new();
        }
        match &self.phase {
            Phase::Search => {
                self.lookup.absorb(action, ctx);
                let actions = self.evaluate_search(ctx);
                self.steps += 1;
                actions
            }
            Phase::Deliver { owner } => {
                let owner = owner.clone();
                if let Payload::Boolean(success) = action.payload() {
                    let new_owner = if *success { Some(owner) } else { None };
                    self.complete(new_owner);
                }
                self.steps += 1;
                Vec::new()
            }
        }
    }
}
