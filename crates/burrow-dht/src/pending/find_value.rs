//! FIND_VALUE: iterative lookup that stops as soon as a node answers
//! with the resource itself

use super::lookup::IterativeLookup;
use super::{OutcomeCallback, PendingRequest, RequestContext, RequestOutcome, RequestState};
use crate::action::{Action, ActionType, OperationId, Payload};
use burrow_core::{BinaryKey, Contact};
use tracing::warn;

pub struct FindValueRequest {
    operation_id: OperationId,
    state: RequestState,
    steps: usize,
    lookup: IterativeLookup,
    on_complete: Option<OutcomeCallback>,
}

impl FindValueRequest {
    pub fn new(
        operation_id: OperationId,
        target: BinaryKey,
        k: usize,
        key_bits: usize,
        on_complete: OutcomeCallback,
    ) -> Self {
        Self {
            operation_id,
            state: RequestState::Idle,
            steps: 0,
            lookup: IterativeLookup::new(target, k, key_bits),
            on_complete: Some(on_complete),
        }
    }

    fn build_requests(&self, contacts: &[Contact], ctx: &mut RequestContext<'_>) -> Vec<Action> {
        contacts
            .iter()
            .filter_map(|contact| {
                match ctx
                    .builder
                    .find_value(self.operation_id, contact.address(), self.lookup.target())
                {
                    Ok(action) => Some(action),
                    Err(error) => {
                        warn!(%error, "skipping find-value request");
                        None
                    }
                }
            })
            .collect()
    }

    fn evaluate(&mut self, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if !self.lookup.round_complete() {
            return Vec::new();
        }
        if self.lookup.has_candidates() {
            let contacts = self.lookup.next_round(ctx);
            if !contacts.is_empty() {
                return self.build_requests(&contacts, ctx);
            }
        }
        // Converged without meeting the value: the resource is not in
        // the network.
        self.complete(None);
        Vec::new()
    }

    fn complete(&mut self, found: Option<(Contact, burrow_core::Resource)>) {
        self.state = RequestState::Completed;
        if let Some(mut callback) = self.on_complete.take() {
            callback(
                self.operation_id,
                RequestOutcome::FindValue {
                    target: self.lookup.target().clone(),
                    found,
                },
            );
        }
    }
}

impl PendingRequest for FindValueRequest {
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
        let mut actions = self.build_requests(&contacts, ctx);
        actions.extend(self.evaluate(ctx));
        actions
    }

    fn is_pertinent(&self, action: &Action) -> bool {
        self.state == RequestState::PendingResponses
            && action.action_type() == ActionType::FindValueAnswer
            && action.operation_id() == self.operation_id
    }

    fn next_step(&mut self, action: &Action, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if !self.is_pertinent(action) {
            return Vec::new();
        }
        // A node holding the value short-circuits the whole lookup.
        if let Payload::Resource(resource) = action.payload() {
            let owner = match Contact::from_address(action.peer().clone(), self.lookup.key_bits())
            {
                Ok(owner) => {
                    ctx.provider.visit(&owner);
                    Some((owner, resource.clone()))
                }
                Err(error) => {
                    warn!(%error, "value answer from unhashable peer");
                    None
                }
            };
            self.complete(owner);
            self.steps += 1;
            return Vec::new();
        }
        self.lookup.absorb(action, ctx);
        let actions = self.evaluate(ctx);
        self.steps += 1;
        actions
    }
}
