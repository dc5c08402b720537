//! PING: one request, one answer, peer is reachable

use super::{OutcomeCallback, PendingRequest, RequestContext, RequestOutcome, RequestState};
use crate::action::{Action, ActionType, OperationId};
use burrow_core::{Contact, PeerAddress};
use tracing::warn;

pub struct PingRequest {
    operation_id: OperationId,
    state: RequestState,
    steps: usize,
    peer: PeerAddress,
    key_bits: usize,
    on_complete: Option<OutcomeCallback>,
}

impl PingRequest {
    pub fn new(
        operation_id: OperationId,
        peer: PeerAddress,
        key_bits: usize,
        on_complete: OutcomeCallback,
    ) -> Self {
        Self {
            operation_id,
            state: RequestState::Idle,
            steps: 0,
            peer,
            key_bits,
            on_complete: Some(on_complete),
        }
    }
}

impl PendingRequest for PingRequest {
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
        match ctx.builder.ping(self.operation_id, &self.peer) {
            Ok(action) => vec![action],
            Err(error) => {
                warn!(%error, "could not build ping request");
                Vec::new()
            }
        }
    }

    fn is_pertinent(&self, action: &Action) -> bool {
        self.state == RequestState::PendingResponses
            && action.action_type() == ActionType::PingAnswer
            && action.operation_id() == self.operation_id
            && action.peer() == &self.peer
    }

    fn next_step(&mut self, action: &Action, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if !self.is_pertinent(action) {
            return Vec::new();
        }
        let pinged = match Contact::from_address(action.peer().clone(), self.key_bits) {
            Ok(contact) => contact,
            Err(error) => {
                warn!(%error, "dropping ping answer from unhashable peer");
                return Vec::new();
            }
        };
        ctx.provider.visit(&pinged);
        self.state = RequestState::Completed;
        if let Some(mut callback) = self.on_complete.take() {
            callback(
                self.operation_id,
                RequestOutcome::Ping {
                    peer: pinged,
                    reachable: true,
                },
            );
        }
        self.steps += 1;
        Vec::new()
    }
}
