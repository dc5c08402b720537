//! INVITE: one request, one boolean answer, accept or reject

use super::{OutcomeCallback, PendingRequest, RequestContext, RequestOutcome, RequestState};
use crate::action::{Action, ActionType, OperationId, Payload};
use burrow_core::{Contact, PeerAddress};
use tracing::warn;

pub struct InviteRequest {
    operation_id: OperationId,
    state: RequestState,
    steps: usize,
    peer: PeerAddress,
    key_bits: usize,
    on_complete: Option<OutcomeCallback>,
}

impl InviteRequest {
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

impl PendingRequest for InviteRequest {
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
        match ctx.builder.invite(self.operation_id, &self.peer) {
            Ok(action) => vec![action],
            Err(error) => {
                warn!(%error, "could not build invite request");
                Vec::new()
            }
        }
    }

    fn is_pertinent(&self, action: &Action) -> bool {
        self.state == RequestState::PendingResponses
            && action.action_type() == ActionType::InviteAnswer
            && action.operation_id() == self.operation_id
            && action.peer() == &self.peer
    }

    fn next_step(&mut self, action: &Action, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if !self.is_pertinent(action) {
            return Vec::new();
        }
        let invited = match Contact::from_address(action.peer().clone(), self.key_bits) {
            Ok(contact) => contact,
            Err(error) => {
                warn!(%error, "dropping invite answer from unhashable peer");
                return Vec::new();
            }
        };
        // Anything but an explicit true is a refusal.
        let accepted = matches!(action.payload(), Payload::Boolean(true));
        ctx.provider.visit(&invited);
        self.state = RequestState::Completed;
        if let Some(mut callback) = self.on_complete.take() {
            callback(
                self.operation_id,
                RequestOutcome::Invite {
                    peer: invited,
                    accepted,
                },
            );
        }
        self.steps += 1;
        Vec::new()
    }
}
