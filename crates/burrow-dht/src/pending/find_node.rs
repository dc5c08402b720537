//! FIND_NODE: iterative lookup for the node closest to a target key

use super::lookup::IterativeLookup;
use super::{OutcomeCallback, PendingRequest, RequestContext, RequestOutcome, RequestState};
use crate::action::{Action, ActionType, OperationId};
use burrow_core::{BinaryKey, Contact};
use tracing::warn;

pub struct FindNodeRequest {
    operation_id: OperationId,
    state: RequestState,
    steps: usize,
    lookup: IterativeLookup,
    on_complete: Option<OutcomeCallback>,
}

impl FindNodeRequest {
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
                    .find_node(self.operation_id, contact.address(), self.lookup.target())
                {
                    Ok(action) => Some(action),
                    Err(error) => {
                        warn!(%error, "skipping find-node request");
                        None
                    }
                }
            })
            .collect()
    }

    /// Decide what the lookup does next: wait for more answers, open the
    /// next round, or stop at the closest node found (the local root when
    /// nobody was ever reached).
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
        self.complete(ctx);
        Vec::new()
    }

    fn complete(&mut self, ctx: &mut RequestContext<'_>) {
        let closest = self
            .lookup
            .best_visited()
            .cloned()
            .unwrap_or_else(|| ctx.provider.root());
        self.state = RequestState::Completed;
        if let Some(mut callback) = self.on_complete.take() {
            callback(
                self.operation_id,
                RequestOutcome::FindNode {
                    target: self.lookup.target().clone(),
                    closest,
                },
            );
        }
    }
}

impl PendingRequest for FindNodeRequest {
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
        // With nobody to contact the lookup is already converged.
        actions.extend(self.evaluate(ctx));
        actions
    }

    fn is_pertinent(&self, action: &Action) -> bool {
        self.state == RequestState::PendingResponses
            && action.action_type() == ActionType::FindNodeAnswer
            && action.operation_id() == self.operation_id
    }

    fn next_step(&mut self, action: &Action, ctx: &mut RequestContext<'_>) -> Vec<Action> {
        if !self.is_pertinent(action) {
            return Vec::new();
        }
        self.lookup.absorb(action, ctx);
        let actions = self.evaluate(ctx);
        self.steps += 1;
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Payload;
    use crate::builder::ActionBuilder;
    use crate::pending::test_support::{capture, contact, StubProvider};
    use burrow_core::PeerAddress;

    fn peer(name: &str) -> PeerAddress {
        PeerAddress::new(name).unwrap()
    }

    fn answer(id: OperationId, from: &str, part: u16, total: u16, payload: Payload) -> Action {
        Action::new(ActionType::FindNodeAnswer, id, part, total, payload, peer(from)).unwrap()
    }

    #[test]
    fn empty_candidate_set_completes_immediately_with_root() {
        let builder = ActionBuilder::new();
        let mut provider = StubProvider::new();
        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };

        let (callback, slot) = capture();
        let target = contact("far-away").key().clone();
        let mut request = FindNodeRequest::new(4, target.clone(), 5, 64, callback);

        let actions = request.start(&mut ctx);
        assert!(actions.is_empty());
        assert_eq!(request.state(), RequestState::Completed);
        assert_eq!(
            slot.borrow().clone(),
            Some((
                4,
                RequestOutcome::FindNode {
                    target,
                    closest: contact("stub-root")
                }
            ))
        );
    }

    #[test]
    fn two_round_lookup_converges_and_counts_steps() {
        let builder = ActionBuilder::new();
        let mut provider = StubProvider::with_known(vec![contact("a")]);

        let (callback, slot) = capture();
        let target = contact("the-target").key().clone();
        let mut request = FindNodeRequest::new(9, target.clone(), 5, 64, callback);

        // Round one: the only known node is contacted.
        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        let actions = request.start(&mut ctx);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].peer(), &peer("a"));

        // "a" answers with one fragment introducing the unvisited peer
        // "b": the round closes and a second round towards "b" opens.
        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        let actions = request.next_step(
            &answer(9, "a", 1, 1, Payload::PeerAddress(peer("b"))),
            &mut ctx,
        );
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].peer(), &peer("b"));
        assert_eq!(request.state(), RequestState::PendingResponses);

        // "b" answers with nothing new: the lookup converges on the
        // closer of the two visited nodes.
        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        let actions = request.next_step(&answer(9, "b", 1, 1, Payload::Ignored), &mut ctx);
        assert!(actions.is_empty());
        assert_eq!(request.state(), RequestState::Completed);
        assert_eq!(request.steps_taken(), 2);

        let expected_closest = [contact("a"), contact("b")]
            .into_iter()
            .min_by_key(|c| c.key().distance(&target).unwrap())
            .unwrap();
        assert_eq!(
            slot.borrow().clone(),
            Some((
                9,
                RequestOutcome::FindNode {
                    target,
                    closest: expected_closest
                }
            ))
        );
    }

    #[test]
    fn multi_fragment_answers_hold_the_round_open() {
        let builder = ActionBuilder::new();
        let mut provider = StubProvider::with_known(vec![contact("a")]);

        let (callback, slot) = capture();
        let target = contact("the-target").key().clone();
        let mut request = FindNodeRequest::new(3, target, 5, 64, callback);

        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        request.start(&mut ctx);

        // First of two fragments: the round must stay open.
        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        let actions = request.next_step(
            &answer(3, "a", 1, 2, Payload::PeerAddress(peer("a"))),
            &mut ctx,
        );
        assert!(actions.is_empty());
        assert!(slot.borrow().is_none());

        // Second fragment carries a peer that is already visited ("a"
        // itself), so the buffer stays empty and the lookup converges.
        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        request.next_step(
            &answer(3, "a", 2, 2, Payload::PeerAddress(peer("a"))),
            &mut ctx,
        );
        assert_eq!(request.state(), RequestState::Completed);
        assert_eq!(request.steps_taken(), 2);
        let outcome = slot.borrow().clone();
        match outcome {
            Some((_, RequestOutcome::FindNode { closest, .. })) => {
                assert_eq!(closest, contact("a"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn answers_with_a_stale_id_are_ignored() {
        let builder = ActionBuilder::new();
        let mut provider = StubProvider::with_known(vec![contact("a")]);

        let (callback, _slot) = capture();
        let target = contact("the-target").key().clone();
        let mut request = FindNodeRequest::new(9, target, 5, 64, callback);

        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        request.start(&mut ctx);

        let mut ctx = RequestContext { builder: &builder, provider: &mut provider };
        request.next_step(&answer(8, "a", 1, 1, Payload::Ignored), &mut ctx);
        assert_eq!(request.steps_taken(), 0);
        assert_eq!(request.state(), RequestState::PendingResponses);
    }
}
