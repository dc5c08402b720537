//! Builders for protocol actions
//!
//! An [`ActionBuilder`] is an explicitly constructed component, one per
//! manager or responder, rather than a shared global helper. Request
//! builders validate the operation id; answer builders derive the id and
//! destination from the request being answered and reject mismatched
//! request types.

use crate::action::{Action, ActionType, OperationId, Payload};
use crate::{DhtError, Result, MAX_ID};
use burrow_core::{BinaryKey, PeerAddress, Resource};

pub struct ActionBuilder {
    max_id: OperationId,
}

impl ActionBuilder {
    pub fn new() -> Self {
        Self { max_id: MAX_ID }
    }

    /// Builder with a tighter id bound (never above [`MAX_ID`])
    pub fn with_max_id(max_id: OperationId) -> Self {
        Self {
            max_id: max_id.min(MAX_ID),
        }
    }

    fn check_id(&self, id: OperationId) -> Result<()> {
        if id >= self.max_id {
            return Err(DhtError::InvalidAction(format!(
                "operation id {id} outside [0, {})",
                self.max_id
            )));
        }
        Ok(())
    }

    fn check_request(&self, request: &Action, expected: ActionType) -> Result<()> {
        if request.action_type() != expected {
            return Err(DhtError::InvalidAction(format!(
                "cannot answer a {:?} action as {:?}",
                request.action_type(),
                expected
            )));
        }
        Ok(())
    }

    // Requests

    pub fn ping(&self, id: OperationId, peer: &PeerAddress) -> Result<Action> {
        self.check_id(id)?;
        Action::new(ActionType::Ping, id, 1, 1, Payload::Ignored, peer.clone())
    }

    pub fn invite(&self, id: OperationId, peer: &PeerAddress) -> Result<Action> {
        self.check_id(id)?;
        Action::new(ActionType::Invite, id, 1, 1, Payload::Ignored, peer.clone())
    }

    pub fn find_node(
        &self,
        id: OperationId,
        peer: &PeerAddress,
        target: &BinaryKey,
    ) -> Result<Action> {
        self.check_id(id)?;
        Action::new(
            ActionType::FindNode,
            id,
            1,
            1,
            Payload::NodeId(target.clone()),
            peer.clone(),
        )
    }

    pub fn find_value(
        &self,
        id: OperationId,
        peer: &PeerAddress,
        target: &BinaryKey,
    ) -> Result<Action> {
        self.check_id(id)?;
        Action::new(
            ActionType::FindValue,
            id,
            1,
            1,
            Payload::NodeId(target.clone()),
            peer.clone(),
        )
    }

    /// The search half of a store operation: a STORE request carrying the
    /// target key, answered with peer redirects.
    pub fn store_lookup(
        &self,
        id: OperationId,
        peer: &PeerAddress,
        target: &BinaryKey,
    ) -> Result<Action> {
        self.check_id(id)?;
        Action::new(
            ActionType::Store,
            id,
            1,
            1,
            Payload::NodeId(target.clone()),
            peer.clone(),
        )
    }

    /// The final STORE request carrying the serialized resource
    pub fn store(
        &self,
        id: OperationId,
        peer: &PeerAddress,
        resource: &Resource,
    ) -> Result<Action> {
        self.check_id(id)?;
        Action::new(
            ActionType::Store,
            id,
            1,
            1,
            Payload::Resource(resource.clone()),
            peer.clone(),
        )
    }

    // Answers

    pub fn ping_answer(&self, request: &Action) -> Result<Action> {
        self.check_request(request, ActionType::Ping)?;
        Action::new(
            ActionType::PingAnswer,
            request.operation_id(),
            1,
            1,
            Payload::Ignored,
            request.peer().clone(),
        )
    }

    pub fn invite_answer(&self, request: &Action, accepted: bool) -> Result<Action> {
        self.check_request(request, ActionType::Invite)?;
        Action::new(
            ActionType::InviteAnswer,
            request.operation_id(),
            1,
            1,
            Payload::Boolean(accepted),
            request.peer().clone(),
        )
    }

    /// Split a peer list into one answer fragment per peer, all sharing
    /// the request's operation id. An empty list becomes a single
    /// payload-less fragment so the requester's accounting converges.
    pub fn find_node_answer(
        &self,
        request: &Action,
        peers: &[PeerAddress],
    ) -> Result<Vec<Action>> {
        self.check_request(request, ActionType::FindNode)?;
        self.fragments(ActionType::FindNodeAnswer, request, peers)
    }

    /// Answer a FIND_VALUE with the resource itself
    pub fn find_value_answer_found(
        &self,
        request: &Action,
        resource: &Resource,
    ) -> Result<Action> {
        self.check_request(request, ActionType::FindValue)?;
        Action::new(
            ActionType::FindValueAnswer,
            request.operation_id(),
            1,
            1,
            Payload::Resource(resource.clone()),
            request.peer().clone(),
        )
    }

    /// Answer a FIND_VALUE that missed with the closest peers instead
    pub fn find_value_answer_peers(
        &self,
        request: &Action,
        peers: &[PeerAddress],
    ) -> Result<Vec<Action>> {
        self.check_request(request, ActionType::FindValue)?;
        self.fragments(ActionType::FindValueAnswer, request, peers)
    }

    /// Acknowledge (or refuse) a STORE that carried a resource
    pub fn store_answer(&self, request: &Action, success: bool) -> Result<Action> {
        self.check_request(request, ActionType::Store)?;
        Action::new(
            ActionType::StoreAnswer,
            request.operation_id(),
            1,
            1,
            Payload::Boolean(success),
            request.peer().clone(),
        )
    }

    /// Redirect a STORE lookup towards closer peers
    pub fn store_answer_redirect(
        &self,
        request: &Action,
        peers: &[PeerAddress],
    ) -> Result<Vec<Action>> {
        self.check_request(request, ActionType::Store)?;
        self.fragments(ActionType::StoreAnswer, request, peers)
    }

    fn fragments(
        &self,
        answer_type: ActionType,
        request: &Action,
        peers: &[PeerAddress],
    ) -> Result<Vec<Action>> {
        if peers.is_empty() {
            return Ok(vec![Action::new(
                answer_type,
                request.operation_id(),
                1,
                1,
                Payload::Ignored,
                request.peer().clone(),
            )?]);
        }
        let total = peers.len() as u16;
        peers
            .iter()
            .enumerate()
            .map(|(index, peer)| {
                Action::new(
                    answer_type,
                    request.operation_id(),
                    index as u16 + 1,
                    total,
                    Payload::PeerAddress(peer.clone()),
                    request.peer().clone(),
                )
            })
            .collect()
    }
}

impl Default for ActionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
