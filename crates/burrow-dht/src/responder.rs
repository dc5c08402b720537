//! Answering incoming requests
//!
//! The responder is the server side of the protocol: a thin consumer of
//! the node data provider and the local resource store. It dispatches
//! inbound request actions by type and hands the built answers to a
//! propagator. Answers and INVITE requests (an application-level
//! decision) are not its business and are left untouched.

use crate::action::{Action, ActionType, Payload};
use crate::builder::ActionBuilder;
use crate::propagate::ActionPropagator;
use crate::provider::NodeDataProvider;
use crate::store::ResourceStore;
use burrow_core::PeerAddress;
use tracing::{debug, warn};

pub struct ActionResponder<S> {
    builder: ActionBuilder,
    key_bits: usize,
    k: usize,
    store: S,
}

impl<S: ResourceStore> ActionResponder<S> {
    pub fn new(key_bits: usize, k: usize, store: S) -> Self {
        Self {
            builder: ActionBuilder::new(),
            key_bits,
            k,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one inbound action, sending any answers through
    /// `propagator`
    pub fn on_action_received(
        &mut self,
        action: &Action,
        provider: &dyn NodeDataProvider,
        propagator: &mut dyn ActionPropagator,
    ) {
        match action.action_type() {
            ActionType::Ping => self.on_ping(action, propagator),
            ActionType::FindNode => self.on_find_node(action, provider, propagator),
            ActionType::FindValue => self.on_find_value(action, provider, propagator),
            ActionType::Store => self.on_store(action, provider, propagator),
            other => debug!(?other, "responder ignoring action"),
        }
    }

    fn on_ping(&self, action: &Action, propagator: &mut dyn ActionPropagator) {
        match self.builder.ping_answer(action) {
            Ok(answer) => propagator.propagate(answer),
            Err(error) => warn!(%error, "could not answer ping"),
        }
    }

    /// The closest peers this node knows, as contactable addresses
    fn closest_peers(
        &self,
        provider: &dyn NodeDataProvider,
        target: &burrow_core::BinaryKey,
    ) -> Vec<PeerAddress> {
        provider
            .k_closest(self.k, target)
            .into_iter()
            .map(|contact| contact.address().clone())
            .collect()
    }

    fn on_find_node(
        &self,
        action: &Action,
        provider: &dyn NodeDataProvider,
        propagator: &mut dyn ActionPropagator,
    ) {
        let Payload::NodeId(target) = action.payload() else {
            debug!("find-node request without a target key");
            return;
        };
        let peers = self.closest_peers(provider, target);
        match self.builder.find_node_answer(action, &peers) {
            Ok(answers) => propagator.propagate_all(answers),
            Err(error) => warn!(%error, "could not answer find-node"),
        }
    }

    fn on_find_value(
        &self,
        action: &Action,
        provider: &dyn NodeDataProvider,
        propagator: &mut dyn ActionPropagator,
    ) {
        let Payload::NodeId(target) = action.payload() else {
            debug!("find-value request without a target key");
            return;
        };
        if let Some(resource) = self.store.get(target) {
            match self.builder.find_value_answer_found(action, resource) {
                Ok(answer) => propagator.propagate(answer),
                Err(error) => warn!(%error, "could not answer find-value"),
            }
            return;
        }
        let peers = self.closest_peers(provider, target);
        match self.builder.find_value_answer_peers(action, &peers) {
            Ok(answers) => propagator.propagate_all(answers),
            Err(error) => warn!(%error, "could not answer find-value"),
        }
    }

    fn on_store(
        &mut self,
        action: &Action,
        provider: &dyn NodeDataProvider,
        propagator: &mut dyn ActionPropagator,
    ) {
        match action.payload() {
            // The final delivery: persist and acknowledge.
            Payload::Resource(resource) => {
                let stored = match resource.key(self.key_bits) {
                    Ok(key) => {
                        self.store.insert(key, resource.clone());
                        true
                    }
                    Err(error) => {
                        warn!(%error, "cannot key the stored resource");
                        false
                    }
                };
                match self.builder.store_answer(action, stored) {
                    Ok(answer) => propagator.propagate(answer),
                    Err(error) => warn!(%error, "could not acknowledge store"),
                }
            }
            // The search phase: redirect towards closer peers.
            Payload::NodeId(target) => {
                let peers = self.closest_peers(provider, target);
                match self.builder.store_answer_redirect(action, &peers) {
                    Ok(answers) => propagator.propagate_all(answers),
                    Err(error) => warn!(%error, "could not redirect store"),
                }
            }
            other => debug!(?other, "store request with an unusable payload"),
        }
    }
}
