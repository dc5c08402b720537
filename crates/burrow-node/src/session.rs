//! One node's DHT session
//!
//! A [`Session`] owns everything one participant needs: its identity,
//! the routing table behind a data provider, the pending request manager
//! for operations it initiates, and the responder for requests it
//! receives. It is strictly single-threaded and event-driven; the host
//! feeds it inbound messages and sends whatever [`Session::flush`]
//! returns.

use burrow_core::{BinaryKey, Contact, PeerAddress, Resource};
use burrow_dht::{
    Action, ActionBuilder, ActionPropagator, ActionResponder, ActionType, DhtConfig, MemoryStore,
    OperationId, OutcomeCallback, PendingRequestManager, QueuedPropagator, RequestOutcome,
    Result, TableProvider,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

pub struct Session {
    identity: Contact,
    config: DhtConfig,
    builder: ActionBuilder,
    manager: PendingRequestManager<QueuedPropagator, TableProvider>,
    responder: ActionResponder<MemoryStore>,
    responder_out: QueuedPropagator,
    outcomes: Rc<RefCell<Vec<(OperationId, RequestOutcome)>>>,
}

impl Session {
    pub fn new(address: PeerAddress, config: DhtConfig) -> Result<Self> {
        let identity = Contact::from_address(address, config.key_bits)?;
        let provider = TableProvider::new(identity.clone());
        let manager =
            PendingRequestManager::new(config.clone(), QueuedPropagator::new(), provider)?;
        let responder = ActionResponder::new(config.key_bits, config.k, MemoryStore::new());
        Ok(Self {
            identity,
            config,
            builder: ActionBuilder::new(),
            manager,
            responder,
            responder_out: QueuedPropagator::new(),
            outcomes: Rc::new(RefCell::new(Vec::new())),
        })
    }

    pub fn identity(&self) -> &Contact {
        &self.identity
    }

    pub fn address(&self) -> &PeerAddress {
        self.identity.address()
    }

    /// Number of peers currently in the routing table
    pub fn known_peers(&self) -> usize {
        self.manager.provider().table().len()
    }

    /// Results reported since the last call
    pub fn take_outcomes(&mut self) -> Vec<(OperationId, RequestOutcome)> {
        self.outcomes.borrow_mut().drain(..).collect()
    }

    fn sink(&self) -> OutcomeCallback {
        let outcomes = self.outcomes.clone();
        Box::new(move |id, outcome| outcomes.borrow_mut().push((id, outcome)))
    }

    // Operations this node initiates. Each returns the allocated
    // operation id, or None when the id space is exhausted.

    pub fn ping(&mut self, peer: &PeerAddress) -> Option<OperationId> {
        let sink = self.sink();
        self.manager.enqueue_ping(peer, sink)
    }

    pub fn invite(&mut self, peer: &PeerAddress) -> Option<OperationId> {
        let sink = self.sink();
        self.manager.enqueue_invite(peer, sink)
    }

    pub fn find_node(&mut self, target: BinaryKey) -> Option<OperationId> {
        let sink = self.sink();
        self.manager.enqueue_find_node(target, sink)
    }

    pub fn find_value(&mut self, target: BinaryKey) -> Option<OperationId> {
        let sink = self.sink();
        self.manager.enqueue_find_value(target, sink)
    }

    pub fn store(&mut self, resource: Resource) -> Option<OperationId> {
        let sink = self.sink();
        self.manager.enqueue_store(resource, sink)
    }

    /// Abandon an in-flight operation, freeing its id
    pub fn cancel(&mut self, id: OperationId) -> bool {
        self.manager.dequeue(id).is_some()
    }

    /// Feed one raw inbound message into the session
    pub fn handle_message(&mut self, from: &PeerAddress, body: &str) {
        let action = match Action::decode(from.clone(), body) {
            Ok(action) => action,
            Err(error) => {
                warn!(%error, %from, "dropping undecodable message");
                return;
            }
        };

        // Any well-formed message is a successful contact: learn the
        // sender.
        match Contact::from_address(from.clone(), self.config.key_bits) {
            Ok(sender) if sender != self.identity => {
                self.manager.provider_mut().table_mut().add(sender);
            }
            _ => {}
        }

        if action.action_type().is_request() {
            if action.action_type() == ActionType::Invite {
                // Joining is open here; a gated deployment would consult
                // the application before answering.
                match self.builder.invite_answer(&action, true) {
                    Ok(answer) => self.responder_out.propagate(answer),
                    Err(error) => warn!(%error, "could not answer invite"),
                }
            } else {
                self.responder.on_action_received(
                    &action,
                    self.manager.provider(),
                    &mut self.responder_out,
                );
            }
        } else {
            match self.manager.continue_request(&action) {
                Ok(true) => {}
                Ok(false) => debug!("no pending operation claimed the answer"),
                Err(error) => warn!(%error, "misrouted action"),
            }
        }
    }

    /// Drain everything waiting to be sent, as (recipient, wire text)
    /// pairs, and release the ids of finished operations.
    pub fn flush(&mut self) -> Vec<(PeerAddress, String)> {
        for id in self.manager.completed_ids() {
            self.manager.dequeue(id);
        }
        let mut outbound = self.manager.propagator_mut().drain();
        outbound.extend(self.responder_out.drain());
        outbound
            .into_iter()
            .map(|action| (action.peer().clone(), action.encode()))
            .collect()
    }
}
