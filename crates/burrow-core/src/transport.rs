//! Transport abstraction for discrete-message communication
//!
//! This module provides a trait-based abstraction over an address-based,
//! store-and-forward message transport with no ordering or delivery
//! guarantees, allowing for in-memory implementations during testing and
//! a real carrier in production. Messages are opaque text; framing and
//! fragmentation above the single-message size are the protocol's own
//! concern.

use crate::{Error, PeerAddress, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A message received from the transport
#[derive(Clone, Debug)]
pub struct ReceivedMessage {
    /// The address the message came from
    pub from: PeerAddress,
    /// The message payload
    pub body: String,
}

impl ReceivedMessage {
    pub fn new(from: PeerAddress, body: impl Into<String>) -> Self {
        Self {
            from,
            body: body.into(),
        }
    }
}

/// Transport trait for discrete-message communication
///
/// This trait abstracts over the physical carrier, allowing for:
/// - In-memory implementations for tests and demos
/// - Future real transports (mixnets, SMS gateways, message queues)
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    /// Get our own address on the network
    fn local_address(&self) -> &PeerAddress;

    /// Send a message to a specific address (fire-and-forget)
    async fn send(&self, recipient: &PeerAddress, body: String) -> Result<()>;

    /// Receive the next message (blocking)
    async fn receive(&self) -> Result<ReceivedMessage>;

    /// Try to receive a message with a timeout
    async fn receive_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Option<ReceivedMessage>>;
}

pub mod mock {
    //! In-memory transports for testing and development

    use super::*;

    /// A mock transport that records sends and replays queued messages
    pub struct MockTransport {
        address: PeerAddress,
        /// Messages to deliver on receive()
        incoming: Mutex<VecDeque<ReceivedMessage>>,
        /// Messages that were sent
        outgoing: Mutex<Vec<(PeerAddress, String)>>,
    }

    impl MockTransport {
        pub fn new(address: PeerAddress) -> Self {
            Self {
                address,
                incoming: Mutex::new(VecDeque::new()),
                outgoing: Mutex::new(Vec::new()),
            }
        }

        /// Queue a message to be received
        pub fn queue_message(&self, msg: ReceivedMessage) {
            self.incoming.lock().unwrap().push_back(msg);
        }

        /// Get all sent messages
        pub fn sent_messages(&self) -> Vec<(PeerAddress, String)> {
            self.outgoing.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn local_address(&self) -> &PeerAddress {
            &self.address
        }

        async fn send(&self, recipient: &PeerAddress, body: String) -> Result<()> {
            self.outgoing
                .lock()
                .unwrap()
                .push((recipient.clone(), body));
            Ok(())
        }

        async fn receive(&self) -> Result<ReceivedMessage> {
            loop {
                if let Some(msg) = self.incoming.lock().unwrap().pop_front() {
                    return Ok(msg);
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        }

        async fn receive_timeout(
            &self,
            timeout: std::time::Duration,
        ) -> Result<Option<ReceivedMessage>> {
            let start = std::time::Instant::now();
            loop {
                if let Some(msg) = self.incoming.lock().unwrap().pop_front() {
                    return Ok(Some(msg));
                }
                if start.elapsed() >= timeout {
                    return Ok(None);
                }
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
        }
    }

    /// A shared in-memory message switch pairing several endpoints.
    ///
    /// Each endpoint sees the bus as its own [`Transport`]; messages sent
    /// to an unknown address are dropped, like on a real store-and-forward
    /// carrier.
    #[derive(Clone, Default)]
    pub struct MessageBus {
        mailboxes: Arc<Mutex<HashMap<PeerAddress, VecDeque<ReceivedMessage>>>>,
    }

    impl MessageBus {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an endpoint on the bus
        pub fn endpoint(&self, address: PeerAddress) -> BusEndpoint {
            self.mailboxes
                .lock()
                .unwrap()
                .entry(address.clone())
                .or_default();
            BusEndpoint {
                address,
                bus: self.clone(),
            }
        }

        /// Total number of undelivered messages on the bus
        pub fn pending(&self) -> usize {
            self.mailboxes
                .lock()
                .unwrap()
                .values()
                .map(|q| q.len())
                .sum()
        }
    }

    /// One endpoint of a [`MessageBus`]
    pub struct BusEndpoint {
        address: PeerAddress,
        bus: MessageBus,
    }

    impl BusEndpoint {
        /// Pop the next queued message without waiting
        pub fn try_receive(&self) -> Option<ReceivedMessage> {
            self.bus
                .mailboxes
                .lock()
                .unwrap()
                .get_mut(&self.address)
                .and_then(|q| q.pop_front())
        }
    }

    impl Transport for BusEndpoint {
        fn local_address(&self) -> &PeerAddress {
            &self.address
        }

        async fn send(&self, recipient: &PeerAddress, body: String) -> Result<()> {
            let mut mailboxes = self.bus.mailboxes.lock().unwrap();
            match mailboxes.get_mut(recipient) {
                Some(queue) => {
                    queue.push_back(ReceivedMessage::new(self.address.clone(), body));
                    Ok(())
                }
                // Unknown recipient: the message is lost in transit.
                None => Err(Error::Transport(format!("no route to {recipient}"))),
            }
        }

        async fn receive(&self) -> Result<ReceivedMessage> {
            loop {
                if let Some(msg) = self.try_receive() {
                    return Ok(msg);
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        }

        async fn receive_timeout(
            &self,
            timeout: std::time::Duration,
        ) -> Result<Option<ReceivedMessage>> {
            let start = std::time::Instant::now();
            loop {
                if let Some(msg) = self.try_receive() {
                    return Ok(Some(msg));
                }
                if start.elapsed() >= timeout {
                    return Ok(None);
                }
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
        }
    }

}
