//! The outbound action boundary
//!
//! An [`ActionPropagator`] hands finished actions to whatever carries
//! them: a real transport adapter in production, a buffer drained by the
//! host event loop, or a counter in tests.

use crate::action::Action;
use std::collections::VecDeque;

pub trait ActionPropagator {
    /// Hand one action to the transport (fire-and-forget)
    fn propagate(&mut self, action: Action);

    /// Hand a batch of actions to the transport
    fn propagate_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.propagate(action);
        }
    }
}

/// Buffers outbound actions until the host drains and sends them
#[derive(Default)]
pub struct QueuedPropagator {
    queue: VecDeque<Action>,
}

impl QueuedPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered action, oldest first
    pub fn drain(&mut self) -> Vec<Action> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl ActionPropagator for QueuedPropagator {
    fn propagate(&mut self, action: Action) {
        self.queue.push_back(action);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionType, Payload};
    use burrow_core::PeerAddress;

    #[test]
    fn queue_drains_in_order() {
        let mut propagator = QueuedPropagator::new();
        let peer = PeerAddress::new("p").unwrap();
        for id in 0..3 {
            let action =
                Action::new(ActionType::Ping, id, 1, 1, Payload::Ignored, peer.clone()).unwrap();
            propagator.propagate(action);
        }
        assert_eq!(propagator.len(), 3);

        let drained = propagator.drain();
        assert!(propagator.is_empty());
        let ids: Vec<_> = drained.iter().map(|a| a.operation_id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
