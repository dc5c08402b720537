//! Shared bookkeeping for iterative lookups
//!
//! FIND_NODE, FIND_VALUE and the search phase of STORE all drive the
//! same convergence loop: contact a batch of nodes, fold the peers they
//! answer with into a candidate buffer, and once every outstanding
//! answer fragment has arrived either contact the k best unvisited
//! candidates or stop at the closest node seen.

use super::RequestContext;
use crate::action::{Action, Payload};
use burrow_core::{BinaryKey, Contact};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

pub(crate) struct IterativeLookup {
    target: BinaryKey,
    k: usize,
    key_bits: usize,
    /// Every node that answered, keyed by its distance to the target so
    /// iteration starts at the closest.
    visited: BTreeMap<BinaryKey, Contact>,
    /// Nodes contacted and still expected to answer at least once
    pending_responses: BTreeSet<Contact>,
    /// Peers learned from answers, not yet contacted
    peer_buffer: BTreeSet<Contact>,
    /// Outstanding answer fragments: a node's fragment count is added on
    /// its first answer, and each processed fragment subtracts one.
    expected_responses: i32,
}

impl IterativeLookup {
    pub fn new(target: BinaryKey, k: usize, key_bits: usize) -> Self {
        Self {
            target,
            k,
            key_bits,
            visited: BTreeMap::new(),
            pending_responses: BTreeSet::new(),
            peer_buffer: BTreeSet::new(),
            expected_responses: 0,
        }
    }

    pub fn target(&self) -> &BinaryKey {
        &self.target
    }

    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// Pick the opening batch from the provider and mark it as awaiting
    /// answers. Empty when the provider knows nobody.
    pub fn first_round(&mut self, ctx: &mut RequestContext<'_>) -> Vec<Contact> {
        let closest = ctx.provider.k_closest(self.k, &self.target);
        self.pending_responses.extend(closest.iter().cloned());
        closest
    }

    /// Record one pertinent answer fragment
    pub fn absorb(&mut self, action: &Action, ctx: &mut RequestContext<'_>) {
        let sender = match Contact::from_address(action.peer().clone(), self.key_bits) {
            Ok(sender) => sender,
            Err(error) => {
                warn!(%error, "dropping answer from unhashable sender");
                return;
            }
        };
        if self.pending_responses.remove(&sender) {
            // First fragment from this node: it is now visited, and its
            // remaining fragments join the outstanding count.
            self.mark_visited(sender, ctx);
            self.expected_responses += action.total_parts() as i32;
        }
        if let Payload::PeerAddress(address) = action.payload() {
            match Contact::from_address(address.clone(), self.key_bits) {
                Ok(candidate) => {
                    if !self.visited.values().any(|seen| seen == &candidate) {
                        self.peer_buffer.insert(candidate);
                    }
                }
                Err(error) => warn!(%error, "ignoring unhashable candidate peer"),
            }
        }
        self.expected_responses -= 1;
    }

    fn mark_visited(&mut self, contact: Contact, ctx: &mut RequestContext<'_>) {
        if let Ok(distance) = self.target.distance(contact.key()) {
            self.visited.insert(distance, contact.clone());
        }
        ctx.provider.visit(&contact);
    }

    /// True once every contacted node answered with all its fragments
    pub fn round_complete(&self) -> bool {
        self.pending_responses.is_empty() && self.expected_responses == 0
    }

    pub fn has_candidates(&self) -> bool {
        !self.peer_buffer.is_empty()
    }

    /// Drain the candidate buffer into the next batch: the k closest
    /// unvisited candidates, marked as awaiting answers. Empty when the
    /// filter discards every candidate.
    pub fn next_round(&mut self, ctx: &mut RequestContext<'_>) -> Vec<Contact> {
        let candidates: Vec<Contact> = self.peer_buffer.iter().cloned().collect();
        self.peer_buffer.clear();
        let closest = ctx
            .provider
            .filter_k_closest(self.k, &self.target, &candidates);
        self.pending_responses.extend(closest.iter().cloned());
        closest
    }

    /// The visited node with minimal distance to the target
    pub fn best_visited(&self) -> Option<&Contact> {
        self.visited.values().next()
    }
}
