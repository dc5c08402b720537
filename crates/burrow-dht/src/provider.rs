//! Node data access for lookup operations
//!
//! [`NodeDataProvider`] decouples the lookup state machines from the
//! structure that actually stores peers. The base implementation,
//! [`TableProvider`], wraps a [`RoutingTable`] owned by the local node.

use crate::routing::RoutingTable;
use burrow_core::{BinaryKey, Contact};

pub trait NodeDataProvider {
    /// The local node: owner of the underlying table
    fn root(&self) -> Contact;

    /// Notification that a lookup reached `contact`. No required side
    /// effect in the base provider; membership changes happen in the
    /// owning routing table independently.
    fn visit(&mut self, contact: &Contact);

    /// The single closest known contact to `target`
    fn closest(&self, target: &BinaryKey) -> Option<Contact>;

    /// The closest known contacts to `target`.
    ///
    /// `k` is advisory here: the routing table answers with the contents
    /// of one bucket, which may hold fewer or more than `k` nodes. Use
    /// [`NodeDataProvider::filter_k_closest`] when exactly `k` are needed.
    fn k_closest(&self, k: usize, target: &BinaryKey) -> Vec<Contact>;

    /// Narrow `candidates` down to the `k` closest to `target`, sorted by
    /// ascending distance. This is the only operation guaranteed to
    /// return at most `k` contacts.
    fn filter_k_closest(&self, k: usize, target: &BinaryKey, candidates: &[Contact])
        -> Vec<Contact>;
}

/// [`NodeDataProvider`] backed by the local node's routing table
pub struct TableProvider {
    root: Contact,
    table: RoutingTable,
}

impl TableProvider {
    /// Builds the provider around a fresh table owned by `root`
    pub fn new(root: Contact) -> Self {
        let table = RoutingTable::new(root.key().clone());
        Self { root, table }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut RoutingTable {
        &mut self.table
    }
}

impl NodeDataProvider for TableProvider {
    fn root(&self) -> Contact {
        self.root.clone()
    }

    fn visit(&mut self, _contact: &Contact) {}

    fn closest(&self, target: &BinaryKey) -> Option<Contact> {
        self.table.closest(target)
    }

    fn k_closest(&self, _k: usize, target: &BinaryKey) -> Vec<Contact> {
        self.table.k_closest(target)
    }

    fn filter_k_closest(
        &self,
        k: usize,
        target: &BinaryKey,
        candidates: &[Contact],
    ) -> Vec<Contact> {
        // Seed a scratch table centred on the target with only the
        // candidates, then read back its closest bucket.
        let mut scratch = RoutingTable::new(target.clone());
        for candidate in candidates {
            scratch.add(candidate.clone());
        }
        let mut by_distance: Vec<(BinaryKey, Contact)> = scratch
            .k_closest(target)
            .into_iter()
            .filter_map(|c| c.key().distance(target).ok().map(|d| (d, c)))
            .collect();
        by_distance.sort_by(|a, b| a.0.cmp(&b.0));
        by_distance.truncate(k);
        by_distance.into_iter().map(|(_, contact)| contact).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::PeerAddress;

    fn contact(name: &str) -> Contact {
        Contact::from_address(PeerAddress::new(name).unwrap(), 64).unwrap()
    }

    fn provider_with(names: &[&str]) -> TableProvider {
        let mut provider = TableProvider::new(contact("root"));
        for name in names {
            provider.table_mut().add(contact(name));
        }
        provider
    }

    #[test]
    fn root_is_the_owner() {
        let provider = provider_with(&[]);
        assert_eq!(provider.root(), contact("root"));
    }

    #[test]
    fn k_closest_passes_through_to_the_table() {
        let provider = provider_with(&["a", "b", "c", "d"]);
        let target = contact("a").key().clone();
        let from_provider = provider.k_closest(2, &target);
        let from_table = provider.table().k_closest(&target);
        // The table answers with a whole bucket; k is not enforced here.
        assert_eq!(from_provider, from_table);
    }

    #[test]
    fn filter_k_closest_is_sorted_and_capped_at_k() {
        let provider = provider_with(&[]);
        let target = contact("target").key().clone();
        let candidates: Vec<Contact> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|n| contact(n))
            .collect();

        let filtered = provider.filter_k_closest(3, &target, &candidates);
        assert!(filtered.len() <= 3);

        // Sorted by ascending distance to the target.
        let distances: Vec<_> = filtered
            .iter()
            .map(|c| c.key().distance(&target).unwrap())
            .collect();
        let mut sorted = distances.clone();
        sorted.sort();
        assert_eq!(distances, sorted);

        // Every returned contact is one of the candidates.
        for c in &filtered {
            assert!(candidates.contains(c));
        }
    }

    #[test]
    fn filter_k_closest_with_fewer_candidates_than_k() {
        let provider = provider_with(&[]);
        let target = contact("target").key().clone();
        let candidates = vec![contact("only")];
        let filtered = provider.filter_k_closest(5, &target, &candidates);
        assert_eq!(filtered, candidates);
    }

    #[test]
    fn visit_has_no_side_effect() {
        let mut provider = provider_with(&[]);
        provider.visit(&contact("somebody"));
        assert_eq!(provider.table().len(), 0);
    }
}
