//! Kademlia routing table
//!
//! Given `N`, the number of bits in the keyspace, the table holds `N`
//! buckets. Bucket `i` holds the nodes whose XOR distance from the owner
//! satisfies `2^(N-i-1) <= distance <= 2^(N-i) - 1`, that is
//! `i = N - 1 - (index of the highest set bit of the distance)`:
//! bucket 0 collects the nodes differing in the most significant bit,
//! bucket `N-1` the single node differing only in the least significant
//! bit. The table is owned by one local identity and is not internally
//! synchronized; hosts must serialize access.

use crate::bucket::KBucket;
use burrow_core::{BinaryKey, Contact};

pub struct RoutingTable {
    owner: BinaryKey,
    buckets: Vec<KBucket>,
}

impl RoutingTable {
    /// Build a table for `owner`: one bucket per key bit, each bucket's
    /// capacity equal to the key width.
    pub fn new(owner: BinaryKey) -> Self {
        let bits = owner.len();
        Self::with_bucket_capacity(owner, bits)
    }

    /// Build a table with an explicit per-bucket capacity
    pub fn with_bucket_capacity(owner: BinaryKey, bucket_capacity: usize) -> Self {
        let bits = owner.len();
        Self {
            owner,
            buckets: (0..bits).map(|_| KBucket::new(bucket_capacity)).collect(),
        }
    }

    /// The key this table is centred on
    pub fn owner(&self) -> &BinaryKey {
        &self.owner
    }

    /// Bucket index for a key: `N - 1 - leading_one(owner XOR key)`.
    ///
    /// `None` for the owner itself (zero distance has no bucket) and for
    /// keys of a different length.
    pub fn location(&self, key: &BinaryKey) -> Option<usize> {
        let distance = self.owner.distance(key).ok()?;
        let leading = distance.leading_one()?;
        Some(self.buckets.len() - 1 - leading)
    }

    /// Add a contact to the bucket its distance selects
    pub fn add(&mut self, contact: Contact) -> bool {
        match self.location(contact.key()) {
            Some(index) => self.buckets[index].add(contact),
            None => false,
        }
    }

    /// Remove a contact from its bucket
    pub fn remove(&mut self, contact: &Contact) -> bool {
        match self.location(contact.key()) {
            Some(index) => self.buckets[index].remove(contact),
            None => false,
        }
    }

    pub fn contains(&self, contact: &Contact) -> bool {
        match self.location(contact.key()) {
            Some(index) => self.buckets[index].contains(contact),
            None => false,
        }
    }

    /// The bucket at `index`, if in range
    pub fn bucket(&self, index: usize) -> Option<&KBucket> {
        self.buckets.get(index)
    }

    /// Contents of the first non-empty bucket scanning from the key's
    /// location (the last bucket when the key is the owner) down towards
    /// bucket 0.
    ///
    /// Note this returns a whole bucket's membership, not a capped count;
    /// callers needing exactly k nodes must post-filter.
    pub fn k_closest(&self, key: &BinaryKey) -> Vec<Contact> {
        let position = if key == &self.owner {
            self.buckets.len().saturating_sub(1)
        } else {
            match self.location(key) {
                Some(position) => position,
                None => return Vec::new(),
            }
        };
        for index in (0..=position).rev() {
            if !self.buckets[index].is_empty() {
                return self.buckets[index].contacts().to_vec();
            }
        }
        Vec::new()
    }

    /// The single contact with minimal XOR distance to `key` within the
    /// closest non-empty bucket, excluding `key` itself.
    pub fn closest(&self, key: &BinaryKey) -> Option<Contact> {
        self.k_closest(key)
            .into_iter()
            .filter(|c| c.key() != key)
            .filter_map(|c| c.key().distance(key).ok().map(|d| (d, c)))
            .min_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, contact)| contact)
    }

    /// Number of contacts across all buckets
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.is_empty())
    }
}
