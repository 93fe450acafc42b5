//! Assignment store and draw engine.
//!
//! The store holds the current giver → receiver map; the engine in
//! [`engine`] computes bulk derangements and individual-draw pools.

mod engine;

pub use engine::*;

use std::collections::HashMap;

use crate::models::AssignmentPair;

/// The current giver → receiver map.
///
/// Invariants: no key maps to itself, and no receiver appears as the value
/// of two different keys. Both are enforced at the insertion sites (pool
/// construction for individual draws, derangement for bulk draws).
#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    map: HashMap<i64, i64>,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted map, dropping entries that no longer satisfy
    /// the invariants against the given roster ids (self-assignments or
    /// entries referencing members that vanished from the snapshot).
    pub fn from_persisted(map: HashMap<i64, i64>, roster_ids: &[i64]) -> Self {
        let map = map
            .into_iter()
            .filter(|(giver, receiver)| {
                giver != receiver && roster_ids.contains(giver) && roster_ids.contains(receiver)
            })
            .collect();
        Self { map }
    }

    /// The assigned receiver for a member, if any.
    pub fn get(&self, member_id: i64) -> Option<i64> {
        self.map.get(&member_id).copied()
    }

    /// Whether a member is already somebody's receiver.
    pub fn is_receiver(&self, member_id: i64) -> bool {
        self.map.values().any(|&r| r == member_id)
    }

    pub fn insert(&mut self, giver_id: i64, receiver_id: i64) {
        debug_assert_ne!(giver_id, receiver_id);
        self.map.insert(giver_id, receiver_id);
    }

    /// Replace the whole map with a freshly drawn bijection.
    pub fn replace(&mut self, map: HashMap<i64, i64>) {
        self.map = map;
    }

    /// Empty the map (explicit user action).
    pub fn clear_all(&mut self) {
        self.map.clear();
    }

    /// Cascade a roster deletion: drop the entry keyed by the member and any
    /// entry that had the member as its receiver.
    pub fn on_member_removed(&mut self, member_id: i64) {
        self.map
            .retain(|&giver, &mut receiver| giver != member_id && receiver != member_id);
    }

    /// Ids currently appearing as receivers.
    pub fn receiver_ids(&self) -> Vec<i64> {
        self.map.values().copied().collect()
    }

    /// Pairs in ascending giver order, for stable wire output.
    pub fn pairs(&self) -> Vec<AssignmentPair> {
        let mut pairs: Vec<AssignmentPair> = self
            .map
            .iter()
            .map(|(&giver_id, &receiver_id)| AssignmentPair {
                giver_id,
                receiver_id,
            })
            .collect();
        pairs.sort_by_key(|p| p.giver_id);
        pairs
    }

    pub fn as_map(&self) -> &HashMap<i64, i64> {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
