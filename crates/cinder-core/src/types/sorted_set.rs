//! Sorted set data structure: dual-indexed by score and member.
//!
//! Each member is a unique byte string with an associated `f64` score.
//! Members are ordered by `(score, member)`: ties in score are broken
//! lexicographically, so ordered scans stay stable and future
//! range-by-score commands get the index they need.
//!
//! Implementation uses a `BTreeMap<(OrderedFloat<f64>, Bytes), ()>` for
//! the order index and an `AHashMap<Bytes, OrderedFloat<f64>>` for O(1)
//! member lookups. Both indices are updated together inside every
//! mutating method; a member is in one index iff it is in the other,
//! with the same score.

use std::collections::BTreeMap;
use std::ops::Bound;

use ahash::AHashMap;
use bytes::Bytes;
use ordered_float::OrderedFloat;

/// A sorted set of unique members, each with a floating-point score.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    /// (score, member) order index for ordered iteration and seeks.
    tree: BTreeMap<(OrderedFloat<f64>, Bytes), ()>,
    /// member → score index for O(1) lookups.
    scores: AHashMap<Bytes, OrderedFloat<f64>>,
}

impl SortedSet {
    /// Creates an empty sorted set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member or updates its score. Returns `true` if the member
    /// was newly added, `false` if an existing member was (re)scored.
    ///
    /// On update the old order-index entry is removed before the new one
    /// is inserted, so a member never appears under two scores.
    pub fn add(&mut self, member: Bytes, score: f64) -> bool {
        let new_score = OrderedFloat(score);

        if let Some(&old_score) = self.scores.get(member.as_ref()) {
            if old_score != new_score {
                self.tree.remove(&(old_score, member.clone()));
                self.tree.insert((new_score, member.clone()), ());
                self.scores.insert(member, new_score);
            }
            false
        } else {
            self.scores.insert(member.clone(), new_score);
            self.tree.insert((new_score, member), ());
            true
        }
    }

    /// Removes a member. Returns `true` if it existed.
    pub fn remove(&mut self, member: &[u8]) -> bool {
        if let Some((member, score)) = self.scores.remove_entry(member) {
            self.tree.remove(&(score, member));
            true
        } else {
            false
        }
    }

    /// Returns the score for a member, or `None` if not present.
    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).map(|s| s.0)
    }

    /// Returns `true` if the member is present.
    pub fn contains(&self, member: &[u8]) -> bool {
        self.scores.contains_key(member)
    }

    /// Returns the first member at or after `(score, member)` in the
    /// order index, advanced by `offset` positions.
    pub fn seek(&self, score: f64, member: &[u8], offset: usize) -> Option<(&Bytes, f64)> {
        let start = (OrderedFloat(score), Bytes::copy_from_slice(member));
        self.tree
            .range((Bound::Included(start), Bound::Unbounded))
            .nth(offset)
            .map(|((score, member), ())| (member, score.0))
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if the sorted set has no members.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns an iterator over (member, score) pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, f64)> {
        self.tree.keys().map(|(score, member)| (member, score.0))
    }
}
