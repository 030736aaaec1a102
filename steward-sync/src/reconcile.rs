//! Set reconciliation between a previous and a desired collection.
//!
//! Pure and total: `to_add = desired − previous`, `to_remove = previous − desired`.
//! Callers apply every addition before any removal so a swap never passes
//! through an empty membership.

use std::collections::HashSet;
use std::hash::Hash;

use steward_core::Attribute;

/// The additions and removals that turn `previous` into `desired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDelta<T> {
    pub to_add: Vec<T>,
    pub to_remove: Vec<T>,
}

impl<T> SetDelta<T> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl<T: Ord> SetDelta<T> {
    /// Sort both sides, for stable plans and call sequences.
    pub fn sorted(mut self) -> Self {
        self.to_add.sort_unstable();
        self.to_remove.sort_unstable();
        self
    }
}

/// Compute the delta between two sets in O(n) with hashed lookups.
pub fn reconcile<T>(previous: &HashSet<T>, desired: &HashSet<T>) -> SetDelta<T>
where
    T: Eq + Hash + Clone,
{
    SetDelta {
        to_add: desired.difference(previous).cloned().collect(),
        to_remove: previous.difference(desired).cloned().collect(),
    }
}

/// Attribute lists are compared as whole lists; the remote update call
/// replaces the full set rather than merging.
pub fn attributes_changed(previous: &[Attribute], desired: &[Attribute]) -> bool {
    previous != desired
}
