//! Set of listings already fetched in a session

use crate::source::ListingId;
use crate::state::NodeState;
use std::collections::HashMap;

/// Listing ids the session has fetched, with the state each one reached
///
/// Entries are only ever added or advanced; a fresh set is obtained by
/// starting a new session.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    nodes: HashMap<ListingId, NodeState>,
    order: Vec<ListingId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a listing for fetching
    ///
    /// Returns false, leaving the set unchanged, when the listing was
    /// already visited.
    pub fn mark_fetching(&mut self, listing_id: &ListingId) -> bool {
        if self.nodes.contains_key(listing_id) {
            return false;
        }
        self.nodes.insert(listing_id.clone(), NodeState::Fetching);
        self.order.push(listing_id.clone());
        true
    }

    /// Records the outcome of a claimed listing
    ///
    /// Unknown ids are ignored; the set only tracks claimed listings.
    pub fn set_state(&mut self, listing_id: &ListingId, state: NodeState) {
        if let Some(current) = self.nodes.get_mut(listing_id) {
            *current = state;
        }
    }

    pub fn state(&self, listing_id: &ListingId) -> Option<NodeState> {
        self.nodes.get(listing_id).copied()
    }

    pub fn contains(&self, listing_id: &ListingId) -> bool {
        self.nodes.contains_key(listing_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visited ids in the order they were claimed
    pub fn ids(&self) -> impl Iterator<Item = &ListingId> {
        self.order.iter()
    }

    /// Number of listings currently in `state`
    pub fn count(&self, state: NodeState) -> usize {
        self.nodes.values().filter(|s| **s == state).count()
    }
}
