//! State module for tracking crawl progress
//!
//! This module provides the per-session record of which listings were
//! already fetched and how each fetch ended.
//!
//! # Components
//!
//! - `NodeState`: Outcome of one listing's fetch (fetching, stored, failed)
//! - `VisitedSet`: Every listing id touched in the session, with its state

mod node_state;
mod visited;

// Re-export main types
pub use node_state::NodeState;
pub use visited::VisitedSet;
