/// Node state definitions for tracking crawl progress
///
/// This module defines all possible states a listing can be in once the
/// traversal has decided to fetch it.
use std::fmt;

/// Represents the current state of a listing in the crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    // ===== Active States =====
    /// Listing is being fetched (possibly between retries)
    Fetching,

    // ===== Terminal Success States =====
    /// Response was persisted to the snapshot store
    Stored,

    // ===== Terminal Error States =====
    /// Every attempt failed with a retryable error
    FailedRetryable,

    /// The source answered with a non-retryable status or an unusable body
    FailedTerminal,
}

impl NodeState {
    /// Converts the node state to its report string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Stored => "stored",
            Self::FailedRetryable => "failed_retryable",
            Self::FailedTerminal => "failed_terminal",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
