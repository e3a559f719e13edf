//! Query epochs and canonical query text.

use serde::Serialize;
use std::fmt;

/// Identifies the query currently of interest.
///
/// Every submission opens a new epoch, even when the text repeats, so a
/// resubmitted query never publishes twice for the same provider. Lookups
/// compare the live epoch against the one they were launched under right
/// before publishing and drop their result on mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryEpoch {
    generation: u64,
    query: String,
}

impl QueryEpoch {
    pub(crate) fn new(generation: u64, query: String) -> Self {
        Self { generation, query }
    }

    /// Monotonic submission counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Canonical query text.
    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for QueryEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.generation, self.query)
    }
}

/// Trim and collapse whitespace runs to single spaces.
///
/// Returns `None` when nothing but whitespace remains.
pub fn normalize_query(text: &str) -> Option<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
