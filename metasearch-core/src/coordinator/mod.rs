//! Query coordinator: fan-out, stale-result suppression, publishing.
//!
//! This module launches one lookup per registered provider, tolerates
//! completion in any order, discards completions that belong to a
//! superseded query, highlights surviving results and publishes them as
//! result groups for observers.

pub mod epoch;
pub mod fanout;
pub mod state;

pub use epoch::{normalize_query, QueryEpoch};
pub use fanout::{Coordinator, QueryHandle};
pub use state::{CoordinatorEvent, ProviderStatus, PublishedState, TaskOutcome};
