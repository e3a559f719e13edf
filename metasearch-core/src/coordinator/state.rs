//! Published coordinator state, observer events and task outcomes.

use serde::Serialize;

use super::epoch::QueryEpoch;
use crate::error::ProviderError;
use crate::types::ResultGroup;

/// What observers see: the active epoch and the groups published under it,
/// in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishedState {
    /// The active epoch, if any query has been submitted.
    pub epoch: Option<QueryEpoch>,
    /// One group per provider that has finished for the active epoch.
    pub groups: Vec<ResultGroup>,
}

impl PublishedState {
    /// The group published by `provider_id`, if it has finished.
    pub fn group(&self, provider_id: &str) -> Option<&ResultGroup> {
        self.groups.iter().find(|g| g.provider_id == provider_id)
    }

    /// Summarise a provider's progress for the active epoch.
    pub fn status(&self, provider_id: &str) -> ProviderStatus {
        if self.epoch.is_none() {
            return ProviderStatus::Idle;
        }
        match self.group(provider_id) {
            None => ProviderStatus::Searching,
            Some(group) if group.results.is_empty() => ProviderStatus::NoResults,
            Some(group) => ProviderStatus::Results(group.results.len()),
        }
    }

    /// Total results across published groups.
    pub fn result_count(&self) -> usize {
        self.groups.iter().map(|g| g.results.len()).sum()
    }
}

/// Per-provider progress for the active epoch.
///
/// A failed provider reports [`NoResults`](Self::NoResults), the same as
/// one that matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "count")]
pub enum ProviderStatus {
    /// No query has been submitted.
    Idle,
    /// The lookup has not finished yet.
    Searching,
    /// The lookup finished with zero results.
    NoResults,
    /// The lookup finished with this many results.
    Results(usize),
}

/// Notification sent to coordinator subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CoordinatorEvent {
    /// A new epoch started and published groups were cleared.
    EpochStarted {
        /// The new epoch.
        epoch: QueryEpoch,
    },
    /// A provider's group was appended to the published state.
    GroupPublished {
        /// The epoch the group belongs to.
        epoch: QueryEpoch,
        /// The published group.
        group: ResultGroup,
    },
}

/// How one provider task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Results were highlighted and published.
    Published {
        /// Provider id.
        provider_id: String,
        /// Number of published results.
        results: usize,
    },
    /// The lookup failed; an empty group was published.
    Failed {
        /// Provider id.
        provider_id: String,
        /// The recorded failure.
        error: ProviderError,
    },
    /// The epoch changed before the task could publish; nothing was published.
    Discarded {
        /// Provider id.
        provider_id: String,
    },
    /// The task was cancelled by the runtime before finishing.
    Aborted {
        /// Provider id.
        provider_id: String,
    },
}

impl TaskOutcome {
    /// The provider this outcome belongs to.
    pub fn provider_id(&self) -> &str {
        match self {
            Self::Published { provider_id, .. }
            | Self::Failed { provider_id, .. }
            | Self::Discarded { provider_id }
            | Self::Aborted { provider_id } => provider_id,
        }
    }

    /// Whether the task's result was dropped as stale.
    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded { .. })
    }
}
