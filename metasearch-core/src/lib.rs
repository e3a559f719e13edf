//! # metasearch-core
//!
//! Query fan-out and reconciliation for Metasearch.
//!
//! One query is sent concurrently to every registered provider. Each
//! provider's results are published as a [`ResultGroup`] the moment they
//! arrive, in completion order, with query matches highlighted. Results that
//! arrive after the user has moved on to a newer query are dropped.
//!
//! ## Design
//!
//! - [`Coordinator`] owns the query epoch and the published state
//! - [`RequestCache`] memoizes lookups per `(provider, query, options)` and
//!   coalesces concurrent identical requests
//! - [`highlight()`] marks query matches in HTML text nodes only
//! - [`rank`] orders a group's results without mutating it
//! - [`ProviderRegistry`] holds the fixed set of [`SearchProvider`]s
//!
//! ## Security
//!
//! - Query text is logged only at trace level
//! - Provider credentials never appear in error messages
//! - Provider failures are recorded per group, never shown verbatim to end users

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod highlight;
pub mod http;
pub mod provider;
pub mod providers;
pub mod ranker;
pub mod registry;
pub mod types;

pub use cache::RequestCache;
pub use config::CoordinatorConfig;
pub use coordinator::{
    Coordinator, CoordinatorEvent, ProviderStatus, PublishedState, QueryEpoch, QueryHandle,
    TaskOutcome,
};
pub use error::{ProviderError, Result, SearchError};
pub use highlight::{highlight, HighlightPattern};
pub use provider::SearchProvider;
pub use ranker::{rank, ranked_groups, SortMode};
pub use registry::{ProviderRegistry, ProviderRegistryBuilder};
pub use types::{
    Capability, ProviderDescriptor, ProviderOptions, ResultComment, ResultGroup, SearchResult,
};

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    fn adapters() -> ProviderRegistry {
        let config = CoordinatorConfig::default();
        ProviderRegistry::builder()
            .register(Arc::new(providers::JiraProvider::new(&config)))
            .and_then(|b| b.register(Arc::new(providers::GitHubProvider::new(&config))))
            .expect("unique ids")
            .build()
    }

    #[test]
    fn adapters_list_by_name() {
        let registry = adapters();
        let names: Vec<&str> = registry.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["GitHub", "Jira"]);
    }

    #[tokio::test]
    async fn uninitialized_provider_fails_its_group_only() {
        let registry = adapters();
        let coordinator =
            Coordinator::new(registry, RequestCache::unbounded(), CoordinatorConfig::default())
                .expect("valid config");

        let outcomes = coordinator.submit("rust").expect("non-blank").settled().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, TaskOutcome::Failed { error: ProviderError::NotInitialized(_), .. })));

        let state = coordinator.snapshot();
        assert_eq!(state.groups.len(), 2);
        assert!(state.groups.iter().all(|g| g.results.is_empty() && g.error.is_some()));
        assert_eq!(state.status("jira"), ProviderStatus::NoResults);
    }
}
