//! The query coordinator: concurrent per-provider fan-out with epoch-based
//! soft cancellation.
//!
//! `submit` opens a new [`QueryEpoch`], clears published groups and spawns
//! one task per registered provider. Each task goes through the shared
//! [`RequestCache`], then compares its epoch against the live one exactly
//! once, under the state lock, immediately before publishing. A task whose
//! epoch has been superseded drops its result; its network call is never
//! interrupted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::epoch::{normalize_query, QueryEpoch};
use super::state::{CoordinatorEvent, PublishedState, TaskOutcome};
use crate::cache::{Lookup, RequestCache};
use crate::config::CoordinatorConfig;
use crate::error::SearchError;
use crate::highlight::{highlight_result, HighlightPattern};
use crate::provider::SearchProvider;
use crate::registry::ProviderRegistry;
use crate::types::{ProviderOptions, ResultGroup};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Fans queries out to every registered provider and reconciles the results.
///
/// Cloning is cheap; clones drive the same published state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    registry: ProviderRegistry,
    cache: RequestCache,
    config: CoordinatorConfig,
    generation: AtomicU64,
    state: Mutex<PublishedState>,
    options: RwLock<HashMap<String, ProviderOptions>>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl Coordinator {
    /// Create a coordinator over `registry`, memoizing lookups in `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid.
    pub fn new(
        registry: ProviderRegistry,
        cache: RequestCache,
        config: CoordinatorConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                cache,
                config,
                generation: AtomicU64::new(0),
                state: Mutex::new(PublishedState::default()),
                options: RwLock::new(HashMap::new()),
                events,
            }),
        })
    }

    /// Submit query text.
    ///
    /// Whitespace is normalized first; blank input is ignored and returns
    /// `None`. Otherwise a new epoch starts, published groups are cleared
    /// and one lookup task per provider is spawned in registry order.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, text: &str) -> Option<QueryHandle> {
        let query = normalize_query(text)?;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = QueryEpoch::new(generation, query);

        {
            let mut state = self.inner.lock_state();
            state.epoch = Some(epoch.clone());
            state.groups.clear();
            let _ = self.inner.events.send(CoordinatorEvent::EpochStarted {
                epoch: epoch.clone(),
            });
        }
        tracing::trace!(query = epoch.query(), generation, "query epoch started");

        let tasks = self
            .inner
            .registry
            .providers()
            .map(|provider| {
                let inner = Arc::clone(&self.inner);
                let provider = Arc::clone(provider);
                let task_epoch = epoch.clone();
                let provider_id = provider.id().to_owned();
                let handle = tokio::spawn(async move { inner.run(provider, task_epoch).await });
                (provider_id, handle)
            })
            .collect();

        Some(QueryHandle { epoch, tasks })
    }

    /// Subscribe to epoch and publish notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.inner.events.subscribe()
    }

    /// A copy of the current published state.
    pub fn snapshot(&self) -> PublishedState {
        self.inner.lock_state().clone()
    }

    /// The active epoch, if any.
    pub fn current_epoch(&self) -> Option<QueryEpoch> {
        self.inner.lock_state().epoch.clone()
    }

    /// Set the options sent to `provider_id` on subsequent submissions.
    pub fn set_provider_options(&self, provider_id: impl Into<String>, options: ProviderOptions) {
        self.inner
            .options
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(provider_id.into(), options);
    }

    /// The options currently sent to `provider_id`.
    pub fn provider_options(&self, provider_id: &str) -> ProviderOptions {
        self.inner.options_for(provider_id)
    }

    /// The provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    /// The request cache shared by this coordinator.
    pub fn cache(&self) -> &RequestCache {
        &self.inner.cache
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("registry", &self.inner.registry)
            .field("epoch", &self.current_epoch())
            .finish()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, PublishedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn options_for(&self, provider_id: &str) -> ProviderOptions {
        self.options
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(provider_id)
            .cloned()
            .unwrap_or_default()
    }

    /// One provider's lookup, from cache request to publish.
    async fn run(self: Arc<Self>, provider: Arc<dyn SearchProvider>, epoch: QueryEpoch) -> TaskOutcome {
        let started = Instant::now();
        let options = self.options_for(provider.id());
        let timeout = self.config.provider_timeout();

        let outcome = self
            .cache
            .search(&provider, epoch.query(), &options, timeout)
            .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.publish(provider.id(), &epoch, elapsed_ms, outcome)
    }

    /// Compare against the live epoch and, if still current, publish.
    fn publish(
        &self,
        provider_id: &str,
        epoch: &QueryEpoch,
        elapsed_ms: u64,
        outcome: Lookup,
    ) -> TaskOutcome {
        let mut state = self.lock_state();

        let live = match state.epoch.as_ref() {
            Some(live) if live == epoch => live.clone(),
            _ => {
                tracing::debug!(
                    provider = provider_id,
                    generation = epoch.generation(),
                    "discarding result for superseded query"
                );
                return TaskOutcome::Discarded {
                    provider_id: provider_id.to_owned(),
                };
            }
        };

        let (group, task_outcome) = match outcome {
            Ok(mut results) => {
                let pattern = HighlightPattern::from_query(live.query());
                for (position, result) in results.iter_mut().enumerate() {
                    result.relevance = Some(u32::try_from(position).unwrap_or(u32::MAX));
                    if let Some(pattern) = &pattern {
                        highlight_result(result, pattern);
                    }
                }
                tracing::debug!(
                    provider = provider_id,
                    count = results.len(),
                    elapsed_ms,
                    "provider returned results"
                );
                let count = results.len();
                (
                    ResultGroup {
                        provider_id: provider_id.to_owned(),
                        elapsed_ms,
                        results,
                        error: None,
                    },
                    TaskOutcome::Published {
                        provider_id: provider_id.to_owned(),
                        results: count,
                    },
                )
            }
            Err(error) => {
                tracing::warn!(provider = provider_id, error = %error, elapsed_ms, "provider lookup failed");
                (
                    ResultGroup {
                        provider_id: provider_id.to_owned(),
                        elapsed_ms,
                        results: Vec::new(),
                        error: Some(error.to_string()),
                    },
                    TaskOutcome::Failed {
                        provider_id: provider_id.to_owned(),
                        error,
                    },
                )
            }
        };

        state.groups.push(group.clone());
        // Sent under the lock so subscribers observe publish order.
        let _ = self.events.send(CoordinatorEvent::GroupPublished { epoch: live, group });
        task_outcome
    }
}

/// The lookup tasks launched by one [`Coordinator::submit`] call.
///
/// Dropping the handle does not stop the tasks.
#[derive(Debug)]
pub struct QueryHandle {
    epoch: QueryEpoch,
    tasks: Vec<(String, JoinHandle<TaskOutcome>)>,
}

impl QueryHandle {
    /// The epoch these tasks were launched under.
    pub fn epoch(&self) -> &QueryEpoch {
        &self.epoch
    }

    /// Number of launched tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks were launched (empty registry).
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task to settle, tolerating individual failures.
    ///
    /// Outcomes are returned in launch order.
    pub async fn settled(self) -> Vec<TaskOutcome> {
        let (ids, handles): (Vec<String>, Vec<JoinHandle<TaskOutcome>>) =
            self.tasks.into_iter().unzip();
        futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(ids)
            .map(|(joined, provider_id)| match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(provider = %provider_id, error = %err, "provider task aborted");
                    TaskOutcome::Aborted { provider_id }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::types::{ProviderDescriptor, SearchResult};
    use async_trait::async_trait;

    struct EchoProvider(ProviderDescriptor);

    #[async_trait]
    impl SearchProvider for EchoProvider {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.0
        }

        async fn search(
            &self,
            query: &str,
            options: &ProviderOptions,
        ) -> Result<Vec<SearchResult>, ProviderError> {
            let suffix = if options.flag("loud") { "!" } else { "" };
            Ok(vec![
                SearchResult::new(format!("{query} one{suffix}"), "https://one.test"),
                SearchResult::new(format!("{query} two{suffix}"), "https://two.test"),
            ])
        }
    }

    fn coordinator() -> Coordinator {
        let registry = ProviderRegistry::builder()
            .register(Arc::new(EchoProvider(ProviderDescriptor::new("echo", "Echo"))))
            .expect("unique")
            .build();
        Coordinator::new(registry, RequestCache::unbounded(), CoordinatorConfig::default())
            .expect("valid config")
    }

    #[test]
    fn invalid_config_rejected() {
        let config = CoordinatorConfig {
            provider_timeout_ms: 0,
            ..Default::default()
        };
        let result = Coordinator::new(ProviderRegistry::default(), RequestCache::unbounded(), config);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn blank_query_is_a_no_op() {
        let coordinator = coordinator();
        assert!(coordinator.submit("   \t ").is_none());
        assert!(coordinator.current_epoch().is_none());
    }

    #[tokio::test]
    async fn submit_normalizes_and_publishes() {
        let coordinator = coordinator();
        let handle = coordinator.submit("  rust   lang ").expect("non-blank");
        assert_eq!(handle.epoch().query(), "rust lang");
        assert_eq!(handle.len(), 1);

        let outcomes = handle.settled().await;
        assert_eq!(
            outcomes,
            vec![TaskOutcome::Published {
                provider_id: "echo".into(),
                results: 2
            }]
        );

        let state = coordinator.snapshot();
        let group = state.group("echo").expect("published");
        assert_eq!(group.results[0].relevance, Some(0));
        assert_eq!(group.results[1].relevance, Some(1));
        assert_eq!(group.results[0].title, "<mark>rust lang</mark> one");
    }

    #[tokio::test]
    async fn each_submission_opens_a_new_epoch() {
        let coordinator = coordinator();
        let first = coordinator.submit("rust").expect("non-blank");
        let second = coordinator.submit("rust").expect("non-blank");
        assert!(second.epoch().generation() > first.epoch().generation());

        let first_outcomes = first.settled().await;
        let _ = second.settled().await;
        assert!(first_outcomes.iter().all(TaskOutcome::is_discarded));
        assert_eq!(coordinator.snapshot().groups.len(), 1);
    }

    #[tokio::test]
    async fn provider_options_reach_the_provider() {
        let coordinator = coordinator();
        coordinator.set_provider_options("echo", ProviderOptions::new().with("loud", "true"));
        assert!(coordinator.provider_options("echo").flag("loud"));
        assert!(coordinator.provider_options("other").is_empty());

        let _ = coordinator.submit("rust").expect("non-blank").settled().await;
        let state = coordinator.snapshot();
        assert!(state.groups[0].results[0].title.ends_with("one!"));
    }

    #[tokio::test]
    async fn subscribers_see_epoch_then_groups() {
        let coordinator = coordinator();
        let mut events = coordinator.subscribe();
        let _ = coordinator.submit("rust").expect("non-blank").settled().await;

        match events.recv().await.expect("event") {
            CoordinatorEvent::EpochStarted { epoch } => assert_eq!(epoch.query(), "rust"),
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.expect("event") {
            CoordinatorEvent::GroupPublished { group, .. } => assert_eq!(group.provider_id, "echo"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_registry_launches_nothing() {
        let coordinator = Coordinator::new(
            ProviderRegistry::default(),
            RequestCache::unbounded(),
            CoordinatorConfig::default(),
        )
        .expect("valid");
        let handle = coordinator.submit("rust").expect("non-blank");
        assert!(handle.is_empty());
        assert!(handle.settled().await.is_empty());
        assert!(coordinator.snapshot().groups.is_empty());
    }
}
