//! Integration tests for the coordinator pipeline.
//!
//! Providers are scripted in-process with fixed delays; the Tokio clock is
//! paused so completion order and elapsed times are deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metasearch_core::{
    ranked_groups, Coordinator, CoordinatorConfig, CoordinatorEvent, ProviderDescriptor,
    ProviderError, ProviderOptions, ProviderRegistry, ProviderStatus, RequestCache,
    SearchProvider, SearchResult, SortMode, TaskOutcome,
};

struct ScriptedProvider {
    descriptor: ProviderDescriptor,
    delay: Duration,
    outcome: Result<Vec<SearchResult>, ProviderError>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(id: &str, name: &str, delay_ms: u64, results: Vec<SearchResult>) -> Arc<Self> {
        Arc::new(Self {
            descriptor: ProviderDescriptor::new(id, name),
            delay: Duration::from_millis(delay_ms),
            outcome: Ok(results),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(id: &str, name: &str, delay_ms: u64, error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            descriptor: ProviderDescriptor::new(id, name),
            delay: Duration::from_millis(delay_ms),
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn search(
        &self,
        _query: &str,
        _options: &ProviderOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }
}

fn registry(providers: &[Arc<ScriptedProvider>]) -> ProviderRegistry {
    providers
        .iter()
        .try_fold(ProviderRegistry::builder(), |builder, provider| {
            builder.register(Arc::clone(provider) as Arc<dyn SearchProvider>)
        })
        .expect("unique provider ids")
        .build()
}

fn coordinator(providers: &[Arc<ScriptedProvider>]) -> Coordinator {
    Coordinator::new(
        registry(providers),
        RequestCache::unbounded(),
        CoordinatorConfig::default(),
    )
    .expect("valid config")
}

#[tokio::test(start_paused = true)]
async fn groups_publish_in_completion_order() {
    let alpha = ScriptedProvider::new(
        "a",
        "A",
        50,
        vec![SearchResult::new("Alpha", "https://a.test/1").with_modified(100)],
    );
    let beta = ScriptedProvider::new(
        "b",
        "B",
        10,
        vec![SearchResult::new("Beta", "https://b.test/1").with_modified(200)],
    );
    let coordinator = coordinator(&[alpha, beta]);
    let mut events = coordinator.subscribe();

    let _ = coordinator.submit("letters").expect("non-blank").settled().await;

    let state = coordinator.snapshot();
    let order: Vec<&str> = state.groups.iter().map(|g| g.provider_id.as_str()).collect();
    assert_eq!(order, vec!["b", "a"]);
    assert_eq!(state.groups[0].elapsed_ms, 10);
    assert_eq!(state.groups[1].elapsed_ms, 50);

    assert!(matches!(
        events.recv().await.expect("event"),
        CoordinatorEvent::EpochStarted { .. }
    ));
    for expected in ["b", "a"] {
        match events.recv().await.expect("event") {
            CoordinatorEvent::GroupPublished { group, .. } => {
                assert_eq!(group.provider_id, expected)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    let rendered: Vec<String> = ranked_groups(&state.groups, SortMode::Recent, &[])
        .into_iter()
        .flat_map(|g| g.results.into_iter().map(|r| r.title))
        .collect();
    assert_eq!(rendered, vec!["Beta", "Alpha"]);
}

#[tokio::test(start_paused = true)]
async fn superseded_query_never_publishes() {
    let slow = ScriptedProvider::new(
        "slow",
        "Slow",
        100,
        vec![SearchResult::new("Result", "https://slow.test/1")],
    );
    let coordinator = coordinator(&[Arc::clone(&slow)]);
    let mut events = coordinator.subscribe();

    let first = coordinator.submit("first query").expect("non-blank");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = coordinator.submit("second query").expect("non-blank");

    let first_outcomes = first.settled().await;
    let second_outcomes = second.settled().await;

    assert!(first_outcomes.iter().all(TaskOutcome::is_discarded));
    assert_eq!(
        second_outcomes,
        vec![TaskOutcome::Published {
            provider_id: "slow".into(),
            results: 1
        }]
    );
    // Superseded lookups still run to completion.
    assert_eq!(slow.calls(), 2);

    let state = coordinator.snapshot();
    assert_eq!(state.epoch.as_ref().map(|e| e.query()), Some("second query"));
    assert_eq!(state.groups.len(), 1);

    let mut published = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoordinatorEvent::GroupPublished { epoch, .. } = event {
            published.push(epoch.query().to_owned());
        }
    }
    assert_eq!(published, vec!["second query"]);
}

#[tokio::test(start_paused = true)]
async fn provider_failure_is_isolated() {
    let broken = ScriptedProvider::failing(
        "a",
        "A",
        5,
        ProviderError::Network("connection refused".into()),
    );
    let healthy = ScriptedProvider::new(
        "b",
        "B",
        15,
        vec![SearchResult::new("Beta", "https://b.test/1")],
    );
    let coordinator = coordinator(&[broken, healthy]);

    let outcomes = coordinator.submit("rust").expect("non-blank").settled().await;
    assert!(matches!(
        &outcomes[0],
        TaskOutcome::Failed { provider_id, error: ProviderError::Network(_) } if provider_id == "a"
    ));

    let state = coordinator.snapshot();
    assert_eq!(state.groups.len(), 2);
    let non_empty: Vec<&str> = state
        .groups
        .iter()
        .filter(|g| !g.results.is_empty())
        .map(|g| g.provider_id.as_str())
        .collect();
    assert_eq!(non_empty, vec!["b"]);
    assert!(state.group("a").and_then(|g| g.error.as_ref()).is_some());
    assert_eq!(state.status("a"), ProviderStatus::NoResults);
    assert_eq!(state.status("b"), ProviderStatus::Results(1));
}

struct PanickingProvider(ProviderDescriptor);

#[async_trait]
impl SearchProvider for PanickingProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.0
    }

    async fn search(
        &self,
        _query: &str,
        _options: &ProviderOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let issues: Vec<SearchResult> = Vec::new();
        Ok(vec![issues[0].clone()])
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_provider_publishes_empty_group() {
    let healthy = ScriptedProvider::new(
        "b",
        "B",
        15,
        vec![SearchResult::new("Beta", "https://b.test/1")],
    );
    let registry = ProviderRegistry::builder()
        .register(Arc::new(PanickingProvider(ProviderDescriptor::new("boom", "Boom"))))
        .and_then(|builder| builder.register(healthy as Arc<dyn SearchProvider>))
        .expect("unique provider ids")
        .build();
    let coordinator = Coordinator::new(registry, RequestCache::unbounded(), CoordinatorConfig::default())
        .expect("valid config");

    let outcomes = coordinator.submit("rust").expect("non-blank").settled().await;
    assert!(outcomes.iter().any(|o| matches!(
        o,
        TaskOutcome::Failed { provider_id, error: ProviderError::Panicked(_) } if provider_id == "boom"
    )));

    let state = coordinator.snapshot();
    assert_eq!(state.groups.len(), 2);
    let boom = state.group("boom").expect("group published for panicking provider");
    assert!(boom.results.is_empty());
    assert!(boom.error.as_deref().is_some_and(|e| e.contains("panicked")));
    assert_eq!(state.status("boom"), ProviderStatus::NoResults);
    assert_eq!(state.status("b"), ProviderStatus::Results(1));
}

#[tokio::test(start_paused = true)]
async fn failures_are_replayed_from_cache() {
    let broken = ScriptedProvider::failing("a", "A", 5, ProviderError::Auth("401".into()));
    let coordinator = coordinator(&[Arc::clone(&broken)]);

    let _ = coordinator.submit("rust").expect("non-blank").settled().await;
    let again = coordinator.submit("rust").expect("non-blank").settled().await;

    assert_eq!(broken.calls(), 1);
    assert!(matches!(again[0], TaskOutcome::Failed { .. }));
    assert_eq!(coordinator.snapshot().groups.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_lookups_share_one_call() {
    let provider = ScriptedProvider::new(
        "a",
        "A",
        30,
        vec![SearchResult::new("Shared", "https://a.test/1")],
    );
    let cache = RequestCache::unbounded();
    let first = Coordinator::new(
        registry(&[Arc::clone(&provider)]),
        cache.clone(),
        CoordinatorConfig::default(),
    )
    .expect("valid config");
    let second = Coordinator::new(
        registry(&[Arc::clone(&provider)]),
        cache.clone(),
        CoordinatorConfig::default(),
    )
    .expect("valid config");

    let a = first.submit("rust").expect("non-blank");
    let b = second.submit("rust").expect("non-blank");
    let (a, b) = tokio::join!(a.settled(), b.settled());

    assert_eq!(provider.calls(), 1);
    assert_eq!(a, b);
    assert_eq!(first.snapshot().groups[0].results, second.snapshot().groups[0].results);
    assert!(cache.contains("a", "rust", &ProviderOptions::new()).await);
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out() {
    let stuck = ScriptedProvider::new(
        "a",
        "A",
        60_000,
        vec![SearchResult::new("Late", "https://a.test/1")],
    );
    let config = CoordinatorConfig {
        provider_timeout_ms: 100,
        ..Default::default()
    };
    let coordinator = Coordinator::new(registry(&[stuck]), RequestCache::unbounded(), config)
        .expect("valid config");

    let outcomes = coordinator.submit("rust").expect("non-blank").settled().await;
    assert!(matches!(
        &outcomes[0],
        TaskOutcome::Failed { error: ProviderError::Timeout(_), .. }
    ));

    let group = coordinator.snapshot().groups.remove(0);
    assert!(group.results.is_empty());
    assert!(group.elapsed_ms >= 100 && group.elapsed_ms < 200);
}

#[tokio::test(start_paused = true)]
async fn separated_words_highlight_as_one_span() {
    let provider = ScriptedProvider::new(
        "a",
        "A",
        1,
        vec![SearchResult::new("Widgets", "https://a.test/1").with_snippet("uses foo-bar here")],
    );
    let coordinator = coordinator(&[provider]);

    let _ = coordinator.submit("foo bar").expect("non-blank").settled().await;

    let state = coordinator.snapshot();
    let result = &state.groups[0].results[0];
    assert_eq!(result.snippet.as_deref(), Some("uses <mark>foo-bar</mark> here"));
    assert_eq!(result.title, "Widgets");
    assert_eq!(result.relevance, Some(0));
}
