//! Request cache: memoized provider lookups.
//!
//! Lookups are keyed by a deterministic serialization of
//! `(provider id, query text, options)`. The first caller for a key runs
//! the lookup; concurrent callers with the same key wait on that same
//! in-flight lookup through [`moka`]'s coalescing `get_with`, and later
//! callers receive the stored outcome. Failures are stored too, so a
//! repeated query replays the same failure instead of retrying.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use moka::future::Cache;
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::provider::SearchProvider;
use crate::types::{ProviderOptions, SearchResult};

/// The outcome of one provider lookup, as stored in the cache.
pub type Lookup = Result<Vec<SearchResult>, ProviderError>;

/// Session-scoped memoization of provider lookups.
///
/// Cloning is cheap; clones share the same storage.
#[derive(Clone)]
pub struct RequestCache {
    inner: Cache<String, Lookup>,
}

impl RequestCache {
    /// Create a cache. `capacity` bounds the number of stored lookups;
    /// `None` never evicts.
    pub fn new(capacity: Option<u64>) -> Self {
        let mut builder = Cache::builder();
        if let Some(max) = capacity {
            builder = builder.max_capacity(max);
        }
        Self {
            inner: builder.build(),
        }
    }

    /// An unbounded cache that keeps every lookup for the session.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Return the outcome for this key, running `lookup` only if no call for
    /// the key has been made yet.
    ///
    /// `lookup` is not polled when the key is already present or in flight.
    pub async fn get<F>(
        &self,
        provider_id: &str,
        query: &str,
        options: &ProviderOptions,
        lookup: F,
    ) -> Lookup
    where
        F: Future<Output = Lookup>,
    {
        let key = cache_key(provider_id, query, options);
        self.inner.get_with(key, lookup).await
    }

    /// Run `provider`'s search through the cache.
    ///
    /// A search that takes longer than `timeout` fails with
    /// [`ProviderError::Timeout`], and a search that panics fails with
    /// [`ProviderError::Panicked`]. Both are cached like any other failure.
    pub async fn search(
        &self,
        provider: &Arc<dyn SearchProvider>,
        query: &str,
        options: &ProviderOptions,
        timeout: Duration,
    ) -> Lookup {
        let lookup = async {
            let guarded = AssertUnwindSafe(provider.search(query, options)).catch_unwind();
            match tokio::time::timeout(timeout, guarded).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(panic)) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(provider = provider.id(), panic = %message, "provider search panicked");
                    Err(ProviderError::Panicked(format!("{}: {message}", provider.id())))
                }
                Err(_) => Err(ProviderError::Timeout(format!(
                    "{} after {}ms",
                    provider.id(),
                    timeout.as_millis()
                ))),
            }
        };
        self.get(provider.id(), query, options, lookup).await
    }

    /// Whether an outcome is stored for this key.
    pub async fn contains(&self, provider_id: &str, query: &str, options: &ProviderOptions) -> bool {
        self.inner
            .get(&cache_key(provider_id, query, options))
            .await
            .is_some()
    }

    /// Approximate number of stored lookups.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Serialize the request tuple as a JSON array.
///
/// Options iterate in key order, so equal option sets always produce the
/// same key.
pub fn cache_key(provider_id: &str, query: &str, options: &ProviderOptions) -> String {
    let options: Map<String, Value> = options
        .iter()
        .map(|(k, v)| (k.to_owned(), Value::from(v)))
        .collect();
    Value::Array(vec![
        Value::from(provider_id),
        Value::from(query),
        Value::Object(options),
    ])
    .to_string()
}
