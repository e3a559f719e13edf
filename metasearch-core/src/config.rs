//! Engine configuration with sensible defaults.
//!
//! [`CoordinatorConfig`] controls provider timeouts, the request cache bound
//! and outgoing HTTP behaviour.

use std::time::Duration;

use crate::error::SearchError;

/// Configuration for the query coordinator and the providers it drives.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Per-provider lookup timeout in milliseconds. A lookup that exceeds it
    /// fails with [`crate::ProviderError::Timeout`].
    pub provider_timeout_ms: u64,
    /// Maximum number of request-cache entries. `None` keeps every lookup
    /// for the lifetime of the session.
    pub cache_capacity: Option<u64>,
    /// Custom User-Agent for provider HTTP clients. If `None`, a
    /// `metasearch/<version>` agent is sent.
    pub user_agent: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 10_000,
            cache_capacity: None,
            user_agent: None,
        }
    }
}

impl CoordinatorConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `provider_timeout_ms` must be greater than 0
    /// - `cache_capacity`, when set, must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.provider_timeout_ms == 0 {
            return Err(SearchError::Config(
                "provider_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.cache_capacity == Some(0) {
            return Err(SearchError::Config(
                "cache_capacity must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// The provider timeout as a [`Duration`].
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}
