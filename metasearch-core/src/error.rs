//! Error types for the metasearch-core crate.
//!
//! Provider failures are isolated: the coordinator converts every
//! [`ProviderError`] into an empty result group, so these messages reach
//! logs, never end users. No credentials appear in error messages.

/// Errors raised by a single provider lookup.
///
/// `Clone` because a failed lookup is cached and replayed to every caller
/// sharing the same request key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The request could not be sent or the provider answered with a non-success status.
    #[error("network error: {0}")]
    Network(String),

    /// The provider rejected the configured credentials.
    #[error("auth error: {0}")]
    Auth(String),

    /// The provider answered with a body that does not match its documented shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The provider did not answer within the configured timeout.
    #[error("provider timed out: {0}")]
    Timeout(String),

    /// The provider was used before its credentials were configured.
    #[error("provider not initialized: {0}")]
    NotInitialized(String),

    /// The provider's search panicked.
    #[error("provider panicked: {0}")]
    Panicked(String),
}

/// Errors raised while assembling or configuring the search engine.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Invalid coordinator or provider configuration.
    #[error("config error: {0}")]
    Config(String),

    /// No provider with this id is registered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Two providers were registered under the same id.
    #[error("duplicate provider id: {0}")]
    DuplicateProvider(String),

    /// A provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Convenience type alias for metasearch-core results.
pub type Result<T> = std::result::Result<T, SearchError>;
