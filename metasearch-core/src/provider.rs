//! Trait definition for pluggable search providers.
//!
//! Each provider (Jira, GitHub, ...) implements [`SearchProvider`] to
//! translate the common query into its native syntax and its native
//! response into [`SearchResult`] values.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ProviderDescriptor, ProviderOptions, SearchResult};

/// A pluggable search provider.
///
/// Implementors are thin authenticated HTTP clients. Each one handles its own:
///
/// - credential handling (via [`init`](Self::init))
/// - query sanitisation and native query syntax
/// - HTTP request with appropriate auth headers
/// - response decoding into [`SearchResult`] values
///
/// Providers never assign `relevance` and never highlight; the coordinator
/// does both. All implementations must be `Send + Sync` so the registry can
/// hand them to concurrent lookup tasks.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the static descriptor for this provider.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Returns the provider id. Delegates to [`descriptor`](Self::descriptor).
    fn id(&self) -> &str {
        &self.descriptor().id
    }

    /// Configure provider-specific credentials.
    ///
    /// Must be called before [`search`](Self::search) for providers that need
    /// credentials. Calling it again replaces the previous configuration.
    /// Providers without credentials accept anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Auth`] if the credentials cannot be decoded.
    fn init(&self, credentials: &serde_json::Value) -> Result<(), ProviderError> {
        let _ = credentials;
        Ok(())
    }

    /// Run a search and return results in provider order.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotInitialized`] if credentials are missing,
    /// and a network, auth or malformed-response error if the call fails.
    async fn search(
        &self,
        query: &str,
        options: &ProviderOptions,
    ) -> Result<Vec<SearchResult>, ProviderError>;
}
