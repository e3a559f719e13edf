//! Shared HTTP client construction for provider adapters.

use crate::config::CoordinatorConfig;
use crate::error::ProviderError;

/// User-Agent sent when the configuration does not override it.
const DEFAULT_USER_AGENT: &str = concat!("metasearch/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] configured for provider API calls.
///
/// The client has:
/// - Timeout from config (the coordinator enforces the same bound around
///   the whole lookup; this one covers direct adapter use)
/// - Custom User-Agent if configured, otherwise `metasearch/<version>`
/// - gzip decompression
///
/// # Errors
///
/// Returns [`ProviderError::Network`] if the client cannot be constructed.
pub fn build_client(config: &CoordinatorConfig) -> Result<reqwest::Client, ProviderError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(config.provider_timeout())
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {e}")))
}

/// Map a non-success HTTP status into the provider error taxonomy.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode) -> ProviderError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        ProviderError::Auth(format!("{provider} rejected credentials (HTTP {status})"))
    } else {
        ProviderError::Network(format!("{provider} HTTP error: {status}"))
    }
}

/// Escape text for inclusion in an HTML fragment.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
