//! Core types shared by providers, the coordinator and its observers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A capability flag advertised by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// The provider can search comment bodies when asked via the
    /// `includeComments` option.
    SupportsComments,
    /// The provider returns long, rendered snippets that front ends may collapse.
    VerboseSnippet,
}

impl Capability {
    /// Returns the stable flag name, e.g. `"supports-comments"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SupportsComments => "supports-comments",
            Self::VerboseSnippet => "verbose-snippet",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique, stable identifier (used in cache keys and API parameters).
    pub id: String,
    /// Human-readable display name; the registry orders providers by it.
    pub name: String,
    /// Capability flags.
    pub capabilities: BTreeSet<Capability>,
}

impl ProviderDescriptor {
    /// Create a descriptor with no capabilities.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Add a capability flag.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Whether this provider advertises `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// A comment excerpt attached to a result (e.g. Jira issue comments).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultComment {
    /// Display name of the comment author.
    pub author: String,
    /// Rendered comment body (HTML fragment).
    pub body: String,
}

/// A single result returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title as an HTML-safe fragment.
    pub title: String,
    /// Link to the result.
    pub url: String,
    /// Optional HTML-safe snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Last modification time in Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<i64>,
    /// Position within the provider's own response (lower is better).
    /// Assigned by the coordinator; not comparable across providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<u32>,
    /// Comment excerpts, when the provider was asked to include them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<ResultComment>>,
}

impl SearchResult {
    /// Create a result with only a title and URL.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: None,
            modified: None,
            relevance: None,
            comments: None,
        }
    }

    /// Attach a snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Attach a modification timestamp (Unix seconds).
    pub fn with_modified(mut self, modified: i64) -> Self {
        self.modified = Some(modified);
        self
    }
}

/// The results one provider returned for one query epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultGroup {
    /// Id of the provider that produced this group.
    pub provider_id: String,
    /// Wall-clock duration of the provider call in milliseconds.
    pub elapsed_ms: u64,
    /// Results in provider order.
    pub results: Vec<SearchResult>,
    /// Failure recorded for observability; the group is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Provider-specific query options, e.g. `includeComments=true`.
///
/// Backed by an ordered map so serialization is deterministic, which the
/// request cache relies on for its keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderOptions(BTreeMap<String, String>);

impl ProviderOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up an option value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` only when the option is present and equal to `"true"`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    /// Flip a boolean option, storing it explicitly as `"true"` / `"false"`.
    pub fn toggle_flag(&mut self, key: &str) -> bool {
        let enabled = !self.flag(key);
        self.insert(key, if enabled { "true" } else { "false" });
        enabled
    }

    /// Whether no options are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProviderOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
