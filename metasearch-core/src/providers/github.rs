//! GitHub issue and pull request search through the REST search API.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CoordinatorConfig;
use crate::error::ProviderError;
use crate::http;
use crate::provider::SearchProvider;
use crate::types::{ProviderDescriptor, ProviderOptions, SearchResult};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Maximum snippet length in characters, before escaping.
const SNIPPET_CHARS: usize = 300;

/// Option restricting results to one repository (`owner/name`).
pub const REPO_OPTION: &str = "repo";

/// Credentials accepted by [`GitHubProvider::init`](SearchProvider::init).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubCredentials {
    /// Personal access token.
    pub token: String,
    /// API root, for GitHub Enterprise installations.
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Clone)]
struct GitHubSession {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

/// GitHub issue search provider.
pub struct GitHubProvider {
    descriptor: ProviderDescriptor,
    http: CoordinatorConfig,
    session: RwLock<Option<GitHubSession>>,
}

impl GitHubProvider {
    pub fn new(http: &CoordinatorConfig) -> Self {
        Self {
            descriptor: ProviderDescriptor::new("github", "GitHub"),
            http: http.clone(),
            session: RwLock::new(None),
        }
    }

    fn session(&self) -> Result<GitHubSession, ProviderError> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| ProviderError::NotInitialized("github".into()))
    }
}

#[async_trait]
impl SearchProvider for GitHubProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn init(&self, credentials: &serde_json::Value) -> Result<(), ProviderError> {
        let credentials: GitHubCredentials = serde_json::from_value(credentials.clone())
            .map_err(|e| ProviderError::Auth(format!("invalid GitHub credentials: {e}")))?;
        let client = http::build_client(&self.http)?;
        let api_base = credentials
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_owned();
        url::Url::parse(&api_base)
            .map_err(|e| ProviderError::Auth(format!("invalid GitHub API base: {e}")))?;

        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(GitHubSession {
            client,
            api_base,
            token: credentials.token,
        });
        tracing::debug!("GitHub provider initialized");
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        options: &ProviderOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let session = self.session()?;
        let q = match options.get(REPO_OPTION).filter(|r| !r.is_empty()) {
            Some(repo) => format!("{query} repo:{repo}"),
            None => query.to_owned(),
        };
        tracing::trace!(query = %q, "GitHub search");

        let response = session
            .client
            .get(format!("{}/search/issues", session.api_base))
            .bearer_auth(&session.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[("q", q.as_str()), ("per_page", "100")])
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("GitHub request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("GitHub", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("GitHub response read failed: {e}")))?;

        parse_github_response(&body)
    }
}

#[derive(Deserialize)]
struct GitHubSearchResponse {
    items: Vec<GitHubIssue>,
}

#[derive(Deserialize)]
struct GitHubIssue {
    title: String,
    html_url: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_owned(),
    }
}

/// Parse a GitHub issue search response body into results.
pub(crate) fn parse_github_response(body: &str) -> Result<Vec<SearchResult>, ProviderError> {
    let response: GitHubSearchResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("GitHub search response: {e}")))?;

    let results: Vec<SearchResult> = response
        .items
        .into_iter()
        .map(|issue| SearchResult {
            title: http::escape_html(&issue.title),
            url: issue.html_url,
            snippet: issue
                .body
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(|b| http::escape_html(&truncate_chars(b, SNIPPET_CHARS))),
            modified: issue
                .updated_at
                .as_deref()
                .and_then(|u| chrono::DateTime::parse_from_rfc3339(u).ok())
                .map(|dt| dt.timestamp()),
            relevance: None,
            comments: None,
        })
        .collect();

    tracing::debug!(count = results.len(), "GitHub results parsed");
    Ok(results)
}
