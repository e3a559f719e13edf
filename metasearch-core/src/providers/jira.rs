//! Jira issue search through the REST API v2.
//!
//! Queries `GET <origin>/rest/api/2/search` with a JQL text search and the
//! rendered (HTML) description of each issue as the snippet.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CoordinatorConfig;
use crate::error::ProviderError;
use crate::http;
use crate::provider::SearchProvider;
use crate::types::{Capability, ProviderDescriptor, ProviderOptions, ResultComment, SearchResult};

/// Option flag that extends the search to comment bodies.
pub const INCLUDE_COMMENTS: &str = "includeComments";

/// Maximum issues requested per search.
const MAX_RESULTS: &str = "100";

/// Characters with special meaning in Jira text search.
///
/// See "Search syntax for text fields" in the Jira documentation.
const RESERVED: &[char] = &[
    '+', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '~', '*', '?', '\\', ':',
];

/// Credentials accepted by [`JiraProvider::init`](SearchProvider::init).
#[derive(Debug, Clone, Deserialize)]
pub struct JiraCredentials {
    /// Site origin, e.g. `https://jira.example.com`.
    pub origin: String,
    /// Account user name.
    pub user: String,
    /// API token or password.
    pub token: String,
}

#[derive(Clone)]
struct JiraSession {
    client: reqwest::Client,
    origin: String,
    user: String,
    token: String,
}

/// Jira issue search provider.
pub struct JiraProvider {
    descriptor: ProviderDescriptor,
    http: CoordinatorConfig,
    session: RwLock<Option<JiraSession>>,
}

impl JiraProvider {
    /// Create an uninitialized provider. HTTP clients use `http`'s timeout
    /// and User-Agent.
    pub fn new(http: &CoordinatorConfig) -> Self {
        Self {
            descriptor: ProviderDescriptor::new("jira", "Jira")
                .with_capability(Capability::SupportsComments)
                .with_capability(Capability::VerboseSnippet),
            http: http.clone(),
            session: RwLock::new(None),
        }
    }

    fn session(&self) -> Result<JiraSession, ProviderError> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| ProviderError::NotInitialized("jira".into()))
    }
}

#[async_trait]
impl SearchProvider for JiraProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn init(&self, credentials: &serde_json::Value) -> Result<(), ProviderError> {
        let credentials: JiraCredentials = serde_json::from_value(credentials.clone())
            .map_err(|e| ProviderError::Auth(format!("invalid Jira credentials: {e}")))?;
        url::Url::parse(&credentials.origin)
            .map_err(|e| ProviderError::Auth(format!("invalid Jira origin: {e}")))?;
        let client = http::build_client(&self.http)?;

        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(JiraSession {
            client,
            origin: credentials.origin.trim_end_matches('/').to_owned(),
            user: credentials.user,
            token: credentials.token,
        });
        tracing::debug!("Jira provider initialized");
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        options: &ProviderOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let session = self.session()?;
        let include_comments = options.flag(INCLUDE_COMMENTS);
        let jql = build_jql(query, include_comments);
        tracing::trace!(query, %jql, "Jira search");

        let response = session
            .client
            .get(format!("{}/rest/api/2/search", session.origin))
            .basic_auth(&session.user, Some(&session.token))
            .query(&[
                ("expand", "renderedFields"),
                ("fields", "summary,updated,description,comment"),
                ("jql", jql.as_str()),
                ("maxResults", MAX_RESULTS),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Jira request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("Jira", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Jira response read failed: {e}")))?;
        tracing::trace!(bytes = body.len(), "Jira response received");

        parse_jira_response(&body, &session.origin, include_comments)
    }
}

/// Strip reserved characters, escape quotes and collapse whitespace.
fn sanitize(query: &str) -> String {
    let stripped: String = query.chars().filter(|c| !RESERVED.contains(c)).collect();
    stripped
        .replace('"', "\\\"")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the JQL clause for a text search.
fn build_jql(query: &str, include_comments: bool) -> String {
    let q = sanitize(query);
    if include_comments {
        format!(r#"(comment ~ "{q}" OR text ~ "{q}")"#)
    } else {
        format!(r#"text ~ "{q}""#)
    }
}

/// Parse Jira's `updated` timestamp, e.g. `2017-11-20T11:50:25.653-0500`.
fn parse_updated(updated: &str) -> Option<i64> {
    chrono::DateTime::parse_from_str(updated, "%Y-%m-%dT%H:%M:%S%.f%z")
        .ok()
        .map(|dt| dt.timestamp())
}

#[derive(Deserialize)]
struct JiraSearchResponse {
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraIssue {
    key: String,
    fields: JiraFields,
    #[serde(default)]
    rendered_fields: Option<JiraRenderedFields>,
}

#[derive(Deserialize)]
struct JiraFields {
    summary: String,
    #[serde(default)]
    updated: Option<String>,
}

#[derive(Deserialize)]
struct JiraRenderedFields {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    comment: Option<JiraRenderedComments>,
}

#[derive(Deserialize)]
struct JiraRenderedComments {
    comments: Vec<JiraRenderedComment>,
}

#[derive(Deserialize)]
struct JiraRenderedComment {
    author: JiraAuthor,
    body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraAuthor {
    display_name: String,
}

/// Parse a Jira search response body into results.
///
/// Extracted as a separate function for testability with canned JSON.
pub(crate) fn parse_jira_response(
    body: &str,
    origin: &str,
    include_comments: bool,
) -> Result<Vec<SearchResult>, ProviderError> {
    let response: JiraSearchResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("Jira search response: {e}")))?;

    let results: Vec<SearchResult> = response
        .issues
        .into_iter()
        .map(|issue| {
            let rendered = issue.rendered_fields;
            let snippet = rendered
                .as_ref()
                .and_then(|r| r.description.clone())
                .filter(|d| !d.trim().is_empty());
            let comments = if include_comments {
                rendered.and_then(|r| r.comment).map(|c| {
                    c.comments
                        .into_iter()
                        .map(|comment| ResultComment {
                            author: comment.author.display_name,
                            body: comment.body,
                        })
                        .collect()
                })
            } else {
                None
            };

            SearchResult {
                title: http::escape_html(&format!("{}: {}", issue.key, issue.fields.summary)),
                url: format!("{origin}/browse/{}", issue.key),
                snippet,
                modified: issue.fields.updated.as_deref().and_then(parse_updated),
                relevance: None,
                comments,
            }
        })
        .collect();

    tracing::debug!(count = results.len(), "Jira results parsed");
    Ok(results)
}
