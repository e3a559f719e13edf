//! HTTP query surface for browser front ends.
//!
//! ## Endpoints
//!
//! - `GET /api/engines`: registered providers, ordered by name
//! - `GET /api/info`: footer HTML and available sort modes
//! - `GET /api/search?engine=<id>&q=<text>&<options>`: one provider's results
//!   as a JSON array, through the shared request cache
//! - `GET /api/stream?q=<text>&sort=<mode>&<id>.<option>=<value>`: server-sent
//!   events, one `group` event per provider in completion order, then `done`
//!
//! All requests share one registry and one request cache.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use futures_util::stream::{Stream, StreamExt};
use metasearch_core::coordinator::normalize_query;
use metasearch_core::{
    Coordinator, CoordinatorConfig, ProviderDescriptor, ProviderOptions, ProviderRegistry,
    RequestCache, ResultGroup, SearchResult, SortMode, rank,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{MetasearchError, Result};
use crate::stream::search_groups;

/// Query parameter appended by browsers to defeat HTTP caches.
const CACHE_BUSTER: &str = "_";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message. Never contains provider internals.
    pub error: String,
}

/// Response from `GET /api/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    /// Footer HTML from the server configuration.
    pub footer: Option<String>,
    /// Available sort modes.
    pub sort_modes: Vec<SortModeInfo>,
}

/// One sort mode as listed by `GET /api/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortModeInfo {
    /// Identifier accepted by `sort=`.
    pub id: String,
    /// Display label.
    pub name: String,
}

/// Payload of a `group` server-sent event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    /// Provider id.
    pub provider_id: String,
    /// Provider display name.
    pub name: String,
    /// Wall-clock time of the lookup in milliseconds.
    pub elapsed_ms: u64,
    /// Results, ordered by the requested sort mode. A failed lookup is an
    /// empty list; failure details stay in the server log.
    pub results: Vec<SearchResult>,
}

impl GroupPayload {
    fn new(group: &ResultGroup, descriptor: Option<&ProviderDescriptor>, sort: SortMode) -> Self {
        Self {
            provider_id: group.provider_id.clone(),
            name: descriptor.map_or_else(|| group.provider_id.clone(), |d| d.name.clone()),
            elapsed_ms: group.elapsed_ms,
            results: rank(&group.results, sort).into_iter().cloned().collect(),
        }
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared by every request.
#[derive(Clone)]
pub struct ServerState {
    registry: ProviderRegistry,
    cache: RequestCache,
    coordinator: CoordinatorConfig,
    footer: Option<String>,
}

impl ServerState {
    /// Bundle the registry, the shared cache and coordinator settings.
    pub fn new(
        registry: ProviderRegistry,
        cache: RequestCache,
        coordinator: CoordinatorConfig,
        footer: Option<String>,
    ) -> Self {
        Self {
            registry,
            cache,
            coordinator,
            footer,
        }
    }
}

/// Build the API router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/engines", get(handle_engines))
        .route("/api/info", get(handle_info))
        .route("/api/search", get(handle_search))
        .route("/api/stream", get(handle_stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// SearchServer
// ---------------------------------------------------------------------------

/// The metasearch HTTP server, serving in a background task.
pub struct SearchServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl SearchServer {
    /// Bind to `{config.host}:{config.port}` (port `0` auto-assigns) and
    /// begin serving.
    ///
    /// # Errors
    ///
    /// Returns [`MetasearchError::Server`] if the listener cannot bind.
    pub async fn start(state: ServerState, config: &ServerConfig) -> Result<Self> {
        let app = router(state);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| MetasearchError::Server(format!("bind {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| MetasearchError::Server(format!("failed to get local addr: {e}")))?;

        info!("metasearch listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("metasearch server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    /// Serve until the task ends.
    ///
    /// # Errors
    ///
    /// Returns [`MetasearchError::Server`] if the server task panicked.
    pub async fn wait(mut self) -> Result<()> {
        (&mut self.handle).await.or_else(|e| {
            if e.is_cancelled() {
                Ok(())
            } else {
                Err(MetasearchError::Server(format!("server task failed: {e}")))
            }
        })
    }
}

impl Drop for SearchServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /api/engines`
async fn handle_engines(State(state): State<ServerState>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.registry.list().into_iter().cloned().collect())
}

/// `GET /api/info`
async fn handle_info(State(state): State<ServerState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        footer: state.footer.clone(),
        sort_modes: SortMode::all()
            .iter()
            .map(|mode| SortModeInfo {
                id: mode.id().to_owned(),
                name: mode.name().to_owned(),
            })
            .collect(),
    })
}

/// `GET /api/search`
async fn handle_search(
    State(state): State<ServerState>,
    Query(mut params): Query<BTreeMap<String, String>>,
) -> std::result::Result<Json<Vec<SearchResult>>, ApiError> {
    params.remove(CACHE_BUSTER);
    let engine = params
        .remove("engine")
        .ok_or_else(|| ApiError::bad_request("missing engine"))?;
    let query = params
        .remove("q")
        .as_deref()
        .and_then(normalize_query)
        .ok_or_else(|| ApiError::bad_request("missing query"))?;
    let provider = state
        .registry
        .get(&engine)
        .map_err(|e| ApiError::new(StatusCode::NOT_FOUND, e.to_string()))?;
    let options: ProviderOptions = params.into_iter().collect();

    tracing::trace!(engine = %engine, query = %query, "api search");
    match state
        .cache
        .search(&provider, &query, &options, state.coordinator.provider_timeout())
        .await
    {
        Ok(results) => Ok(Json(results)),
        Err(e) => {
            tracing::warn!(engine = %engine, error = %e, "api search failed");
            Err(ApiError::new(StatusCode::BAD_GATEWAY, "search failed"))
        }
    }
}

/// Split `<id>.<option>=<value>` parameters into per-provider options.
fn provider_options(params: &BTreeMap<String, String>) -> BTreeMap<String, ProviderOptions> {
    let mut options: BTreeMap<String, ProviderOptions> = BTreeMap::new();
    for (key, value) in params {
        if let Some((engine, option)) = key.split_once('.')
            && !engine.is_empty()
            && !option.is_empty()
        {
            options
                .entry(engine.to_owned())
                .or_default()
                .insert(option, value.clone());
        }
    }
    options
}

/// `GET /api/stream`
async fn handle_stream(
    State(state): State<ServerState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, ApiError>
{
    let sort = match params.get("sort") {
        Some(sort) => sort
            .parse::<SortMode>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => SortMode::default(),
    };
    let query = params.get("q").map(String::as_str).unwrap_or_default();

    let coordinator = Coordinator::new(
        state.registry.clone(),
        state.cache.clone(),
        state.coordinator.clone(),
    )
    .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    for (engine, options) in provider_options(&params) {
        coordinator.set_provider_options(engine, options);
    }

    let groups =
        search_groups(&coordinator, query).ok_or_else(|| ApiError::bad_request("missing query"))?;
    let registry = state.registry.clone();

    let sse_stream = async_stream::stream! {
        tokio::pin!(groups);
        while let Some(group) = groups.next().await {
            let payload = GroupPayload::new(&group, registry.descriptor(&group.provider_id), sort);
            if let Ok(json) = serde_json::to_string(&payload) {
                yield Ok(Event::default().event("group").data(json));
            }
        }
        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}
