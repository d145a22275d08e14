//! API request handlers
//!
//! Every handler takes a fresh snapshot through `KnowledgeBaseHandle::query()`
//! so one request always sees one consistent knowledge base.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::knowledge_base::{KnowledgeBaseHandle, QueryError};
use crate::types::KnowledgeBaseStats;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub kb: KnowledgeBaseHandle,
}

impl ApiState {
    pub fn new(kb: KnowledgeBaseHandle) -> Self {
        Self { kb }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ContextParams {
    #[serde(default)]
    pub q: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub context: String,
}

/// GET /api/v1/health
pub async fn get_health(State(state): State<ApiState>) -> Response {
    let stats: KnowledgeBaseStats = state.kb.snapshot().stats();
    ApiResponse::ok(stats)
}

/// GET /api/v1/categories
pub async fn list_categories(State(state): State<ApiState>) -> Response {
    let query = state.kb.query();
    let categories: Vec<&str> = query.list_categories().collect();
    ApiResponse::ok(categories)
}

/// GET /api/v1/categories/:name
///
/// Unknown categories return 200 with an empty list.
pub async fn get_category(State(state): State<ApiState>, Path(name): Path<String>) -> Response {
    let query = state.kb.query();
    ApiResponse::ok(query.by_category(&name))
}

/// GET /api/v1/tags/:tag
pub async fn get_tag(State(state): State<ApiState>, Path(tag): Path<String>) -> Response {
    let query = state.kb.query();
    ApiResponse::ok(query.by_tag(&tag))
}

/// GET /api/v1/search?q=&limit=
pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, QueryError> {
    let hits = state.kb.query().search_top(&params.q, params.limit)?;
    debug!(keyword = %params.q, hits = hits.len(), "Search served");
    Ok(ApiResponse::ok(hits))
}

/// GET /api/v1/context?q=&top_k=
pub async fn compose_context(
    State(state): State<ApiState>,
    Query(params): Query<ContextParams>,
) -> Result<Response, QueryError> {
    let context = state.kb.query().compose_context(&params.q, params.top_k)?;
    Ok(ApiResponse::ok(ContextResponse { context }))
}

/// POST /api/v1/reload
///
/// Rebuilds on a blocking thread. A failed rebuild returns 422 with the
/// offending document and leaves the current snapshot in place.
pub async fn reload(State(state): State<ApiState>) -> Response {
    let kb = state.kb.clone();
    match tokio::task::spawn_blocking(move || kb.reload()).await {
        Ok(Ok(snapshot)) => {
            info!(entries = snapshot.entries().len(), "Knowledge base reloaded via API");
            ApiResponse::ok(snapshot.stats())
        }
        Ok(Err(e)) => e.into_response(),
        Err(e) => ApiErrorResponse::internal(format!("reload task failed: {e}")),
    }
}
