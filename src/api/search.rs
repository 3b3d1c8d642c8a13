//! Search endpoints / 搜索接口

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::search::{PrecisionLevel, SearchEngine, SearchResultItem, Suggestion};
use crate::state::AppState;
use crate::utils::normalize_path;

fn default_limit() -> usize {
    crate::config::config().search.default_limit
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub precision: PrecisionLevel,
    /// restrict results to these directory prefixes / 限定搜索目录
    #[serde(default)]
    pub paths: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total_count: usize,
    pub has_more: bool,
}

/// Rows to request from the engine: one past the page so `has_more`
/// needs no second query. Saturates, limit/offset come from the client.
fn fetch_budget(limit: usize, offset: usize) -> usize {
    limit.saturating_add(offset).saturating_add(1)
}

/// POST /api/search
///
/// Over-fetches one row past the page so `has_more` needs no second query.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<SearchResponse> {
    if req.query.trim().is_empty() {
        return Json(SearchResponse { results: Vec::new(), total_count: 0, has_more: false });
    }

    tracing::info!(
        "Search request: query='{}', limit={}, offset={}, precision={:?}, paths={:?}",
        req.query,
        req.limit,
        req.offset,
        req.precision,
        req.paths
    );

    let normalized: Option<Vec<String>> = req
        .paths
        .as_ref()
        .map(|paths| paths.iter().map(|p| normalize_path(p)).collect());

    let engine = SearchEngine::new(&state.store)
        .with_snippet_context(crate::config::config().search.snippet_context);
    let all_results = engine
        .search(
            &req.query,
            fetch_budget(req.limit, req.offset),
            req.precision,
            normalized.as_deref(),
        )
        .await;

    let total_count = all_results.len();
    let has_more = total_count > req.offset.saturating_add(req.limit);
    let results: Vec<SearchResultItem> = all_results
        .into_iter()
        .skip(req.offset)
        .take(req.limit)
        .collect();

    tracing::info!(
        "Search completed: {} results returned (total: {})",
        results.len(),
        total_count
    );

    Json(SearchResponse { results, total_count, has_more })
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/search/suggestions?q=...
///
/// Below two characters the suggestion list is always empty.
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionQuery>,
) -> Json<Vec<Suggestion>> {
    if params.q.chars().count() < 2 {
        return Json(Vec::new());
    }
    Json(state.store.suggestions(&params.q, 8).await)
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}

fn default_recent_limit() -> i64 {
    10
}

/// GET /api/files/recent?limit=...
pub async fn recent_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentQuery>,
) -> Json<serde_json::Value> {
    match state.store.recent_files(params.limit).await {
        Ok(files) => Json(serde_json::json!(files)),
        Err(e) => {
            tracing::error!("Recent files query failed: {}", e);
            Json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_budget() {
        assert_eq!(fetch_budget(50, 0), 51);
        assert_eq!(fetch_budget(20, 40), 61);
    }

    #[test]
    fn test_fetch_budget_saturates_on_huge_page() {
        assert_eq!(fetch_budget(usize::MAX, 0), usize::MAX);
        assert_eq!(fetch_budget(usize::MAX, usize::MAX), usize::MAX);
    }
}
