pub mod ai;
pub mod index;
pub mod search;
pub mod server;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Assemble the full API router / 组装完整路由
///
/// Response bodies are endpoint-shaped rather than wrapped in a generic
/// envelope; errors carry an HTTP status plus `{"error": ...}`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(server::health))
        .route("/api/stats", get(server::stats))
        .route("/api/search", post(search::search))
        .route("/api/search/suggestions", get(search::suggestions))
        .route("/api/files/recent", get(search::recent_files))
        .route("/api/index/rebuild", post(index::rebuild))
        .route("/api/index/batch", post(index::batch))
        .route("/api/index/status", post(index::status))
        .route("/api/index/delete", post(index::delete))
        .route("/api/index/path", post(index::index_path))
        .route("/api/ai/expand", post(ai::expand))
        .route("/api/ai/test", post(ai::test_connection))
        .with_state(state)
}
