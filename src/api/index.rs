//! Index management endpoints / 索引管理接口

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::index::Indexer;
use crate::state::{AppState, IndexProgress};
use crate::utils::normalize_path;

#[derive(Debug, Deserialize)]
pub struct PathsRequest {
    pub paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

/// POST /api/index/rebuild
///
/// Clears everything and re-indexes the given paths in a background task.
/// Returns immediately; progress is polled through the status endpoint.
pub async fn rebuild(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathsRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !state.index_state.try_start() {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({"error": "rebuild already running"})),
        ));
    }

    if let Err(e) = state.store.clear_all().await {
        state.index_state.finish(Some(e.to_string()));
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        ));
    }

    let paths: Vec<String> = req.paths.iter().map(|p| normalize_path(p)).collect();
    let count = paths.len();
    let state_bg = state.clone();
    tokio::spawn(async move {
        let indexer = Indexer::new(&state_bg.store);
        let mut last_error = None;
        for path in &paths {
            match indexer.index_path(Path::new(path)).await {
                Ok(report) => state_bg.index_state.add_files(report.indexed),
                Err(e) => {
                    tracing::error!("Rebuild of {} failed: {}", path, e);
                    last_error = Some(e);
                }
            }
        }
        state_bg.index_state.finish(last_error);
    });

    Ok(Json(json!({"status": "rebuild_started", "paths_count": count})))
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: String,
    pub paths_processed: usize,
    pub new_files_indexed: i64,
    pub total_indexed: i64,
}

/// POST /api/index/batch
///
/// Synchronous incremental indexing of several paths; only new or changed
/// files are reparsed.
pub async fn batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathsRequest>,
) -> Json<BatchResponse> {
    let before = state.store.count().await.unwrap_or(0);

    let indexer = Indexer::new(&state.store);
    let mut processed = 0usize;
    for raw in &req.paths {
        let path = normalize_path(raw);
        tracing::info!("Batch indexing: {}", path);
        match indexer.index_path(Path::new(&path)).await {
            Ok(_) => processed += 1,
            Err(e) => tracing::error!("Failed to index {}: {}", path, e),
        }
    }

    let after = state.store.count().await.unwrap_or(before);
    Json(BatchResponse {
        status: "completed".to_string(),
        paths_processed: processed,
        new_files_indexed: after - before,
        total_indexed: after,
    })
}

#[derive(Debug, Serialize)]
pub struct PathStatus {
    pub path: String,
    pub status: String,
    pub indexed_count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub results: Vec<PathStatus>,
    pub progress: IndexProgress,
}

/// POST /api/index/status
pub async fn status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathsRequest>,
) -> Json<StatusResponse> {
    let mut results = Vec::with_capacity(req.paths.len());
    for raw in &req.paths {
        let path = normalize_path(raw);
        let indexed_count = state.store.indexed_count(&path).await.unwrap_or(0);
        results.push(PathStatus {
            status: if indexed_count > 0 { "indexed" } else { "not_indexed" }.to_string(),
            path,
            indexed_count,
        });
    }
    Json(StatusResponse {
        results,
        progress: state.index_state.get_progress(),
    })
}

/// POST /api/index/delete
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let path = normalize_path(&req.path);
    tracing::info!("Deleting index for path: {}", path);

    match state.store.delete_by_prefix(&path).await {
        Ok(deleted) => {
            tracing::info!("Deleted {} indexed files for path: {}", deleted, path);
            Ok(Json(json!({
                "status": "completed",
                "path": path,
                "deleted_count": deleted
            })))
        }
        Err(e) => {
            tracing::error!("Failed to delete index: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            ))
        }
    }
}

/// POST /api/index/path
///
/// Synchronously index one file or folder and report the delta.
pub async fn index_path(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let path = normalize_path(&req.path);
    if !Path::new(&path).exists() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Path not found"})),
        ));
    }

    tracing::info!("Starting indexing for path: {}", path);
    let before = state.store.count().await.unwrap_or(0);

    let indexer = Indexer::new(&state.store);
    match indexer.index_path(Path::new(&path)).await {
        Ok(_) => {
            let after = state.store.count().await.unwrap_or(before);
            tracing::info!("Indexing completed: {} new files indexed", after - before);
            Ok(Json(json!({
                "status": "completed",
                "path": path,
                "indexed_count": after - before,
                "total_count": after
            })))
        }
        Err(e) => {
            tracing::error!("Indexing failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Indexing failed: {}", e)})),
            ))
        }
    }
}
