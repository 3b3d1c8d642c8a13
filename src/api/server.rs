//! Service health and diagnostics / 服务健康与诊断

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "filesearcher-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/stats
///
/// Index counts, per-type breakdown and path samples for diagnostics.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = crate::config::config();
    let db_path = config.get_data_dir().join(&config.database.db_file);
    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    match state.store.stats().await {
        Ok(stats) => Json(json!({
            "status": "ok",
            "database": {
                "path": db_path.to_string_lossy(),
                "size_mb": (db_size as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0,
                "exists": db_path.exists(),
            },
            "statistics": {
                "file_count": stats.file_count,
                "index_count": stats.index_count,
                "file_types": stats.file_types,
            },
            "sample_paths": stats.sample_paths,
        })),
        Err(e) => Json(json!({
            "status": "error",
            "error": e.to_string(),
            "database": {
                "path": db_path.to_string_lossy(),
                "exists": db_path.exists(),
            },
        })),
    }
}
