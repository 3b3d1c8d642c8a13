//! AI expansion endpoints / AI 扩展接口
//!
//! The client credentials travel with the request so the desktop UI can
//! test a configuration before saving it. A request without a config
//! block falls back to the server-side config.json values.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ai::AiClient;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AiCredentials {
    pub base_url: String,
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpandRequest {
    pub query: String,
    #[serde(default)]
    pub config: Option<AiCredentials>,
    /// custom prompt with a {{query}} placeholder / 自定义提示词
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub original: String,
    pub expanded: Vec<String>,
}

fn client_from(state: &AppState, config: Option<&AiCredentials>) -> AiClient {
    match config {
        Some(c) => AiClient::new(&c.base_url, &c.api_key, &c.model),
        None => state.ai_client(),
    }
}

/// POST /api/ai/expand
pub async fn expand(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExpandRequest>,
) -> Json<ExpandResponse> {
    let client = client_from(&state, req.config.as_ref());
    let expanded = client.expand_query(&req.query, req.prompt.as_deref()).await;
    Json(ExpandResponse { original: req.query, expanded })
}

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

/// POST /api/ai/test
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TestRequest>,
) -> Json<Value> {
    let client = if req.base_url.is_empty() {
        state.ai_client()
    } else {
        AiClient::new(&req.base_url, &req.api_key, &req.model)
    };
    let result = client.test_connection().await;
    Json(json!(result))
}
