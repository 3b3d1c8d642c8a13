use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ai::AiClient;
use crate::search::DocumentStore;

/// Index building progress / 索引构建进度
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexProgress {
    pub is_running: bool,
    pub is_done: bool,
    pub file_count: u64,
    pub error: Option<String>,
    pub last_done_time: Option<i64>,
}

impl Default for IndexProgress {
    fn default() -> Self {
        Self {
            is_running: false,
            is_done: true,
            file_count: 0,
            error: None,
            last_done_time: None,
        }
    }
}

/// Index state management / 索引状态管理
///
/// Rebuilds run in a background task; handlers poll this state instead of
/// blocking. One rebuild at a time is enforced through `running`.
pub struct IndexState {
    pub running: AtomicBool,
    pub file_count: AtomicU64,
    pub progress: RwLock<IndexProgress>,
}

impl IndexState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            file_count: AtomicU64::new(0),
            progress: RwLock::new(IndexProgress::default()),
        }
    }

    /// Try to claim the single rebuild slot / 尝试占用唯一的重建槽位
    pub fn try_start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.file_count.store(0, Ordering::SeqCst);
        let mut progress = self.progress.write();
        progress.is_running = true;
        progress.is_done = false;
        progress.file_count = 0;
        progress.error = None;
        true
    }

    pub fn add_files(&self, n: u64) {
        let count = self.file_count.fetch_add(n, Ordering::SeqCst) + n;
        let mut progress = self.progress.write();
        progress.file_count = count;
    }

    pub fn finish(&self, error: Option<String>) {
        self.running.store(false, Ordering::SeqCst);
        let mut progress = self.progress.write();
        progress.is_running = false;
        progress.is_done = error.is_none();
        progress.error = error;
        progress.last_done_time = Some(chrono::Utc::now().timestamp());
    }

    pub fn get_progress(&self) -> IndexProgress {
        self.progress.read().clone()
    }
}

impl Default for IndexState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AppState {
    pub store: DocumentStore,
    pub index_state: Arc<IndexState>,
}

impl AppState {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            index_state: Arc::new(IndexState::new()),
        }
    }

    /// Build an AI client from current config / 按当前配置构造 AI 客户端
    pub fn ai_client(&self) -> AiClient {
        let config = crate::config::config();
        AiClient::new(&config.ai.base_url, &config.ai.api_key, &config.ai.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rebuild_slot() {
        let state = IndexState::new();
        assert!(state.try_start());
        assert!(!state.try_start());
        state.finish(None);
        assert!(state.try_start());
    }

    #[test]
    fn test_progress_tracking() {
        let state = IndexState::new();
        state.try_start();
        state.add_files(3);
        state.add_files(2);
        assert_eq!(state.get_progress().file_count, 5);
        assert!(state.get_progress().is_running);

        state.finish(Some("disk gone".to_string()));
        let progress = state.get_progress();
        assert!(!progress.is_running);
        assert!(!progress.is_done);
        assert_eq!(progress.error.as_deref(), Some("disk gone"));
        assert!(progress.last_done_time.is_some());
    }
}
