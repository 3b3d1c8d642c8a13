//! Search error taxonomy / 搜索错误分类
//!
//! Only a missing store connection is fatal. Everything else is recovered
//! locally: a malformed MATCH expression falls back to substring search for
//! the offending term, and an unreachable AI collaborator degrades to zero
//! extra expansion terms.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// 配置错误（如数据库连接缺失），启动时致命
    #[error("configuration error: {0}")]
    Config(String),

    /// FTS MATCH 表达式语法错误（病态输入），降级为子串搜索
    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    /// 底层存储错误
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// AI 扩展服务不可用，静默忽略
    #[error("collaborator unavailable: {0}")]
    Collaborator(String),
}

impl SearchError {
    /// Classify a store-level failure. SQLite surfaces bad FTS5 MATCH
    /// expressions as database errors mentioning fts5 / syntax.
    pub fn from_store(err: sqlx::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("fts5") || msg.contains("syntax error") || msg.contains("unknown special query") {
            SearchError::QuerySyntax(msg)
        } else {
            SearchError::Store(err)
        }
    }

    pub fn is_query_syntax(&self) -> bool {
        matches!(self, SearchError::QuerySyntax(_))
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
