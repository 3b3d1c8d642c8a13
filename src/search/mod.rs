//! Search module / 搜索模块
//!
//! Layered pipeline over one SQLite FTS5 store:
//! - query: logical-operator parsing (AND / OR) / 逻辑查询解析
//! - expand: typo correction, synonyms, pinyin variants / 查询词扩展
//! - store: document table + FTS index, tokenized and substring access / 文档存储
//! - engine: strategy selection and result combination / 策略执行
//! - snippet: excerpt extraction with location markers / 摘要生成
//! - quality: precision levels and low-value snippet rejection / 结果质量过滤
//!
//! Call direction: API layer → engine → store (unidirectional). The engine
//! never touches the HTTP surface and the store never generates markup.

pub mod engine;
pub mod expand;
pub mod quality;
pub mod query;
pub mod snippet;
pub mod store;

pub use engine::{SearchEngine, SearchResultItem};
pub use quality::PrecisionLevel;
pub use store::{DocumentStore, RecentFile, StoreStats, Suggestion};
