//! Document store - SQLite FTS5 full-text index / 文档存储与全文索引
//!
//! Storage layout / 存储方案:
//! - `files` table: per-file metadata and indexing status (0 pending,
//!   1 indexed, 2 failed)
//! - `search_index` FTS5 virtual table (trigram tokenizer, so substring
//!   MATCH works for mixed Chinese/English content; falls back to the
//!   default tokenizer where trigram is unavailable)
//!
//! WAL mode keeps background indexing writes from blocking read queries.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;

use crate::error::{Result, SearchError};

/// One tokenized-match candidate / FTS 匹配结果
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub file_path: String,
    pub title: String,
    /// store-native excerpt with `<b>` markers around the best match
    pub highlight: String,
    /// lower = more relevant (bm25 is negative for good matches)
    pub rank: f64,
}

/// One substring-scan candidate, carrying full text / 子串扫描结果
#[derive(Debug, Clone)]
pub struct SubstringHit {
    pub file_path: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RecentFile {
    pub file_path: String,
    pub title: String,
    pub last_modified: f64,
    pub file_type: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStats {
    pub file_count: i64,
    pub index_count: i64,
    pub file_types: HashMap<String, i64>,
    pub sample_paths: Vec<String>,
}

/// Document store over one SQLite database / 文档存储
#[derive(Clone)]
pub struct DocumentStore {
    db: Pool<Sqlite>,
}

impl DocumentStore {
    /// Open (or create) the store database / 打开或创建存储数据库
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .map_err(|e| SearchError::Config(format!("store connection failed: {}", e)))?;
        Ok(Self { db })
    }

    /// 使用现有数据库连接池
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Initialize tables and pragmas / 初始化表结构
    ///
    /// Only creates what is missing; existing index data survives restarts.
    pub async fn init(&self) -> Result<()> {
        // WAL：搜索与后台索引互不阻塞
        sqlx::query("PRAGMA journal_mode=WAL").execute(&self.db).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&self.db).await?;
        sqlx::query("PRAGMA busy_timeout=10000").execute(&self.db).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path TEXT UNIQUE NOT NULL,
                last_modified REAL,
                file_size INTEGER,
                file_type TEXT,
                indexed_status INTEGER DEFAULT 0,
                error_message TEXT
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        // trigram 分词器支持子串匹配；旧版 SQLite 缺 trigram 时退回默认分词器
        let trigram = sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(
                file_path UNINDEXED,
                title,
                content,
                keywords,
                tokenize = 'trigram'
            )
            "#,
        )
        .execute(&self.db)
        .await;

        if let Err(e) = trigram {
            tracing::warn!("trigram tokenizer unavailable, using default tokenizer: {}", e);
            sqlx::query(
                r#"
                CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(
                    file_path UNINDEXED,
                    title,
                    content,
                    keywords
                )
                "#,
            )
            .execute(&self.db)
            .await?;
        }

        tracing::info!("Document store initialized (WAL mode)");
        Ok(())
    }

    /// Number of indexed documents / 索引文档数
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as total FROM search_index")
            .fetch_one(&self.db)
            .await?;
        Ok(row.get("total"))
    }

    /// Tokenized-match query / FTS 查询
    ///
    /// `fts_query` uses the FTS5 grammar produced by the executor, e.g.
    /// `("alpha"*) OR ("alpha"* AND "beta"*)`. Path prefixes are applied
    /// in-query, case-insensitively. Malformed expressions surface as
    /// [`SearchError::QuerySyntax`].
    pub async fn query_match(
        &self,
        fts_query: &str,
        path_prefixes: Option<&[String]>,
        limit: i64,
    ) -> Result<Vec<StoreHit>> {
        let mut sql = String::from(
            "SELECT file_path, title, \
             snippet(search_index, 2, '<b>', '</b>', '...', 64) as highlight, rank \
             FROM search_index WHERE search_index MATCH ?",
        );
        append_path_filter(&mut sql, path_prefixes);
        sql.push_str(" ORDER BY rank LIMIT ?");

        let mut query = sqlx::query(&sql).bind(fts_query);
        if let Some(prefixes) = path_prefixes {
            for prefix in prefixes {
                query = query.bind(format!("{}%", prefix.to_lowercase()));
            }
        }
        let rows = query
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .map_err(SearchError::from_store)?;

        Ok(rows
            .iter()
            .map(|row| StoreHit {
                file_path: row.get("file_path"),
                title: row.get("title"),
                highlight: row.get("highlight"),
                rank: row.get("rank"),
            })
            .collect())
    }

    /// Substring scan over content and title / LIKE 子串扫描
    pub async fn query_substring(
        &self,
        term: &str,
        path_prefixes: Option<&[String]>,
        limit: i64,
    ) -> Result<Vec<SubstringHit>> {
        let mut sql = String::from(
            "SELECT file_path, title, content FROM search_index \
             WHERE (content LIKE ? OR title LIKE ?)",
        );
        append_path_filter(&mut sql, path_prefixes);
        sql.push_str(" LIMIT ?");

        let pattern = format!("%{}%", term);
        let mut query = sqlx::query(&sql).bind(&pattern).bind(&pattern);
        if let Some(prefixes) = path_prefixes {
            for prefix in prefixes {
                query = query.bind(format!("{}%", prefix.to_lowercase()));
            }
        }
        let rows = query.bind(limit).fetch_all(&self.db).await?;

        Ok(rows
            .iter()
            .map(|row| SubstringHit {
                file_path: row.get("file_path"),
                title: row.get("title"),
                content: row.get::<Option<String>, _>("content").unwrap_or_default(),
            })
            .collect())
    }

    /// Has this file changed since it was last indexed? / 是否需要重新索引
    ///
    /// New files and files whose mtime (±1s tolerance) or size differ from
    /// the recorded values need indexing.
    pub async fn needs_indexing(&self, file_path: &str, mtime: f64, size: i64) -> Result<bool> {
        let row: Option<(f64, i64)> = sqlx::query_as(
            "SELECT last_modified, file_size FROM files WHERE file_path = ?",
        )
        .bind(file_path)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some((last_modified, file_size)) => {
                Ok((last_modified - mtime).abs() > 1.0 || file_size != size)
            }
            None => Ok(true),
        }
    }

    /// Insert or refresh one document record / 写入或更新文档记录
    pub async fn upsert_document(
        &self,
        file_path: &str,
        title: &str,
        content: &str,
        keywords: &str,
        mtime: f64,
        size: i64,
        file_type: &str,
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO files (file_path, last_modified, file_size, file_type, indexed_status, error_message)
            VALUES (?, ?, ?, ?, 1, NULL)
            ON CONFLICT(file_path) DO UPDATE SET
                last_modified = excluded.last_modified,
                file_size = excluded.file_size,
                file_type = excluded.file_type,
                indexed_status = 1,
                error_message = NULL
            "#,
        )
        .bind(file_path)
        .bind(mtime)
        .bind(size)
        .bind(file_type)
        .execute(&mut *tx)
        .await?;

        // FTS 表先删后插更安全
        sqlx::query("DELETE FROM search_index WHERE file_path = ?")
            .bind(file_path)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO search_index (file_path, title, content, keywords) VALUES (?, ?, ?, ?)",
        )
        .bind(file_path)
        .bind(title)
        .bind(content)
        .bind(keywords)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Record a parse/index failure for a file / 标记索引失败
    pub async fn mark_failed(&self, file_path: &str, error: &str, mtime: f64, size: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (file_path, last_modified, file_size, indexed_status, error_message)
            VALUES (?, ?, ?, 2, ?)
            ON CONFLICT(file_path) DO UPDATE SET
                indexed_status = 2,
                error_message = excluded.error_message
            "#,
        )
        .bind(file_path)
        .bind(mtime)
        .bind(size)
        .bind(error)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Delete everything indexed under a path prefix / 删除路径前缀下的索引
    pub async fn delete_by_prefix(&self, path_prefix: &str) -> Result<u64> {
        let pattern = format!("{}%", path_prefix);
        let deleted = sqlx::query("DELETE FROM files WHERE file_path LIKE ?")
            .bind(&pattern)
            .execute(&self.db)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM search_index WHERE file_path LIKE ?")
            .bind(&pattern)
            .execute(&self.db)
            .await?;
        Ok(deleted)
    }

    /// Count of indexed files under a prefix / 路径前缀下已索引文件数
    pub async fn indexed_count(&self, path_prefix: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM files WHERE file_path LIKE ? AND indexed_status = 1",
        )
        .bind(format!("{}%", path_prefix))
        .fetch_one(&self.db)
        .await?;
        Ok(row.get("count"))
    }

    /// 清空所有索引数据
    pub async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM search_index").execute(&self.db).await?;
        sqlx::query("DELETE FROM files").execute(&self.db).await?;
        tracing::info!("Index cleared");
        Ok(())
    }

    /// Recently indexed files / 最近索引的文件
    pub async fn recent_files(&self, limit: i64) -> Result<Vec<RecentFile>> {
        let rows = sqlx::query(
            "SELECT file_path, last_modified, file_type FROM files \
             WHERE indexed_status = 1 ORDER BY last_modified DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let file_path: String = row.get("file_path");
                let title = file_name_of(&file_path);
                RecentFile {
                    file_path,
                    title,
                    last_modified: row.get::<Option<f64>, _>("last_modified").unwrap_or(0.0),
                    file_type: row.get::<Option<String>, _>("file_type").unwrap_or_default(),
                }
            })
            .collect())
    }

    /// Search suggestions from file names and indexed content / 搜索建议
    pub async fn suggestions(&self, q: &str, limit: usize) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        // 1. 文件名建议
        let titles: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT title FROM search_index WHERE title LIKE ? LIMIT 5",
        )
        .bind(format!("%{}%", q))
        .fetch_all(&self.db)
        .await
        .unwrap_or_default();

        for (title,) in titles {
            suggestions.push(Suggestion {
                text: title,
                kind: "filename".to_string(),
                source: "文件名".to_string(),
                preview: None,
            });
        }

        // 2. 内容预览建议
        let escaped = q.replace('"', "\"\"");
        let previews: Vec<(String, String)> = sqlx::query_as(
            "SELECT file_path, snippet(search_index, 2, '', '', '...', 10) as preview \
             FROM search_index WHERE search_index MATCH ? LIMIT 3",
        )
        .bind(format!("\"{}\"*", escaped))
        .fetch_all(&self.db)
        .await
        .unwrap_or_else(|e| {
            tracing::debug!("Suggestion content query failed: {}", e);
            Vec::new()
        });

        for (file_path, preview) in previews {
            suggestions.push(Suggestion {
                text: q.to_string(),
                kind: "content".to_string(),
                source: format!("来自: {}", file_name_of(&file_path)),
                preview: Some(preview),
            });
        }

        suggestions.truncate(limit);
        suggestions
    }

    /// Diagnostics for the stats endpoint / 诊断统计
    pub async fn stats(&self) -> Result<StoreStats> {
        let file_count: i64 = sqlx::query("SELECT COUNT(*) as total FROM files")
            .fetch_one(&self.db)
            .await?
            .get("total");
        let index_count = self.count().await?;

        let type_rows = sqlx::query(
            "SELECT file_type, COUNT(*) as count FROM files GROUP BY file_type",
        )
        .fetch_all(&self.db)
        .await?;
        let file_types = type_rows
            .iter()
            .map(|row| {
                (
                    row.get::<Option<String>, _>("file_type").unwrap_or_default(),
                    row.get::<i64, _>("count"),
                )
            })
            .collect();

        let sample_rows: Vec<(String,)> =
            sqlx::query_as("SELECT file_path FROM files LIMIT 10")
                .fetch_all(&self.db)
                .await?;

        Ok(StoreStats {
            file_count,
            index_count,
            file_types,
            sample_paths: sample_rows.into_iter().map(|(p,)| p).collect(),
        })
    }
}

/// 追加大小写不敏感的路径前缀过滤子句
fn append_path_filter(sql: &mut String, path_prefixes: Option<&[String]>) {
    if let Some(prefixes) = path_prefixes {
        if !prefixes.is_empty() {
            let clauses = vec!["LOWER(file_path) LIKE ?"; prefixes.len()];
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
    }
}

fn file_name_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> DocumentStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        let store = DocumentStore::new(pool);
        store.init().await.expect("init");
        store
    }

    #[tokio::test]
    async fn test_upsert_and_count() {
        let store = memory_store().await;
        assert_eq!(store.count().await.unwrap(), 0);

        store
            .upsert_document("/docs/a.txt", "a.txt", "hello world content", "", 100.0, 10, "txt")
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        // 再次写入同一路径不增加记录
        store
            .upsert_document("/docs/a.txt", "a.txt", "updated content here", "", 200.0, 12, "txt")
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_needs_indexing_change_detection() {
        let store = memory_store().await;
        store
            .upsert_document("/docs/a.txt", "a.txt", "content body text", "", 100.0, 10, "txt")
            .await
            .unwrap();

        assert!(!store.needs_indexing("/docs/a.txt", 100.5, 10).await.unwrap());
        assert!(store.needs_indexing("/docs/a.txt", 200.0, 10).await.unwrap());
        assert!(store.needs_indexing("/docs/a.txt", 100.0, 99).await.unwrap());
        assert!(store.needs_indexing("/docs/new.txt", 100.0, 10).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_match_and_path_filter() {
        let store = memory_store().await;
        store
            .upsert_document("/one/report.txt", "report.txt", "annual revenue report body", "", 1.0, 1, "txt")
            .await
            .unwrap();
        store
            .upsert_document("/two/notes.txt", "notes.txt", "revenue notes for later", "", 1.0, 1, "txt")
            .await
            .unwrap();

        let hits = store.query_match("(\"revenue\"*)", None, 10).await.unwrap();
        assert_eq!(hits.len(), 2);

        let scoped = store
            .query_match("(\"revenue\"*)", Some(&["/one".to_string()]), 10)
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].file_path, "/one/report.txt");
        assert!(scoped[0].highlight.contains("<b>revenue</b>"));
    }

    #[tokio::test]
    async fn test_query_match_syntax_error() {
        let store = memory_store().await;
        store
            .upsert_document("/a.txt", "a.txt", "plain body text", "", 1.0, 1, "txt")
            .await
            .unwrap();

        let err = store.query_match("AND AND", None, 10).await.unwrap_err();
        assert!(err.is_query_syntax(), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_query_substring() {
        let store = memory_store().await;
        store
            .upsert_document("/a.txt", "a.txt", "前言 中文 正文", "", 1.0, 1, "txt")
            .await
            .unwrap();
        store
            .upsert_document("/b.txt", "b.txt", "nothing relevant", "", 1.0, 1, "txt")
            .await
            .unwrap();

        let hits = store.query_substring("中", None, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "/a.txt");
        assert!(hits[0].content.contains("中文"));
    }

    #[tokio::test]
    async fn test_delete_by_prefix() {
        let store = memory_store().await;
        for path in ["/one/a.txt", "/one/b.txt", "/two/c.txt"] {
            store
                .upsert_document(path, "t", "some body content", "", 1.0, 1, "txt")
                .await
                .unwrap();
        }
        let deleted = store.delete_by_prefix("/one").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
