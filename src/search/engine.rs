//! Search strategy executor / 搜索策略执行器
//!
//! Drives one query end-to-end: parse the logical operator, classify each
//! term, run the tokenized-match or substring strategy, combine per-term
//! result sets (AND intersection / OR union), then finalize every surviving
//! row: metadata-tag styling, quality filtering, capping.
//!
//! Fail-soft discipline: a store-level failure for one term degrades to the
//! substring strategy for that term (or an empty list), never to an aborted
//! request. Only a missing store connection at startup is fatal.

use std::collections::{HashMap, HashSet};

use super::expand::{expand_term, needs_substring_fallback};
use super::query::{parse_logical_query, Operator};
use super::quality::{is_acceptable, PrecisionLevel};
use super::snippet::{
    count_occurrences, generate_snippet, highlight_metadata, highlight_term, strip_markup,
    DEFAULT_CONTEXT,
};
use super::store::DocumentStore;

/// Per-term candidate cap for AND queries, above the external limit so the
/// intersection has room to lose documents. / AND 查询的内部候选上限
const AND_TERM_LIMIT: i64 = 200;

/// One ranked search result / 搜索结果
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResultItem {
    pub file_path: String,
    pub title: String,
    /// excerpt with `<b>` and `<span class="meta">` markers
    pub highlight: String,
    /// lower = more relevant
    pub rank: f64,
}

/// Search executor over one document store / 搜索执行器
pub struct SearchEngine<'a> {
    store: &'a DocumentStore,
    snippet_context: usize,
}

impl<'a> SearchEngine<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store, snippet_context: DEFAULT_CONTEXT }
    }

    /// Override the excerpt context radius / 调整摘要上下文半径
    pub fn with_snippet_context(mut self, context: usize) -> Self {
        self.snippet_context = context;
        self
    }

    /// Execute one full query / 执行完整查询
    ///
    /// `paths`, when present, restricts results to documents whose path
    /// starts (case-insensitively) with one of the prefixes.
    pub async fn search(
        &self,
        raw_query: &str,
        limit: usize,
        precision: PrecisionLevel,
        paths: Option<&[String]>,
    ) -> Vec<SearchResultItem> {
        let parsed = parse_logical_query(raw_query);
        let terms: Vec<String> = parsed
            .terms
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        // 空索引直接短路
        match self.store.count().await {
            Ok(0) => {
                tracing::warn!("Search index is empty");
                return Vec::new();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Index count failed: {}", e);
                return Vec::new();
            }
        }

        tracing::debug!(
            "Search: operator={:?}, terms={:?}, precision={:?}",
            parsed.operator,
            terms,
            precision
        );

        let candidates = match parsed.operator {
            Operator::None => self.search_single(&terms[0], limit, precision, paths).await,
            Operator::And => self.search_and(&terms, paths).await,
            Operator::Or => self.search_or(&terms, limit, paths).await,
        };

        finalize(candidates, limit)
    }

    /// Single-term execution / 单一查询词
    async fn search_single(
        &self,
        term: &str,
        limit: usize,
        precision: PrecisionLevel,
        paths: Option<&[String]>,
    ) -> Vec<SearchResultItem> {
        if needs_substring_fallback(term) {
            return self.substring_strategy(term, limit as i64, paths).await;
        }

        // exact 精度不扩展
        let search_terms = if precision == PrecisionLevel::Exact {
            vec![term.trim().to_lowercase()]
        } else {
            expand_term(term)
        };
        let fts_query = build_fts_query(&search_terms);
        tracing::debug!("FTS query: {}", fts_query);

        // 超量取回，留给质量过滤余量
        match self
            .store
            .query_match(&fts_query, paths, (limit * 2) as i64)
            .await
        {
            Ok(hits) => hits
                .into_iter()
                .map(|h| SearchResultItem {
                    file_path: h.file_path,
                    title: h.title,
                    highlight: h.highlight,
                    rank: h.rank,
                })
                .collect(),
            Err(e) => {
                tracing::error!("Search failed for term '{}' (mode=single): {}", term, e);
                Vec::new()
            }
        }
    }

    /// AND: every term must hit the same document / AND 逻辑搜索
    async fn search_and(&self, terms: &[String], paths: Option<&[String]>) -> Vec<SearchResultItem> {
        let mut per_term: Vec<Vec<SearchResultItem>> = Vec::with_capacity(terms.len());
        for term in terms {
            per_term.push(self.term_results(term, AND_TERM_LIMIT, paths).await);
        }

        // 交集：所有查询词都命中的文档
        let mut common: HashSet<&str> = per_term[0].iter().map(|r| r.file_path.as_str()).collect();
        for results in &per_term[1..] {
            let ids: HashSet<&str> = results.iter().map(|r| r.file_path.as_str()).collect();
            common.retain(|id| ids.contains(id));
        }

        // 基础行取自第一个词的结果（保持其 rank 顺序），再叠加高亮所有查询词
        per_term[0]
            .iter()
            .filter(|r| common.contains(r.file_path.as_str()))
            .map(|r| {
                let mut highlight = r.highlight.clone();
                for term in terms {
                    highlight = highlight_term(&highlight, term);
                }
                SearchResultItem {
                    file_path: r.file_path.clone(),
                    title: r.title.clone(),
                    highlight,
                    rank: r.rank,
                }
            })
            .collect()
    }

    /// OR: any term may hit, results merged and deduplicated / OR 逻辑搜索
    async fn search_or(
        &self,
        terms: &[String],
        limit: usize,
        paths: Option<&[String]>,
    ) -> Vec<SearchResultItem> {
        let mut merged: HashMap<String, SearchResultItem> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        for term in terms {
            for result in self.term_results(term, limit as i64, paths).await {
                match merged.remove(&result.file_path) {
                    Some(existing) => {
                        let kept = merge_or_results(existing, result);
                        merged.insert(kept.file_path.clone(), kept);
                    }
                    None => {
                        order.push(result.file_path.clone());
                        merged.insert(result.file_path.clone(), result);
                    }
                }
            }
        }

        let mut results: Vec<SearchResultItem> = order
            .into_iter()
            .filter_map(|id| merged.remove(&id))
            .collect();
        results.sort_by(|a, b| a.rank.partial_cmp(&b.rank).unwrap_or(std::cmp::Ordering::Equal));
        results
    }

    /// Per-term execution shared by AND and OR: no expansion, one quoted
    /// prefix clause, substring fallback on classification or store error.
    async fn term_results(
        &self,
        term: &str,
        limit: i64,
        paths: Option<&[String]>,
    ) -> Vec<SearchResultItem> {
        if needs_substring_fallback(term) {
            return self.substring_strategy(term, limit, paths).await;
        }

        let fts_query = format!("\"{}\"*", term.replace('"', "\"\""));
        match self.store.query_match(&fts_query, paths, limit).await {
            Ok(hits) => hits
                .into_iter()
                .map(|h| SearchResultItem {
                    file_path: h.file_path,
                    title: h.title,
                    highlight: h.highlight,
                    rank: h.rank,
                })
                .collect(),
            Err(e) => {
                // 任何存储错误都降级为子串扫描，绝不中断整个请求
                tracing::warn!(
                    "Tokenized match failed for term '{}' (mode=multi): {}, falling back to substring",
                    term,
                    e
                );
                self.substring_strategy(term, limit, paths).await
            }
        }
    }

    /// Substring fallback strategy / LIKE 子串回退策略
    ///
    /// Builds the excerpt manually and synthesizes a rank from weighted
    /// occurrence counts, negated so lower still means more relevant.
    async fn substring_strategy(
        &self,
        term: &str,
        limit: i64,
        paths: Option<&[String]>,
    ) -> Vec<SearchResultItem> {
        let rows = match self.store.query_substring(term, paths, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Substring search failed for term '{}': {}", term, e);
                return Vec::new();
            }
        };

        let mut results: Vec<SearchResultItem> = rows
            .into_iter()
            .map(|row| {
                let content_hits = count_occurrences(&row.content, term);
                let title_hits = count_occurrences(&row.title, term);
                // 标题命中权重更高；取负以符合 rank 越小越相关的约定
                let score = content_hits + title_hits * 5;
                SearchResultItem {
                    highlight: generate_snippet(&row.content, term, self.snippet_context),
                    file_path: row.file_path,
                    title: row.title,
                    rank: -(score as f64),
                }
            })
            .collect();

        results.sort_by(|a, b| a.rank.partial_cmp(&b.rank).unwrap_or(std::cmp::Ordering::Equal));
        results
    }
}

/// Compose the FTS5 query string for a set of expansion terms / 构造 FTS 查询
///
/// Each expansion term becomes a parenthesized conjunction of its
/// whitespace-split words, every word a double-quoted prefix clause;
/// variants are joined by OR: any variant matches, but within one
/// variant all words must be present.
pub fn build_fts_query(terms: &[String]) -> String {
    let parts: Vec<String> = terms
        .iter()
        .filter_map(|term| {
            let words: Vec<String> = term
                .split_whitespace()
                .map(|w| format!("\"{}\"*", w.replace('"', "\"\"")))
                .collect();
            if words.is_empty() {
                None
            } else {
                Some(format!("({})", words.join(" AND ")))
            }
        })
        .collect();
    parts.join(" OR ")
}

/// OR-merge reducer: first occurrence wins unless the newcomer carries a
/// strictly longer highlight. / OR 合并：更长的摘要获胜
fn merge_or_results(existing: SearchResultItem, candidate: SearchResultItem) -> SearchResultItem {
    if candidate.highlight.len() > existing.highlight.len() {
        SearchResultItem {
            highlight: candidate.highlight,
            ..existing
        }
    } else {
        existing
    }
}

/// Final pass over every candidate: metadata styling, quality filter, cap.
fn finalize(candidates: Vec<SearchResultItem>, limit: usize) -> Vec<SearchResultItem> {
    let mut results: Vec<SearchResultItem> = candidates
        .into_iter()
        .map(|mut r| {
            r.highlight = highlight_metadata(&r.highlight);
            r
        })
        .filter(|r| is_acceptable(&strip_markup(&r.highlight)))
        .collect();
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

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

    async fn seed(store: &DocumentStore, path: &str, content: &str) {
        let title = path.rsplit('/').next().unwrap();
        store
            .upsert_document(path, title, content, "", 100.0, content.len() as i64, "txt")
            .await
            .expect("seed");
    }

    #[test]
    fn test_build_fts_query() {
        let terms = vec!["alpha".to_string(), "alpha beta".to_string()];
        assert_eq!(build_fts_query(&terms), "(\"alpha\"*) OR (\"alpha\"* AND \"beta\"*)");
    }

    #[test]
    fn test_build_fts_query_escapes_quotes() {
        let terms = vec!["say \"hi\"".to_string()];
        assert_eq!(build_fts_query(&terms), "(\"say\"* AND \"\"\"hi\"\"\"*)");
    }

    #[test]
    fn test_merge_or_prefers_longer_highlight() {
        let a = SearchResultItem {
            file_path: "/a".into(),
            title: "a".into(),
            highlight: "short".into(),
            rank: -1.0,
        };
        let b = SearchResultItem {
            file_path: "/a".into(),
            title: "a".into(),
            highlight: "a much longer highlight".into(),
            rank: -0.5,
        };
        let kept = merge_or_results(a.clone(), b);
        // 摘要被替换，其余字段保留第一条
        assert_eq!(kept.highlight, "a much longer highlight");
        assert_eq!(kept.rank, -1.0);

        let c = SearchResultItem {
            file_path: "/a".into(),
            title: "a".into(),
            highlight: "tiny".into(),
            rank: -9.0,
        };
        let kept = merge_or_results(a, c);
        assert_eq!(kept.highlight, "short");
    }

    #[tokio::test]
    async fn test_end_to_end_single_term() {
        let store = memory_store().await;
        seed(
            &store,
            "/docs/sample.txt",
            "This is a sample text file for testing. keyword: Banana.",
        )
        .await;

        let engine = SearchEngine::new(&store);
        let results = engine
            .search("Banana", 10, PrecisionLevel::Medium, None)
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_path, "/docs/sample.txt");
        assert!(results[0].highlight.contains("<b>Banana</b>"));
    }

    #[tokio::test]
    async fn test_end_to_end_and_or() {
        let store = memory_store().await;
        seed(&store, "/docs/both.txt", "contains alpha beta together in one place").await;
        seed(&store, "/docs/only.txt", "contains alpha alone in this file").await;

        let engine = SearchEngine::new(&store);

        let and_results = engine
            .search("alpha AND beta", 10, PrecisionLevel::Medium, None)
            .await;
        assert_eq!(and_results.len(), 1);
        assert_eq!(and_results[0].file_path, "/docs/both.txt");

        let or_results = engine
            .search("alpha OR beta", 10, PrecisionLevel::Medium, None)
            .await;
        assert_eq!(or_results.len(), 2);
    }

    #[tokio::test]
    async fn test_and_subset_of_single() {
        let store = memory_store().await;
        seed(&store, "/docs/both.txt", "alpha beta gamma all present here").await;
        seed(&store, "/docs/only.txt", "alpha appears without the second word").await;

        let engine = SearchEngine::new(&store);
        let single: Vec<String> = engine
            .search("alpha", 50, PrecisionLevel::Medium, None)
            .await
            .into_iter()
            .map(|r| r.file_path)
            .collect();
        let and_results = engine
            .search("alpha AND beta", 50, PrecisionLevel::Medium, None)
            .await;
        for r in &and_results {
            assert!(single.contains(&r.file_path));
        }
    }

    #[tokio::test]
    async fn test_or_union_monotonicity() {
        let store = memory_store().await;
        seed(&store, "/docs/a.txt", "alpha content in this document body").await;
        seed(&store, "/docs/b.txt", "beta content in this document body").await;

        let engine = SearchEngine::new(&store);
        let single = engine.search("alpha", 10, PrecisionLevel::Medium, None).await;
        let or_results = engine
            .search("alpha OR beta", 10, PrecisionLevel::Medium, None)
            .await;
        assert!(or_results.len() >= single.len());
    }

    #[tokio::test]
    async fn test_short_cjk_uses_substring_fallback() {
        let store = memory_store().await;
        seed(&store, "/docs/cn.txt", "[Para:1] 本文件讨论中文检索的细节问题").await;

        let engine = SearchEngine::new(&store);
        let results = engine.search("中文", 10, PrecisionLevel::Medium, None).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].highlight.contains("<b>中文</b>"));
        // 结构标记经过样式包裹
        assert!(results[0]
            .highlight
            .contains("<span class=\"meta\">[Para:1]</span>"));
    }

    #[tokio::test]
    async fn test_empty_index_short_circuits() {
        let store = memory_store().await;
        let engine = SearchEngine::new(&store);
        let results = engine.search("anything", 10, PrecisionLevel::Medium, None).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_short_circuits() {
        let store = memory_store().await;
        seed(&store, "/docs/a.txt", "some indexed content body").await;
        let engine = SearchEngine::new(&store);
        assert!(engine
            .search("   ", 10, PrecisionLevel::Medium, None)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_exact_precision_skips_expansion() {
        let store = memory_store().await;
        // "execl" 只能通过纠错扩展命中 excel；exact 模式下应查不到
        seed(&store, "/docs/sheet.txt", "quarterly excel workbook with numbers").await;

        let engine = SearchEngine::new(&store);
        let fuzzy = engine.search("execl", 10, PrecisionLevel::Medium, None).await;
        assert_eq!(fuzzy.len(), 1);

        let exact = engine.search("execl", 10, PrecisionLevel::Exact, None).await;
        assert!(exact.is_empty());
    }

    #[tokio::test]
    async fn test_path_filter_applies_to_and_path() {
        let store = memory_store().await;
        seed(&store, "/one/both.txt", "alpha beta together here").await;
        seed(&store, "/two/both.txt", "alpha beta together there").await;

        let engine = SearchEngine::new(&store);
        let paths = vec!["/one".to_string()];
        let results = engine
            .search("alpha AND beta", 10, PrecisionLevel::Medium, Some(&paths))
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_path, "/one/both.txt");
    }
}
