//! Crawling indexer / 索引器
//!
//! Walks directories, parses supported files and writes them into the
//! document store. Indexing is incremental: a file is reparsed only when
//! its modification time or size disagrees with the stored record. Parse
//! failures are recorded on the file row instead of aborting the walk.

use std::path::Path;
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::parser::{self, file_type_of};
use crate::search::DocumentStore;

/// Outcome of one indexing run / 单次索引运行的结果
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct IndexReport {
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct Indexer<'a> {
    store: &'a DocumentStore,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Index a file or a whole directory tree / 索引文件或目录
    pub async fn index_path(&self, path: &Path) -> Result<IndexReport, String> {
        if !path.exists() {
            return Err(format!("path not found: {}", path.display()));
        }
        let mut report = IndexReport::default();
        if path.is_file() {
            self.index_one(path, &mut report).await;
        } else {
            self.index_folder(path, &mut report).await;
        }
        tracing::info!(
            "Indexing complete for {}: {} indexed, {} skipped, {} failed",
            path.display(),
            report.indexed,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    async fn index_folder(&self, folder: &Path, report: &mut IndexReport) {
        for entry in WalkDir::new(folder).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Walk error under {}: {}", folder.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() {
                self.index_one(entry.path(), report).await;
            }
        }
    }

    /// Index one file, recording failure on the file row. / 索引单个文件
    async fn index_one(&self, path: &Path, report: &mut IndexReport) {
        let parse = match parser::parser_for(path) {
            Some(f) => f,
            None => return,
        };

        let (mtime, size) = match file_stat(path) {
            Some(stat) => stat,
            None => return,
        };

        let path_str = path.to_string_lossy().to_string();
        match self.store.needs_indexing(&path_str, mtime, size).await {
            Ok(true) => {}
            Ok(false) => {
                report.skipped += 1;
                return;
            }
            Err(e) => {
                tracing::error!("Change check failed for {}: {}", path_str, e);
                report.failed += 1;
                return;
            }
        }

        tracing::info!("Indexing: {}", path_str);
        let doc = match parse(path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("Failed to parse {}: {}", path_str, e);
                if let Err(e) = self.store.mark_failed(&path_str, &e, mtime, size).await {
                    tracing::error!("Failed to record parse error for {}: {}", path_str, e);
                }
                report.failed += 1;
                return;
            }
        };
        if doc.content.is_empty() {
            tracing::warn!("No content extracted from {}", path_str);
        }

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path_str.clone());
        let result = self
            .store
            .upsert_document(
                &path_str,
                &title,
                &doc.content,
                &doc.keywords,
                mtime,
                size,
                &file_type_of(path),
            )
            .await;
        match result {
            Ok(()) => report.indexed += 1,
            Err(e) => {
                tracing::error!("Failed to store {}: {}", path_str, e);
                report.failed += 1;
            }
        }
    }
}

/// (mtime as epoch seconds, size) / 文件修改时间与大小
fn file_stat(path: &Path) -> Option<(f64, i64)> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_secs_f64();
    Some((mtime, meta.len() as i64))
}
