//! File format parsers / 文件格式解析
//!
//! Extension-keyed registry of stateless parse functions. Each parser
//! returns the full text plus an optional keyword string (identifiers
//! worth boosting in the index). Unknown extensions are skipped by the
//! indexer rather than treated as errors.

use std::path::Path;

pub mod office;
pub mod text;

/// Parsed output of one file / 单个文件的解析产物
#[derive(Debug, Default)]
pub struct ParsedDocument {
    /// full text, may carry `[Para:n]` / `[Slide:n]` / `[Sheet:...]` markers
    pub content: String,
    /// space-joined high-value identifiers, empty for most formats
    pub keywords: String,
}

impl ParsedDocument {
    pub fn content_only(content: String) -> Self {
        Self { content, keywords: String::new() }
    }
}

pub type ParseFn = fn(&Path) -> Result<ParsedDocument, String>;

/// Look up the parser for a path by extension / 按扩展名选择解析器
pub fn parser_for(path: &Path) -> Option<ParseFn> {
    let ext = file_type_of(path);
    let f: ParseFn = match ext.as_str() {
        "txt" | "log" | "csv" | "md" | "json" => text::parse_plain,
        "sas" => text::parse_sas,
        "py" | "pyw" => text::parse_python,
        "r" | "rh" => text::parse_r,
        "docx" => office::parse_docx,
        "xlsx" => office::parse_xlsx,
        "pptx" => office::parse_pptx,
        _ => return None,
    };
    Some(f)
}

/// File-type label stored alongside the document / 文件类型标签
pub fn file_type_of(path: &Path) -> String {
    crate::utils::get_ext(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_registry() {
        assert!(parser_for(Path::new("/a/report.txt")).is_some());
        assert!(parser_for(Path::new("/a/Report.DOCX")).is_some());
        assert!(parser_for(Path::new("/a/script.py")).is_some());
        assert!(parser_for(Path::new("/a/photo.jpg")).is_none());
        assert!(parser_for(Path::new("/a/noext")).is_none());
    }

    #[test]
    fn test_file_type_of() {
        assert_eq!(file_type_of(Path::new("/a/b.XLSX")), "xlsx");
        assert_eq!(file_type_of(Path::new("/a/noext")), "");
    }
}
