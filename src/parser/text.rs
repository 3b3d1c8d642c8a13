//! Plain-text and source-code parsers / 文本与代码解析
//!
//! All readers try UTF-8 first and fall back to GB18030 for legacy
//! mainland-Chinese files. Code parsers additionally pull out defined
//! names (procs, functions, classes) as boost keywords.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ParsedDocument;

static SAS_PROC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)proc\s+(\w+)").unwrap());
static SAS_DATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)data\s+(\w+)").unwrap());
static PY_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"def\s+(\w+)").unwrap());
static PY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"class\s+(\w+)").unwrap());
static R_FUNCTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s*<-\s*function").unwrap());

/// Read a file as text, GB18030 fallback / 读取文本，GB18030 回退
fn read_text(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let (decoded, _, had_errors) = encoding_rs::GB18030.decode(e.as_bytes());
            if had_errors {
                Err(format!("undecodable text file: {}", path.display()))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}

pub fn parse_plain(path: &Path) -> Result<ParsedDocument, String> {
    Ok(ParsedDocument::content_only(read_text(path)?))
}

pub fn parse_sas(path: &Path) -> Result<ParsedDocument, String> {
    let content = read_text(path)?;
    let keywords = extract_keywords(&content, &[&SAS_PROC, &SAS_DATA]);
    Ok(ParsedDocument { content, keywords })
}

pub fn parse_python(path: &Path) -> Result<ParsedDocument, String> {
    let content = read_text(path)?;
    let keywords = extract_keywords(&content, &[&PY_DEF, &PY_CLASS]);
    Ok(ParsedDocument { content, keywords })
}

pub fn parse_r(path: &Path) -> Result<ParsedDocument, String> {
    let content = read_text(path)?;
    let keywords = extract_keywords(&content, &[&R_FUNCTION]);
    Ok(ParsedDocument { content, keywords })
}

/// Capture group 1 of every pattern, deduplicated in first-seen order.
fn extract_keywords(content: &str, patterns: &[&Lazy<Regex>]) -> String {
    let mut seen: Vec<String> = Vec::new();
    for pattern in patterns {
        for cap in pattern.captures_iter(content) {
            let word = cap[1].to_string();
            if !seen.contains(&word) {
                seen.push(word);
            }
        }
    }
    seen.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_python_keywords() {
        let src = "class Loader:\n    def load(self):\n        pass\n\ndef main():\n    pass\n";
        let kw = extract_keywords(src, &[&PY_DEF, &PY_CLASS]);
        assert_eq!(kw, "load main Loader");
    }

    #[test]
    fn test_sas_keywords_case_insensitive() {
        let src = "PROC MEANS data=work.sales;\nrun;\ndata work.sales;\nset raw;\nrun;\n";
        let kw = extract_keywords(src, &[&SAS_PROC, &SAS_DATA]);
        assert_eq!(kw, "MEANS work");
    }

    #[test]
    fn test_r_keywords() {
        let src = "summarize <- function(df) {\n  df\n}\nplot_all<-function(x) x\n";
        let kw = extract_keywords(src, &[&R_FUNCTION]);
        assert_eq!(kw, "summarize plot_all");
    }

    #[test]
    fn test_read_gb18030_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.txt");
        // "中文" encoded as GB18030
        let (encoded, _, _) = encoding_rs::GB18030.encode("中文报告");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&encoded).unwrap();

        let doc = parse_plain(&path).unwrap();
        assert_eq!(doc.content, "中文报告");
    }

    #[test]
    fn test_read_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.md");
        std::fs::write(&path, "# heading\nbody text").unwrap();
        let doc = parse_plain(&path).unwrap();
        assert!(doc.content.starts_with("# heading"));
        assert!(doc.keywords.is_empty());
    }
}
