//! Snippet extraction and highlighting / 摘要生成与高亮
//!
//! Two contexts: excerpts coming back from the FTS index already carry
//! `<b>` markers and only need metadata-tag styling; substring-fallback
//! results carry full document text and need the excerpt built by hand,
//! keeping the nearest structural location marker (page/sheet/slide/...)
//! in view so the UI can show where the match came from.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default context width (characters either side of the match) / 默认上下文宽度
pub const DEFAULT_CONTEXT: usize = 100;

/// Structural location markers embedded by the format parsers
static LOCATION_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(Page|Sheet|Row|Col|Slide|Para|Table):[^\]]+\]").expect("location pattern"));

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\[(?:Page|Sheet|Row|Col|Slide|Para|Table)[^\]]*\])").expect("meta pattern"));

/// Wrap structural markers for distinct UI styling / 为结构标记包裹样式标签
pub fn highlight_metadata(text: &str) -> String {
    META_TAG
        .replace_all(text, "<span class=\"meta\">$1</span>")
        .into_owned()
}

/// Wrap every case-insensitive occurrence of `term` in bold markers / 高亮关键词
pub fn highlight_term(text: &str, term: &str) -> String {
    if term.is_empty() {
        return text.to_string();
    }
    match Regex::new(&format!("(?i){}", regex::escape(term))) {
        Ok(re) => re.replace_all(text, "<b>$0</b>").into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Strip highlight markers before quality filtering / 去除高亮标记
pub fn strip_markup(text: &str) -> String {
    text.replace("<b>", "").replace("</b>", "")
}

/// Count case-insensitive occurrences / 统计出现次数（忽略大小写）
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack
        .to_lowercase()
        .matches(&needle.to_lowercase())
        .count()
}

/// Build an excerpt around the first match of `term` / 生成带位置信息的摘要
///
/// 1. First case-insensitive occurrence; absent → plain preview of the
///    first `2×context` characters.
/// 2. Tentative window `[idx − context, idx + term_len + context]`.
/// 3. If a location marker sits within `2×context` characters before the
///    match, the window start moves to it, widening or narrowing the left
///    side so the excerpt keeps its structural context.
/// 4. Ellipses mark clipped edges; every in-window occurrence of the term
///    gets bold markers.
pub fn generate_snippet(content: &str, term: &str, context: usize) -> String {
    if content.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = content.chars().collect();

    let Some(idx) = find_case_insensitive(&chars, term) else {
        let preview: String = chars.iter().take(context * 2).collect();
        return format!("{}...", preview);
    };

    let mut start = idx.saturating_sub(context);

    // 向前查找最近的位置标记
    let before: String = chars[..idx].iter().collect();
    if let Some(tag) = LOCATION_TAG.find_iter(&before).last() {
        let tag_start = before[..tag.start()].chars().count();
        if idx - tag_start < context * 2 {
            start = tag_start;
        }
    }

    let term_len = term.chars().count();
    let end = (idx + term_len + context).min(chars.len());

    let mut snippet: String = chars[start..end].iter().collect();
    if start > 0 {
        snippet = format!("...{}", snippet);
    }
    if end < chars.len() {
        snippet.push_str("...");
    }

    highlight_term(&snippet, term)
}

/// Character-indexed case-insensitive search. Byte offsets from a lowercased
/// copy are unsafe to apply to the original, so match char by char.
fn find_case_insensitive(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().map(fold_char).collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()]
            .iter()
            .zip(&needle)
            .all(|(h, n)| fold_char(*h) == *n)
    })
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
