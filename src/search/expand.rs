//! Fuzzy term expansion / 模糊搜索扩展
//!
//! Expands one query term into at most [`MAX_EXPANSIONS`] variants:
//! spelling corrections, synonyms (two hops at most), and pinyin
//! transliterations for CJK terms. Truncation follows insertion order, so
//! the original term always survives.

use pinyin::ToPinyin;

/// Cap on the size of an expansion set / 扩展词数量上限
pub const MAX_EXPANSIONS: usize = 5;

/// Common misspellings: canonical term → observed errors / 常见拼写错误映射
const COMMON_ERRORS: &[(&str, &[&str])] = &[
    ("excel", &["execl", "exel", "exle"]),
    ("word", &["wrod", "wrold", "worrd"]),
    ("powerpoint", &["ppt", "pptx", "powerpiont"]),
    ("document", &["doc", "docx", "documnet"]),
    ("presentation", &["pres", "presen", "presn"]),
    ("spreadsheet", &["spread", "spredsheet", "sprd"]),
    ("文档", &["文件", "档案", "文本"]),
    ("表格", &["表单", "工作表", "电子表格"]),
    ("幻灯片", &["演示文稿", "演示", "PPT"]),
];

/// Synonym table. Directional: entries are looked up by key only, reverse
/// relations need their own entry. / 同义词映射（单向，反向需显式条目）
const SYNONYMS: &[(&str, &[&str])] = &[
    ("excel", &["表格", "工作表", "xls", "xlsx", "电子表格"]),
    ("word", &["文档", "doc", "docx", "文本"]),
    ("powerpoint", &["幻灯片", "ppt", "pptx", "演示文稿"]),
    ("document", &["文档", "文件", "档案"]),
    ("presentation", &["演示", "幻灯片", "讲演"]),
    ("文档", &["document", "doc", "docx", "文件"]),
    ("表格", &["excel", "xls", "xlsx", "电子表格"]),
    ("幻灯片", &["powerpoint", "ppt", "pptx", "演示文稿"]),
];

/// Ordered set of expansion terms. Downstream truncation depends on
/// insertion order being preserved, so this is a Vec with a membership
/// check instead of a hash set. / 保持插入顺序的扩展词集合
#[derive(Debug, Default)]
pub struct ExpansionSet {
    terms: Vec<String>,
}

impl ExpansionSet {
    pub fn insert(&mut self, term: impl Into<String>) {
        let term = term.into();
        if !term.is_empty() && !self.terms.contains(&term) {
            self.terms.push(term);
        }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Truncate to `cap` entries in insertion order / 按插入顺序截断
    pub fn into_terms(mut self, cap: usize) -> Vec<String> {
        self.terms.truncate(cap);
        self.terms
    }
}

/// Expand a single query term / 扩展查询词：纠错、同义词、拼音变体
///
/// The returned list always contains the lowercase-trimmed input as its
/// first element and has at most [`MAX_EXPANSIONS`] entries. Synonym
/// chasing is bounded to two hops: synonyms of the original and of any
/// correction/synonym found in the first pass, nothing transitive beyond.
pub fn expand_term(term: &str) -> Vec<String> {
    let query = term.trim().to_lowercase();
    let mut set = ExpansionSet::default();
    set.insert(query.clone());

    // 1. 常见错误纠正
    for (canonical, errors) in COMMON_ERRORS {
        if errors.contains(&query.as_str()) {
            set.insert(*canonical);
        }
    }

    // 2. 同义词扩展（先查原词）
    if let Some(syns) = synonym_lookup(&query) {
        for s in syns {
            set.insert(*s);
        }
    }

    // 3. 二跳：对第一轮产生的词再查一次同义词表，不再继续传递
    let snapshot: Vec<String> = set.terms.clone();
    for t in &snapshot {
        if let Some(syns) = synonym_lookup(t) {
            for s in syns {
                set.insert(*s);
            }
        }
    }

    // 4. 拼音扩展（仅当查询包含中文时）
    if contains_cjk(&query) {
        let (full, initials) = pinyin_variants(&query);
        if full != query {
            set.insert(full);
        }
        set.insert(initials);
    }

    set.into_terms(MAX_EXPANSIONS)
}

fn synonym_lookup(term: &str) -> Option<&'static [&'static str]> {
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == term)
        .map(|(_, syns)| *syns)
}

/// Full pinyin transliteration plus per-syllable initials / 拼音与首字母变体
///
/// Non-ideographic characters pass through unchanged in the full form and
/// are skipped for initials.
fn pinyin_variants(term: &str) -> (String, String) {
    let mut full = String::new();
    let mut initials = String::new();
    for ch in term.chars() {
        match ch.to_pinyin() {
            Some(p) => {
                full.push_str(p.plain());
                initials.push_str(p.first_letter());
            }
            None => full.push(ch),
        }
    }
    (full, initials)
}

/// Check for CJK ideographs / 检测是否包含中文字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}'))
}

/// Term classifier: does this term need the substring fallback? / 短中文词判定
///
/// The trigram FTS index cannot MATCH terms shorter than the gram length,
/// so 1-2 character CJK terms go through a direct LIKE scan instead. Short
/// purely-Latin terms still use the tokenized path and may simply return
/// no hits.
pub fn needs_substring_fallback(term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return false;
    }
    if term.chars().count() >= 3 {
        return false;
    }
    contains_cjk(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_contains_original_first() {
        let terms = expand_term("  Excel ");
        assert_eq!(terms[0], "excel");
        assert!(terms.len() <= MAX_EXPANSIONS);
    }

    #[test]
    fn test_correction_lookup() {
        let terms = expand_term("execl");
        assert!(terms.contains(&"excel".to_string()));
    }

    #[test]
    fn test_two_hop_bound() {
        // execl → excel (correction) → synonyms of excel, capped at 5
        let terms = expand_term("execl");
        assert_eq!(terms.len(), MAX_EXPANSIONS);
        assert_eq!(terms[0], "execl");
        assert_eq!(terms[1], "excel");
        // 第二跳来自 excel 的同义词
        assert!(terms.contains(&"表格".to_string()));
    }

    #[test]
    fn test_pinyin_variants_for_cjk() {
        let terms = expand_term("文档");
        assert_eq!(terms[0], "文档");
        assert!(terms.len() <= MAX_EXPANSIONS);
        // 同义词先占位，拼音可能被截断掉；直接验证变体函数
        let (full, initials) = pinyin_variants("文档");
        assert_eq!(full, "wendang");
        assert_eq!(initials, "wd");
    }

    #[test]
    fn test_no_expansion_for_unknown_term() {
        let terms = expand_term("banana");
        assert_eq!(terms, vec!["banana"]);
    }

    #[test]
    fn test_cap_at_five() {
        for probe in ["excel", "word", "文档", "表格", "ppt"] {
            assert!(expand_term(probe).len() <= MAX_EXPANSIONS);
        }
    }

    #[test]
    fn test_classifier_short_cjk() {
        assert!(needs_substring_fallback("中"));
        assert!(needs_substring_fallback("中文"));
        assert!(!needs_substring_fallback("中文词语"));
        assert!(!needs_substring_fallback("ok"));
        assert!(!needs_substring_fallback("abc"));
        assert!(!needs_substring_fallback(""));
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("测试"));
        assert!(contains_cjk("test测试"));
        assert!(!contains_cjk("test"));
    }
}
