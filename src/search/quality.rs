//! Search precision levels and content-quality filtering / 搜索精度与内容质量过滤
//!
//! The quality filter is an ordered list of pure reject-predicates evaluated
//! short-circuit. It throws away degenerate excerpt fragments (lone symbols,
//! digit runs, a letter wrapped in punctuation) before a result reaches the
//! caller. Highlight markup must be stripped by the caller first.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Search precision level / 搜索精度级别
///
/// Only `Exact` changes control flow here (it disables term expansion).
/// The threshold table is carried for external tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionLevel {
    Exact,
    High,
    #[default]
    Medium,
    Loose,
    VeryLoose,
}

impl PrecisionLevel {
    /// 精度级别对应的阈值（供外部模糊匹配调参用）
    pub fn threshold(self) -> u32 {
        match self {
            PrecisionLevel::Exact => 90,
            PrecisionLevel::High => 80,
            PrecisionLevel::Medium => 70,
            PrecisionLevel::Loose => 60,
            PrecisionLevel::VeryLoose => 50,
        }
    }
}

/// Blacklist patterns for degenerate fragments / 内容质量黑名单模式
static BLACKLIST: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^[^\w\x{4e00}-\x{9fff}]+$",       // 只包含特殊符号
        r"^[0-9\s\.\-_]+$",                 // 只包含数字和基本符号
        r"^[a-zA-Z]{1,2}$",                 // 单个或两个字母
        r"^\W{1,3}$",                       // 1-3个非单词字符
        r"^[^\w\x{4e00}-\x{9fff}\s]{1,5}$", // 1-5个非字母数字汉字字符
        r"^[a-zA-Z]\W*$",                   // 单个字母后跟特殊字符
        r"^\W*[a-zA-Z]\W*$",                // 被特殊字符包围的单个字母
    ]
    .iter()
    .map(|p| Regex::new(p).expect("blacklist pattern"))
    .collect()
});

static LETTER_THEN_SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]\W+$").expect("quality pattern"));

/// Ordered reject rules, evaluated short-circuit / 顺序求值的拒绝规则
const REJECT_RULES: &[fn(&str) -> bool] = &[
    reject_too_short,
    reject_letter_then_symbols,
    reject_degenerate_short,
    reject_blacklisted,
];

/// Is this text fragment worth returning as a search excerpt? / 内容质量检查
pub fn is_acceptable(content: &str) -> bool {
    let content = content.trim();
    if content.is_empty() {
        return false;
    }
    !REJECT_RULES.iter().any(|rule| rule(content))
}

fn reject_too_short(content: &str) -> bool {
    content.chars().count() < 2
}

/// 专门捕获 "u(" 这类模式
fn reject_letter_then_symbols(content: &str) -> bool {
    LETTER_THEN_SYMBOLS.is_match(content)
}

/// 长度 ≤3 且几乎只有符号的碎片，如 "a)"、"x!"
fn reject_degenerate_short(content: &str) -> bool {
    if content.chars().count() > 3 {
        return false;
    }
    let alpha = content.chars().filter(|c| c.is_alphabetic()).count();
    let punct = content.chars().filter(|c| c.is_ascii_punctuation()).count();
    alpha <= 1 && punct >= 1
}

fn reject_blacklisted(content: &str) -> bool {
    BLACKLIST.iter().any(|p| p.is_match(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(!is_acceptable(""));
        assert!(!is_acceptable("   "));
        assert!(!is_acceptable("a"));
    }

    #[test]
    fn test_rejects_letter_plus_symbols() {
        assert!(!is_acceptable("u("));
        assert!(!is_acceptable("a)"));
        assert!(!is_acceptable("x!!"));
        assert!(!is_acceptable("(x)"));
    }

    #[test]
    fn test_rejects_digit_and_symbol_runs() {
        assert!(!is_acceptable("1234"));
        assert!(!is_acceptable("12.5 - 3"));
        assert!(!is_acceptable("---"));
        assert!(!is_acceptable("!!!"));
    }

    #[test]
    fn test_rejects_short_letter_runs() {
        assert!(!is_acceptable("ab"));
    }

    #[test]
    fn test_accepts_real_content() {
        assert!(is_acceptable("revenue grew 10%"));
        assert!(is_acceptable("样本量计算"));
        assert!(is_acceptable("proc sort data=demo"));
        assert!(is_acceptable("文档"));
    }

    #[test]
    fn test_precision_thresholds() {
        assert_eq!(PrecisionLevel::Exact.threshold(), 90);
        assert_eq!(PrecisionLevel::Medium.threshold(), 70);
        assert_eq!(PrecisionLevel::VeryLoose.threshold(), 50);
        assert_eq!(PrecisionLevel::default(), PrecisionLevel::Medium);
    }
}
