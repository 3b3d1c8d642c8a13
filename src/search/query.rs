//! Logical query parsing (AND/OR) / 逻辑查询语法解析
//!
//! Flat single-operator model: a query either contains whitespace-bounded
//! `AND` literals, `OR` literals, or neither. AND is checked first and wins
//! when both are present. No precedence or parenthesis grammar.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static AND_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+AND\s+").unwrap());
static OR_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+OR\s+").unwrap());

/// Logical operator between query terms / 查询词之间的逻辑运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    None,
    And,
    Or,
}

/// Parsed query: operator + ordered term list / 解析后的查询
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub operator: Operator,
    pub terms: Vec<String>,
}

/// Parse a raw query string into (operator, terms) / 解析逻辑查询语法
///
/// `Operator::None` carries exactly one term: the whole trimmed query.
/// Empty segments produced by a split are silently dropped; the executor
/// short-circuits to an empty result list when nothing is left.
pub fn parse_logical_query(raw: &str) -> ParsedQuery {
    let query = raw.trim();

    // 优先处理 AND（更严格）
    if AND_SPLIT.is_match(query) {
        return ParsedQuery {
            operator: Operator::And,
            terms: split_terms(&AND_SPLIT, query),
        };
    }
    if OR_SPLIT.is_match(query) {
        return ParsedQuery {
            operator: Operator::Or,
            terms: split_terms(&OR_SPLIT, query),
        };
    }

    ParsedQuery {
        operator: Operator::None,
        terms: vec![query.to_string()],
    }
}

fn split_terms(splitter: &Regex, query: &str) -> Vec<String> {
    splitter
        .split(query)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_term() {
        let parsed = parse_logical_query("  revenue report ");
        assert_eq!(parsed.operator, Operator::None);
        assert_eq!(parsed.terms, vec!["revenue report"]);
    }

    #[test]
    fn test_and_split() {
        let parsed = parse_logical_query("alpha AND beta and gamma");
        assert_eq!(parsed.operator, Operator::And);
        assert_eq!(parsed.terms, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_or_split_case_insensitive() {
        let parsed = parse_logical_query("文档 or excel");
        assert_eq!(parsed.operator, Operator::Or);
        assert_eq!(parsed.terms, vec!["文档", "excel"]);
    }

    #[test]
    fn test_and_wins_over_or() {
        let parsed = parse_logical_query("a AND b OR c");
        assert_eq!(parsed.operator, Operator::And);
        // "b OR c" stays one segment, OR is not re-split
        assert_eq!(parsed.terms, vec!["a", "b OR c"]);
    }

    #[test]
    fn test_embedded_and_not_a_separator() {
        // "band" 内嵌的 and 不是分隔符
        let parsed = parse_logical_query("band practice");
        assert_eq!(parsed.operator, Operator::None);
        assert_eq!(parsed.terms, vec!["band practice"]);
    }

    #[test]
    fn test_mixed_case_literals() {
        let parsed = parse_logical_query("alpha And beta aNd gamma");
        assert_eq!(parsed.operator, Operator::And);
        assert_eq!(parsed.terms, vec!["alpha", "beta", "gamma"]);
    }
}
