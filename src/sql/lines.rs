//! Mapping of flagged expressions back to rows of the query text.
//!
//! The parsed statement carries no usable source offsets for the flagged
//! expressions, so their text is searched for instead. The n-th time a
//! pattern is located within one query it maps to its n-th textual
//! occurrence. Occurrences are computed once per pattern.

use std::collections::HashMap;

use regex::Regex;
use sqlparser::ast::Expr;

use crate::scan;

/// Occurrence cache for one query. Build a new one for every query.
#[derive(Debug)]
pub struct LineLocator<'t> {
    text:        &'t str,
    occurrences: HashMap<String, Vec<usize>>,
    next:        HashMap<String, usize>
}

impl<'t> LineLocator<'t> {
    pub fn new(text: &'t str) -> Self {
        Self {
            text,
            occurrences: HashMap::new(),
            next: HashMap::new()
        }
    }

    pub fn text(&self) -> &'t str {
        self.text
    }

    /// 0-based row of the next occurrence of the regex `pattern`.
    ///
    /// Once the occurrences run out the last one is reused; a pattern that
    /// never matches maps to row 0.
    pub fn next_row(&mut self, pattern: &str) -> u32 {
        let text = self.text;
        let offsets = self
            .occurrences
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(pattern) {
                Ok(re) => re.find_iter(text).map(|m| m.start()).collect(),
                Err(_) => Vec::new()
            });
        let counter = self.next.entry(pattern.to_string()).or_insert(0);
        let offset = offsets
            .get(*counter)
            .or_else(|| offsets.last())
            .copied();
        *counter += 1;
        offset.map_or(0, |offset| scan::row_at(text, offset))
    }
}

/// Regex matching the source text of `expr`, tolerant to spacing and case.
pub fn expr_pattern(expr: &Expr) -> String {
    let rendered = expr.to_string();
    let mut pattern = String::new();
    for (i, word) in rendered.split_whitespace().enumerate() {
        if i > 0 {
            pattern.push_str(r"\s+");
        }
        let parts: Vec<String> = word.split('.').map(regex::escape).collect();
        pattern.push_str(&parts.join(r"\s*\.\s*"));
    }
    pattern
}

/// Regex for `left <op> right`. `<>` also matches `!=`.
pub fn comparison_pattern(left: &Expr, symbol: &str, right: &Expr) -> String {
    let op = match symbol {
        "<>" => "(?:<>|!=)".to_string(),
        other => regex::escape(other)
    };
    format!(
        r"(?i){}\s*{}\s*{}",
        expr_pattern(left),
        op,
        expr_pattern(right)
    )
}
