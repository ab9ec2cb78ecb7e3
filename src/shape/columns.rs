//! Output column names of a SELECT, derived from its text.
//!
//! The projection of the first top-level `SELECT` is split at top-level
//! commas. Each item contributes its alias, the last part of a qualified name,
//! or the trimmed expression text. A wildcard makes the whole list
//! undecidable.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::scan;

pub type ColumnVec = SmallVec<[CompactString; 8]>;

/// Result of deriving the output columns of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectColumns {
    /// `*`, `t.*`, or no top-level SELECT at all
    Undecidable,
    Columns(ColumnVec)
}

const MODIFIERS: [&str; 7] = [
    "DISTINCT",
    "ALL",
    "DISTINCTROW",
    "SQL_CALC_FOUND_ROWS",
    "HIGH_PRIORITY",
    "STRAIGHT_JOIN",
    "SQL_NO_CACHE"
];

const PROJECTION_END: [&str; 10] = [
    "FROM", "UNION", "WHERE", "INTO", "GROUP", "ORDER", "LIMIT", "HAVING", "WINDOW", "FOR"
];

/// Words that end an expression without being an implicit alias.
const NOT_ALIAS: [&str; 8] = ["END", "NULL", "TRUE", "FALSE", "ASC", "DESC", "AND", "OR"];

pub fn derive_select_columns(sql: &str) -> SelectColumns {
    let masked = filled_mask(sql);
    let Some(start) = find_keyword_at_depth0(&masked, 0, &["SELECT"]).map(|(_, end)| end) else {
        return SelectColumns::Undecidable;
    };
    let end = find_keyword_at_depth0(&masked, start, &PROJECTION_END)
        .map(|(begin, _)| begin)
        .unwrap_or(masked.len());
    let end = masked[start..end]
        .find(';')
        .map_or(end, |semicolon| start + semicolon);
    let mut projection = &sql[start..end];
    let mut masked_projection = &masked[start..end];
    loop {
        let trimmed = masked_projection.trim_start();
        let skipped = masked_projection.len() - trimmed.len();
        let word_len = leading_word_len(trimmed);
        let word = &trimmed[..word_len];
        if word_len == 0 || !MODIFIERS.iter().any(|m| m.eq_ignore_ascii_case(word)) {
            break;
        }
        projection = &projection[skipped + word_len..];
        masked_projection = &masked_projection[skipped + word_len..];
    }

    let mut columns = ColumnVec::new();
    let mut cursor = 0;
    for cut in top_level_commas(masked_projection)
        .into_iter()
        .chain(std::iter::once(masked_projection.len()))
    {
        let item = projection[cursor..cut].trim();
        let masked_item = masked_projection[cursor..cut].trim();
        cursor = cut + 1;
        if item.is_empty() {
            continue;
        }
        match item_name(item, masked_item) {
            Some(name) => columns.push(name),
            None => return SelectColumns::Undecidable
        }
    }
    if columns.is_empty() {
        SelectColumns::Undecidable
    } else {
        SelectColumns::Columns(columns)
    }
}

/// Like [`scan::mask_literals`], but quoted and commented characters become
/// `_` so a quoted name stays one word. Byte offsets match `sql`.
fn filled_mask(sql: &str) -> String {
    let masked = scan::mask_literals(sql);
    let mut out = String::with_capacity(sql.len());
    for (i, c) in sql.char_indices() {
        if masked.as_bytes().get(i) == Some(&b' ') && !c.is_whitespace() {
            out.extend(std::iter::repeat_n('_', c.len_utf8()));
        } else {
            out.push(c);
        }
    }
    out
}

/// Output name of one projection item, `None` for a wildcard.
fn item_name(item: &str, masked: &str) -> Option<CompactString> {
    if masked == "*" || masked.ends_with(".*") {
        return None;
    }
    let words: Vec<(usize, &str)> = top_level_words(masked);
    if let [.., (_, as_kw), (alias_at, alias)] = words.as_slice()
        && as_kw.eq_ignore_ascii_case("AS")
    {
        return Some(unquote(&item[*alias_at..*alias_at + alias.len()]));
    }
    if let [.., (prev_at, prev), (alias_at, alias)] = words.as_slice()
        && is_plain_identifier(alias)
        && !NOT_ALIAS.iter().any(|w| w.eq_ignore_ascii_case(alias))
        && ends_operand(&masked[..*alias_at], prev_at + prev.len())
    {
        return Some(unquote(&item[*alias_at..*alias_at + alias.len()]));
    }
    if is_qualified_name(masked) {
        let last = masked.rsplit('.').next().unwrap_or(masked);
        return Some(unquote(&item[item.len() - last.len()..]));
    }
    Some(CompactString::from(item))
}

/// Does the text before an implicit alias end with a complete operand?
fn ends_operand(before: &str, prev_end: usize) -> bool {
    let head = before.trim_end();
    if head.len() != prev_end && !head.ends_with(')') {
        return false;
    }
    head.ends_with(')')
        || head
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '`' | '"' | ']' | '\''))
}

fn is_plain_identifier(word: &str) -> bool {
    let inner = word.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'));
    !inner.is_empty()
        && inner
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        && inner.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_qualified_name(text: &str) -> bool {
    text.split('.').all(is_plain_identifier)
}

fn unquote(name: &str) -> CompactString {
    CompactString::from(name.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']')))
}

/// Whitespace-separated words outside parentheses, with their byte offsets.
fn top_level_words(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut depth = 0i32;
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                if depth == 0
                    && let Some(s) = start.take()
                {
                    words.push((s, &text[s..i]));
                }
                depth += 1;
            }
            ')' => depth -= 1,
            c if depth == 0 && c.is_whitespace() => {
                if let Some(s) = start.take() {
                    words.push((s, &text[s..i]));
                }
            }
            _ if depth == 0 && start.is_none() => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }
    words
}

fn top_level_commas(masked: &str) -> Vec<usize> {
    let mut depth = 0i32;
    let mut cuts = Vec::new();
    for (i, c) in masked.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => cuts.push(i),
            _ => {}
        }
    }
    cuts
}

fn leading_word_len(text: &str) -> usize {
    text.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len())
}

/// First keyword from `keywords` at paren depth 0 at or after `from`, as a
/// byte range. Backtick-quoted identifiers are skipped.
fn find_keyword_at_depth0(masked: &str, from: usize, keywords: &[&str]) -> Option<(usize, usize)> {
    let bytes = masked.as_bytes();
    let mut depth = 0i32;
    let mut in_backtick = false;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'`' => in_backtick = !in_backtick,
            _ if in_backtick => {}
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 && (b.is_ascii_alphabetic() || b == b'_') => {
                let boundary = i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');
                let len = leading_word_len(&masked[i..]);
                if boundary
                    && keywords
                        .iter()
                        .any(|kw| kw.eq_ignore_ascii_case(&masked[i..i + len]))
                {
                    return Some((i, i + len));
                }
                i += len.max(1);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(sql: &str) -> Vec<String> {
        match derive_select_columns(sql) {
            SelectColumns::Columns(cols) => cols.iter().map(|c| c.to_string()).collect(),
            SelectColumns::Undecidable => panic!("undecidable: {}", sql)
        }
    }

    #[test]
    fn test_plain_and_qualified_columns() {
        assert_eq!(columns("SELECT id, u.name FROM users u"), vec!["id", "name"]);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            columns("SELECT COUNT(*) AS total, MAX(id) top, u.email addr FROM users u"),
            vec!["total", "top", "addr"]
        );
    }

    #[test]
    fn test_wildcards_are_undecidable() {
        assert_eq!(derive_select_columns("SELECT * FROM t"), SelectColumns::Undecidable);
        assert_eq!(derive_select_columns("SELECT id, t.* FROM t"), SelectColumns::Undecidable);
        assert_eq!(derive_select_columns("UPDATE t SET a = 1"), SelectColumns::Undecidable);
    }

    #[test]
    fn test_modifiers_and_quoting() {
        assert_eq!(
            columns("SELECT DISTINCT `id`, \"name\" FROM t WHERE x = 'a, b'"),
            vec!["id", "name"]
        );
    }

    #[test]
    fn test_subquery_in_projection() {
        assert_eq!(
            columns("SELECT id, (SELECT COUNT(*) FROM o WHERE o.u = u.id) AS orders FROM u"),
            vec!["id", "orders"]
        );
    }

    #[test]
    fn test_unaliased_expression_keeps_text() {
        assert_eq!(columns("SELECT COUNT(*) FROM t"), vec!["COUNT(*)"]);
        assert_eq!(columns("SELECT CASE WHEN a THEN 1 ELSE 0 END FROM t").len(), 1);
    }

    #[test]
    fn test_without_from() {
        assert_eq!(columns("SELECT 1 AS one"), vec!["one"]);
    }
}
