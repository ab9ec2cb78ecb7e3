//! Quote-aware text scanning for embedded query text.
//!
//! Named placeholders (`:name`) are only recognised outside single- and
//! double-quoted regions. The scan is a single left-to-right pass that tracks
//! the two quote states and, while inside a quoted region, skips the character
//! following a backslash.

use std::ops::Range;

use compact_str::CompactString;
use indexmap::IndexSet;

/// Parameter marker substituted for placeholders before parsing, unless the
/// dialect asks for another one.
pub const NEUTRAL_MARKER: &str = "?";

/// A placeholder occurrence in query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken<'a> {
    /// Name without the leading colon
    pub name:  &'a str,
    /// Byte range including the colon
    pub range: Range<usize>
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Locate every placeholder outside quoted regions, in textual order.
pub fn scan_placeholders(sql: &str) -> Vec<PlaceholderToken<'_>> {
    let mut tokens = Vec::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut prev: Option<char> = None;
    let mut chars = sql.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if in_single_quote || in_double_quote {
            if c == '\\' {
                chars.next();
                prev = None;
                continue;
            }
            if in_single_quote && c == '\'' {
                in_single_quote = false;
            } else if in_double_quote && c == '"' {
                in_double_quote = false;
            }
            prev = Some(c);
            continue;
        }
        match c {
            '\'' => in_single_quote = true,
            '"' => in_double_quote = true,
            ':' if prev != Some(':') => {
                if let Some(&(start, next)) = chars.peek()
                    && is_name_start(next)
                {
                    let mut end = start;
                    while let Some(&(j, n)) = chars.peek() {
                        if !is_name_char(n) {
                            break;
                        }
                        end = j + n.len_utf8();
                        chars.next();
                    }
                    tokens.push(PlaceholderToken {
                        name:  &sql[start..end],
                        range: i..end
                    });
                    prev = sql[..end].chars().next_back();
                    continue;
                }
            }
            _ => {}
        }
        prev = Some(c);
    }
    tokens
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders(sql: &str) -> IndexSet<CompactString> {
    scan_placeholders(sql)
        .into_iter()
        .map(|t| CompactString::from(t.name))
        .collect()
}

/// Replace every placeholder outside quotes with `marker`.
///
/// Newlines are untouched, so rows in the result match rows in the input.
pub fn neutralize(sql: &str, marker: &str) -> String {
    let tokens = scan_placeholders(sql);
    if tokens.is_empty() {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    for token in tokens {
        out.push_str(&sql[cursor..token.range.start]);
        out.push_str(marker);
        cursor = token.range.end;
    }
    out.push_str(&sql[cursor..]);
    out
}

/// Lexical region of SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Single,
    Double,
    Backtick,
    LineComment,
    BlockComment
}

/// Walk `sql` reporting the region each character belongs to. Delimiters
/// (quotes, comment markers) are reported as [`Region::Code`].
fn for_each_region<F>(sql: &str, mut callback: F)
where
    F: FnMut(usize, char, Region)
{
    let mut region = Region::Code;
    let mut chars = sql.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match region {
            Region::Code => {
                callback(i, c, Region::Code);
                match c {
                    '\'' => region = Region::Single,
                    '"' => region = Region::Double,
                    '`' => region = Region::Backtick,
                    '#' => region = Region::LineComment,
                    '-' if matches!(chars.peek(), Some((_, '-'))) => {
                        if let Some((j, d)) = chars.next() {
                            callback(j, d, Region::Code);
                        }
                        region = Region::LineComment;
                    }
                    '/' if matches!(chars.peek(), Some((_, '*'))) => {
                        if let Some((j, d)) = chars.next() {
                            callback(j, d, Region::Code);
                        }
                        region = Region::BlockComment;
                    }
                    _ => {}
                }
            }
            Region::Single | Region::Double | Region::Backtick => {
                let closing = match region {
                    Region::Single => '\'',
                    Region::Double => '"',
                    _ => '`'
                };
                if c == '\\' && region != Region::Backtick {
                    callback(i, c, region);
                    if let Some((j, d)) = chars.next() {
                        callback(j, d, region);
                    }
                } else if c == closing {
                    callback(i, c, Region::Code);
                    region = Region::Code;
                } else {
                    callback(i, c, region);
                }
            }
            Region::LineComment => {
                if c == '\n' {
                    callback(i, c, Region::Code);
                    region = Region::Code;
                } else {
                    callback(i, c, region);
                }
            }
            Region::BlockComment => {
                if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                    callback(i, c, Region::Code);
                    if let Some((j, d)) = chars.next() {
                        callback(j, d, Region::Code);
                    }
                    region = Region::Code;
                } else {
                    callback(i, c, region);
                }
            }
        }
    }
}

/// Blank out string literal contents and comments, keeping byte offsets and
/// newlines intact. Backtick-quoted identifiers are kept.
pub fn mask_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    for_each_region(sql, |_, c, region| match region {
        Region::Code | Region::Backtick => out.push(c),
        _ if c == '\n' => out.push('\n'),
        _ => out.extend(std::iter::repeat_n(' ', c.len_utf8()))
    });
    out
}

/// One statement of a multi-statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementChunk<'a> {
    pub text:  &'a str,
    /// Byte offset of `text` within the whole input
    pub start: usize
}

/// Split `sql` at top-level semicolons. Blank chunks are dropped.
pub fn split_statements(sql: &str) -> Vec<StatementChunk<'_>> {
    let mut cuts = Vec::new();
    for_each_region(sql, |i, c, region| {
        if region == Region::Code && c == ';' {
            cuts.push(i);
        }
    });
    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(sql.len())) {
        let text = &sql[start..cut];
        if !text.trim().is_empty() {
            chunks.push(StatementChunk {
                text,
                start
            });
        }
        start = (cut + 1).min(sql.len());
    }
    chunks
}

/// Zero-based row of byte `offset` within `text`.
pub fn row_at(text: &str, offset: usize) -> u32 {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_in_order() {
        let names = placeholders("SELECT * FROM t WHERE a = :a AND b = :b OR a = :a");
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_placeholders_ignore_quoted_text() {
        let names = placeholders("SELECT ':skip', \"x:skip\" FROM t WHERE id = :id");
        assert_eq!(names.len(), 1);
        assert!(names.contains("id"));
    }

    #[test]
    fn test_escaped_quote_keeps_region_open() {
        let names = placeholders(r"SELECT 'it\'s :not' FROM t WHERE x = :yes");
        assert_eq!(names.len(), 1);
        assert!(names.contains("yes"));
    }

    #[test]
    fn test_double_colon_cast_is_not_placeholder() {
        assert!(placeholders("SELECT created::date FROM t").is_empty());
    }

    #[test]
    fn test_time_literal_digits_are_not_placeholders() {
        assert!(placeholders("SELECT * FROM t WHERE at > 10:30").is_empty());
    }

    #[test]
    fn test_neutralize_replaces_outside_quotes_only() {
        let out = neutralize("SELECT ':keep' FROM t WHERE id = :id\nAND n = :n", NEUTRAL_MARKER);
        assert_eq!(out, "SELECT ':keep' FROM t WHERE id = ?\nAND n = ?");
        let out = neutralize("SELECT id FROM t WHERE id = :id AND n = :n", "$1");
        assert_eq!(out, "SELECT id FROM t WHERE id = $1 AND n = $1");
    }

    #[test]
    fn test_split_statements_respects_quotes_and_comments() {
        let chunks = split_statements("SELECT ';' FROM a; -- x; y\nSELECT 2;");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "SELECT ';' FROM a");
        assert_eq!(chunks[1].start, 18);
    }

    #[test]
    fn test_mask_literals_keeps_offsets() {
        let sql = "SELECT 'NOW()' /* NOW() */, NOW()";
        let masked = mask_literals(sql);
        assert_eq!(masked.len(), sql.len());
        assert_eq!(masked.matches("NOW").count(), 1);
    }

    #[test]
    fn test_row_at() {
        let text = "SELECT\n*\nFROM t";
        assert_eq!(row_at(text, 0), 0);
        assert_eq!(row_at(text, 9), 2);
        assert_eq!(row_at(text, 999), 2);
    }
}
