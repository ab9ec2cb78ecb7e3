//! Parser for lightweight result-shape annotations.
//!
//! Accepted forms:
//!
//! ```text
//! array{id: int, name?: string}          single row
//! object{id: int}                        single row (fetchObject)
//! list<array{...}> / array<int, ...>     collection of rows
//! array{...}[]                           collection of rows
//! UserRow / list<UserRow>                alias declared on the type
//! array{...}|false                       single row or the no-rows sentinel
//! ```

use std::sync::LazyLock;

use compact_str::CompactString;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::host::{Location, TypeAlias};

/// Union member standing for "no row": `|false` / `false|`, any spacing.
static SENTINEL_UNION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\|\s*false\b|\bfalse\s*\|)").expect("valid sentinel regex")
});

const MAX_ALIAS_DEPTH: usize = 8;

/// Whether a shape describes one row or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arrayness {
    Scalar,
    Collection
}

/// A parsed result-shape annotation.
#[derive(Debug, Clone, Serialize)]
pub struct ShapeAnnotation {
    /// Declared field name -> declared type text
    pub fields:          IndexMap<CompactString, String>,
    pub arrayness:       Arrayness,
    pub location:        Location,
    pub raw_text:        String,
    /// The union (directly or through an alias) includes the sentinel
    pub admits_sentinel: bool
}

impl ShapeAnnotation {
    /// Parse `raw`, resolving alias names through `aliases`.
    ///
    /// Returns `None` when the text does not describe a record shape.
    pub fn parse(raw: &str, location: Location, aliases: &[TypeAlias]) -> Option<Self> {
        let mut admits_sentinel = SENTINEL_UNION.is_match(raw);
        let (fields, arrayness) = resolve(raw, aliases, 0, &mut admits_sentinel)?;
        Some(Self {
            fields,
            arrayness,
            location,
            raw_text: raw.to_string(),
            admits_sentinel
        })
    }
}

type Resolved = (IndexMap<CompactString, String>, Arrayness);

fn resolve(
    text: &str,
    aliases: &[TypeAlias],
    depth: usize,
    admits_sentinel: &mut bool
) -> Option<Resolved> {
    let members: Vec<&str> = split_top_level(text, '|')
        .into_iter()
        .map(str::trim)
        .filter(|m| !m.eq_ignore_ascii_case("false") && !m.eq_ignore_ascii_case("null"))
        .collect();
    let [member] = members.as_slice() else {
        return None;
    };
    resolve_member(member, aliases, depth, admits_sentinel)
}

fn resolve_member(
    member: &str,
    aliases: &[TypeAlias],
    depth: usize,
    admits_sentinel: &mut bool
) -> Option<Resolved> {
    let member = member.trim().trim_start_matches('?').trim();
    if let Some(inner) = member.strip_suffix("[]") {
        return row_of_collection(inner, aliases, depth);
    }
    if let Some((name, args)) = generic_parts(member) {
        let element = match name.to_ascii_lowercase().as_str() {
            "list" | "non-empty-list" | "iterable" | "array" | "non-empty-array" => {
                args.last().copied()
            }
            _ => None
        }?;
        return row_of_collection(element, aliases, depth);
    }
    if let Some(body) = record_body(member) {
        return Some((parse_fields(body), Arrayness::Scalar));
    }
    if depth >= MAX_ALIAS_DEPTH {
        return None;
    }
    let alias = aliases.iter().find(|a| a.name == member)?;
    if SENTINEL_UNION.is_match(&alias.text) {
        *admits_sentinel = true;
    }
    resolve(&alias.text, aliases, depth + 1, admits_sentinel)
}

fn row_of_collection(element: &str, aliases: &[TypeAlias], depth: usize) -> Option<Resolved> {
    // A sentinel inside the element type says nothing about the fetch result.
    let mut ignored = false;
    match resolve(element, aliases, depth + 1, &mut ignored)? {
        (fields, Arrayness::Scalar) => Some((fields, Arrayness::Collection)),
        (_, Arrayness::Collection) => None
    }
}

/// `name<a, b>` -> (`name`, [`a`, `b`]).
fn generic_parts(text: &str) -> Option<(&str, Vec<&str>)> {
    let open = text.find('<')?;
    let inner = text.strip_suffix('>')?.get(open + 1..)?;
    let name = text[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some((name, split_top_level(inner, ',').into_iter().map(str::trim).collect()))
}

/// Content between the braces of `array{...}` / `object{...}`.
fn record_body(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let head = text[..open].trim();
    if !head.eq_ignore_ascii_case("array") && !head.eq_ignore_ascii_case("object") {
        return None;
    }
    text.strip_suffix('}')?.get(open + 1..)
}

fn parse_fields(body: &str) -> IndexMap<CompactString, String> {
    let mut fields = IndexMap::new();
    for entry in split_top_level(body, ',') {
        let entry = entry.trim();
        if entry.is_empty() || entry == "..." {
            continue;
        }
        let Some(colon) = top_level_position(entry, ':') else {
            continue;
        };
        let key = entry[..colon]
            .trim()
            .trim_end_matches('?')
            .trim_matches(|c| c == '\'' || c == '"');
        if key.is_empty() {
            continue;
        }
        fields.insert(CompactString::from(key), entry[colon + 1..].trim().to_string());
    }
    fields
}

fn top_level_position(text: &str, separator: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '{' | '<' | '(' | '[') => depth += 1,
            (None, '}' | '>' | ')' | ']') => depth -= 1,
            (None, c) if c == separator && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split at `separator` occurrences outside brackets and quotes.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(pos) = top_level_position(rest, separator) {
        parts.push(&rest[..pos]);
        rest = &rest[pos + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}
