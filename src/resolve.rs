//! Resolution of the literal query text flowing into a preparation call.
//!
//! Supported argument forms, in priority order:
//!
//! 1. a string literal;
//! 2. a local variable whose most recent prior assignment in the same method
//!    is a string literal that looks like SQL;
//! 3. an interpolated or concatenated string: literal segments are joined,
//!    embedded expressions are dropped and the result is marked opaque.
//!
//! Everything else resolves to `None` without any diagnostic.

use crate::host::{Expr, Location, Stmt, StrPart, Target, walk_expr, walk_stmts};

/// Statement keywords accepted by the "looks like SQL" check.
pub const SQL_KEYWORDS: [&str; 8] = [
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "REPLACE"
];

/// Query text recovered from a host expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedText {
    pub text:   String,
    /// Some segments were non-literal and have been elided
    pub opaque: bool
}

/// Conservative prefix check: does the trimmed text start with a statement
/// keyword (case-insensitive)?
pub fn looks_like_sql(text: &str) -> bool {
    let trimmed = text.trim_start();
    SQL_KEYWORDS.iter().any(|kw| {
        trimmed
            .get(..kw.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(kw))
            && !trimmed[kw.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Assignments to local variables inside one method, in textual order.
#[derive(Debug, Default)]
pub struct LocalAssignments<'a> {
    entries: Vec<(&'a str, Location, &'a Expr)>
}

impl<'a> LocalAssignments<'a> {
    pub fn collect(body: &'a [Stmt]) -> Self {
        let mut entries = Vec::new();
        walk_stmts(body, &mut |cx| {
            if let Stmt::Assign {
                target: Target::Local(name),
                value,
                location,
                ..
            } = cx.stmt
            {
                entries.push((name.as_str(), *location, value));
            }
            for (expr, _) in crate::host::visit::stmt_exprs(cx.stmt) {
                walk_expr(expr, &mut |node: &'a Expr| {
                    if let Expr::Assign {
                        target: Target::Local(name),
                        value,
                        location
                    } = node
                    {
                        entries.push((name.as_str(), *location, value.as_ref()));
                    }
                });
            }
        });
        entries.sort_by_key(|(_, location, _)| *location);
        Self {
            entries
        }
    }

    /// Value of the most recent assignment to `name` strictly before `at`.
    pub fn latest_before(&self, name: &str, at: Location) -> Option<&'a Expr> {
        self.entries
            .iter()
            .rev()
            .find(|(n, location, _)| *n == name && *location < at)
            .map(|(_, _, value)| *value)
    }
}

/// Resolve the query text of a preparation call's first argument.
pub fn resolve_query_text(
    arg: &Expr,
    at: Location,
    locals: &LocalAssignments<'_>
) -> Option<ResolvedText> {
    match arg {
        Expr::Str {
            value, ..
        } => Some(ResolvedText {
            text:   value.clone(),
            opaque: false
        }),
        Expr::Local {
            name, ..
        } => match locals.latest_before(name, at)? {
            Expr::Str {
                value, ..
            } if looks_like_sql(value) => Some(ResolvedText {
                text:   value.clone(),
                opaque: false
            }),
            _ => None
        },
        Expr::Interpolated {
            ..
        }
        | Expr::Concat {
            ..
        } => {
            let mut text = String::new();
            let mut opaque = false;
            let mut literal_seen = false;
            collect_segments(arg, &mut text, &mut opaque, &mut literal_seen);
            literal_seen.then_some(ResolvedText {
                text,
                opaque
            })
        }
        _ => None
    }
}

fn collect_segments(expr: &Expr, text: &mut String, opaque: &mut bool, literal_seen: &mut bool) {
    match expr {
        Expr::Str {
            value, ..
        } => {
            text.push_str(value);
            *literal_seen = true;
        }
        Expr::Interpolated {
            parts, ..
        } => {
            for part in parts {
                match part {
                    StrPart::Literal(value) => {
                        text.push_str(value);
                        *literal_seen = true;
                    }
                    StrPart::Expr(inner) => collect_segments(inner, text, opaque, literal_seen)
                }
            }
        }
        Expr::Concat {
            left,
            right,
            ..
        } => {
            collect_segments(left, text, opaque, literal_seen);
            collect_segments(right, text, opaque, literal_seen);
        }
        _ => *opaque = true
    }
}
