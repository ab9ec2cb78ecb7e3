use compact_str::CompactString;
use indexmap::IndexSet;
use regex::Regex;
use sqlparser::ast::Expr;

use super::{QueryContext, Rule};
use crate::{
    diagnostic::{Category, Diagnostic},
    scan,
    sql::{
        alias::AliasMap,
        lines::LineLocator,
        walk::{StatementParts, column_reference, visit_expr}
    }
};

/// Qualifiers that name no table, alias, derived table or CTE of the query.
pub struct InvalidTableReference;

/// Qualifiers used by column references and `q.*` items, in order of first
/// appearance, deduplicated case-insensitively.
fn used_qualifiers(parts: &StatementParts<'_>) -> Vec<String> {
    let mut seen: IndexSet<CompactString> = IndexSet::new();
    let mut out = Vec::new();
    let mut push = |q: &str| {
        if seen.insert(CompactString::from(q.to_lowercase())) {
            out.push(q.to_string());
        }
    };
    for expr in &parts.references {
        visit_expr(expr, &mut |node: &Expr| {
            if let Some((Some(qualifier), _)) = column_reference(node) {
                push(qualifier);
            }
        });
    }
    for name in &parts.wildcard_qualifiers {
        let written = name.to_string();
        if let Some(last) = written.rsplit('.').next() {
            push(last.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']')));
        }
    }
    out
}

/// Byte offsets of `qualifier.` in masked text, as a whole word.
fn occurrences(masked: &str, qualifier: &str) -> Vec<usize> {
    let pattern = format!(r"(?i)(?:^|[^\w.$`])`?{}`?\s*\.", regex::escape(qualifier));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    re.find_iter(masked)
        .map(|m| {
            let text = m.as_str();
            let skip = text
                .char_indices()
                .find(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '`')
                .map_or(0, |(i, _)| i);
            m.start() + skip
        })
        .collect()
}

impl Rule for InvalidTableReference {
    fn category(&self) -> Category {
        Category::InvalidTableReference
    }

    fn check(&self, cx: &QueryContext<'_>, lines: &mut LineLocator<'_>) -> Vec<Diagnostic> {
        let Some(statements) = cx.statements() else {
            return vec![];
        };
        let masked = scan::mask_literals(lines.text());
        let mut diagnostics = Vec::new();
        for statement in statements {
            let parts = StatementParts::collect(statement);
            let aliases = AliasMap::from_sources(&parts.sources);
            if aliases.is_empty() {
                continue;
            }
            let valid = aliases.qualifiers().join(", ");
            for qualifier in used_qualifiers(&parts) {
                if aliases.contains(&qualifier) {
                    continue;
                }
                let message = format!(
                    "Unknown table or alias '{}'; valid qualifiers in this query: {}",
                    qualifier, valid
                );
                let suggestion = format!("Use one of: {}", valid);
                let rows: Vec<u32> = occurrences(&masked, &qualifier)
                    .into_iter()
                    .map(|offset| scan::row_at(&masked, offset))
                    .collect();
                if rows.is_empty() {
                    diagnostics.push(
                        Diagnostic::new(self.category(), message, cx.anchor)
                            .with_suggestion(suggestion)
                    );
                    continue;
                }
                for row in rows {
                    diagnostics.push(
                        Diagnostic::new(self.category(), message.clone(), cx.location_at_row(row))
                            .with_suggestion(suggestion.clone())
                    );
                }
            }
        }
        diagnostics
    }
}
