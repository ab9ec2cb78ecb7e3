use sqlparser::ast::Expr;

use super::{QueryContext, Rule};
use crate::{
    diagnostic::{Category, Diagnostic},
    sql::{
        alias::AliasMap,
        lines::{LineLocator, comparison_pattern},
        walk::{StatementParts, column_reference, comparison_symbol, conjuncts}
    }
};

/// Comparisons of a column with itself, e.g. `a.id = users.id` where `a`
/// is an alias of `users`.
pub struct SelfReference;

/// `(table, column)` a reference resolves to, lowercased. Unqualified
/// references have no table.
fn resolved_column(expr: &Expr, aliases: &AliasMap) -> Option<(Option<String>, String)> {
    let (qualifier, column) = column_reference(expr)?;
    let table = qualifier.map(|q| {
        aliases
            .resolve(q)
            .map_or_else(|| q.to_lowercase(), str::to_string)
    });
    Some((table, column.to_lowercase()))
}

impl Rule for SelfReference {
    fn category(&self) -> Category {
        Category::SelfReference
    }

    fn check(&self, cx: &QueryContext<'_>, lines: &mut LineLocator<'_>) -> Vec<Diagnostic> {
        let Some(statements) = cx.statements() else {
            return vec![];
        };
        let mut diagnostics = Vec::new();
        for statement in statements {
            let parts = StatementParts::collect(statement);
            let aliases = AliasMap::from_sources(&parts.sources);
            for condition in &parts.conditions {
                for expr in conjuncts(condition) {
                    let Expr::BinaryOp {
                        left,
                        op,
                        right
                    } = expr
                    else {
                        continue;
                    };
                    let Some(symbol) = comparison_symbol(op) else {
                        continue;
                    };
                    let (Some(a), Some(b)) =
                        (resolved_column(left, &aliases), resolved_column(right, &aliases))
                    else {
                        continue;
                    };
                    if a != b {
                        continue;
                    }
                    let column = match &a {
                        (Some(table), column) => format!("{}.{}", table, column),
                        (None, column) => column.clone()
                    };
                    let row = lines.next_row(&comparison_pattern(left, symbol, right));
                    diagnostics.push(
                        Diagnostic::new(
                            self.category(),
                            format!("Condition '{}' compares {} with itself", expr, column),
                            cx.location_at_row(row)
                        )
                        .with_suggestion("Compare against the intended column of another table")
                    );
                }
            }
        }
        diagnostics
    }
}
