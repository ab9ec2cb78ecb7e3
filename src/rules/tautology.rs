use std::sync::LazyLock;

use regex::Regex;
use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value};

use super::{QueryContext, Rule};
use crate::{
    diagnostic::{Category, Diagnostic},
    sql::{
        lines::{LineLocator, comparison_pattern},
        walk::{StatementParts, conjuncts}
    }
};

/// Cheap test for something that looks like `<literal> = <literal>`, either
/// side optionally parenthesized.
static LITERAL_EQUALITY: LazyLock<Regex> = LazyLock::new(|| {
    let literal = r#"(?:-?\d+(?:\.\d+)?|'[^']*'|"[^"]*"|\btrue\b|\bfalse\b)"#;
    Regex::new(&format!(r"(?i){literal}(?:\s*\))*\s*=(?:\s*\()*\s*{literal}"))
        .expect("valid literal regex")
});

/// Conditions comparing two literals, e.g. `WHERE 1 = 1`.
pub struct Tautology;

#[derive(Debug, Clone, PartialEq)]
enum Literal<'a> {
    Number(f64, &'a str),
    Text(&'a str),
    Bool(bool)
}

impl Literal<'_> {
    fn numeric(&self) -> Option<f64> {
        match self {
            Self::Number(n, _) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.trim().parse().ok()
        }
    }
}

fn literal(expr: &Expr) -> Option<Literal<'_>> {
    match expr {
        Expr::Value(v) => match &v.value {
            Value::Number(n, _) => n.parse().ok().map(|f| Literal::Number(f, n.as_str())),
            Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => {
                Some(Literal::Text(s.as_str()))
            }
            Value::Boolean(b) => Some(Literal::Bool(*b)),
            _ => None
        },
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr
        } => match literal(expr)? {
            Literal::Number(n, text) => Some(Literal::Number(-n, text)),
            _ => None
        },
        Expr::Nested(inner) => literal(inner),
        _ => None
    }
}

/// Whether two literals compare equal.
fn literals_equal(left: &Literal<'_>, right: &Literal<'_>) -> bool {
    match (left, right) {
        (Literal::Text(a), Literal::Text(b)) => a == b,
        (Literal::Text(text), Literal::Number(_, number))
        | (Literal::Number(_, number), Literal::Text(text)) => {
            match (left.numeric(), right.numeric()) {
                (Some(a), Some(b)) => a == b,
                _ => text == number
            }
        }
        _ => left.numeric() == right.numeric()
    }
}

impl Rule for Tautology {
    fn category(&self) -> Category {
        Category::Tautology
    }

    fn check(&self, cx: &QueryContext<'_>, lines: &mut LineLocator<'_>) -> Vec<Diagnostic> {
        if !LITERAL_EQUALITY.is_match(&cx.neutralized) {
            return vec![];
        }
        let Some(statements) = cx.statements() else {
            return vec![];
        };
        let mut diagnostics = Vec::new();
        for statement in statements {
            let parts = StatementParts::collect(statement);
            for condition in &parts.conditions {
                for expr in conjuncts(condition) {
                    let Expr::BinaryOp {
                        left,
                        op: BinaryOperator::Eq,
                        right
                    } = expr
                    else {
                        continue;
                    };
                    let (Some(a), Some(b)) = (literal(left), literal(right)) else {
                        continue;
                    };
                    let verdict = if literals_equal(&a, &b) {
                        "always true"
                    } else {
                        "always false"
                    };
                    let row = lines.next_row(&comparison_pattern(left, "=", right));
                    diagnostics.push(
                        Diagnostic::new(
                            self.category(),
                            format!("Condition '{}' is {}", expr, verdict),
                            cx.location_at_row(row)
                        )
                        .with_suggestion("Remove the constant condition or compare against a column")
                    );
                }
            }
        }
        diagnostics
    }
}
