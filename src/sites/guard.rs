//! Detection of code that handles a fetch returning no row.

use serde::Serialize;

use crate::host::{BinaryOp, CallKind, Expr, Role, Stmt, StmtCx, Target, classify};

/// How a single-row fetch is protected against the "no rows" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchGuard {
    None,
    /// An earlier `if (rowCount() == 0)` whose body throws or returns
    RowCountGuarded,
    /// The fetched value is compared against the sentinel afterwards
    FalseChecked,
    /// The fetch drives a loop condition
    InLoopCondition
}

impl FetchGuard {
    pub fn is_guarded(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Classify the guard around a fetch call found in `cx` with the given role.
///
/// A fetch without a named receiver can only be guarded by its loop or by a
/// sentinel check on the assigned value.
pub fn detect_guard(
    cx: StmtCx<'_>,
    role: Role,
    receiver: Option<&Target>,
    assigned: Option<&Target>
) -> FetchGuard {
    if role == Role::LoopCondition {
        return FetchGuard::InLoopCondition;
    }
    if let Some(receiver) = receiver
        && cx.preceding().iter().any(|stmt| is_row_count_guard(stmt, receiver))
    {
        return FetchGuard::RowCountGuarded;
    }
    let Some(var) = assigned else {
        return FetchGuard::None;
    };
    if role == Role::IfCondition
        && let Stmt::If {
            condition, ..
        } = cx.stmt
        && checks_sentinel(condition, var)
    {
        return FetchGuard::FalseChecked;
    }
    let checked_later = cx.following().iter().any(|stmt| match stmt {
        Stmt::If {
            condition, ..
        } => checks_sentinel(condition, var),
        _ => false
    });
    if checked_later {
        FetchGuard::FalseChecked
    } else {
        FetchGuard::None
    }
}

fn is_row_count_guard(stmt: &Stmt, receiver: &Target) -> bool {
    let Stmt::If {
        condition,
        then,
        ..
    } = stmt
    else {
        return false;
    };
    is_row_count_zero(condition, receiver) && exits_unconditionally(then)
}

fn is_row_count_call(expr: &Expr, receiver: &Target) -> bool {
    classify(expr)
        .is_some_and(|call| call.kind == CallKind::RowCount && call.receiver.as_ref() == Some(receiver))
}

fn is_int(expr: &Expr, expected: i64) -> bool {
    matches!(expr, Expr::Int { value, .. } if *value == expected)
}

fn is_row_count_zero(condition: &Expr, receiver: &Target) -> bool {
    match condition {
        Expr::Binary {
            op: BinaryOp::Equal | BinaryOp::Identical,
            left,
            right,
            ..
        } => {
            (is_row_count_call(left, receiver) && is_int(right, 0))
                || (is_row_count_call(right, receiver) && is_int(left, 0))
        }
        Expr::Binary {
            op: BinaryOp::Less,
            left,
            right,
            ..
        } => is_row_count_call(left, receiver) && is_int(right, 1),
        Expr::Not {
            expr, ..
        } => is_row_count_call(expr, receiver),
        _ => false
    }
}

/// Top-level `throw` or `return` in the branch. An empty branch never exits.
fn exits_unconditionally(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match stmt {
        Stmt::Throw {
            ..
        }
        | Stmt::Return {
            ..
        } => true,
        Stmt::Block {
            body, ..
        } => exits_unconditionally(body),
        _ => false
    })
}

fn names_var(expr: &Expr, var: &Target) -> bool {
    match expr {
        Expr::Assign {
            target, ..
        } => target == var,
        _ => expr.as_target().as_ref() == Some(var)
    }
}

fn is_sentinel(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Bool {
            value: false,
            ..
        } | Expr::Null {
            ..
        }
    )
}

fn checks_sentinel(condition: &Expr, var: &Target) -> bool {
    match condition {
        Expr::Not {
            expr, ..
        } => checks_sentinel(expr, var),
        Expr::Binary {
            op: BinaryOp::And | BinaryOp::Or,
            left,
            right,
            ..
        } => checks_sentinel(left, var) || checks_sentinel(right, var),
        Expr::Binary {
            op:
                BinaryOp::Equal | BinaryOp::Identical | BinaryOp::NotEqual | BinaryOp::NotIdentical,
            left,
            right,
            ..
        } => (names_var(left, var) && is_sentinel(right)) || (names_var(right, var) && is_sentinel(left)),
        Expr::Call {
            receiver: None,
            method,
            args,
            ..
        } => {
            matches!(
                method.to_ascii_lowercase().as_str(),
                "empty" | "isset" | "is_array" | "is_null" | "is_object"
            ) && args.first().is_some_and(|arg| names_var(arg, var))
        }
        other => names_var(other, var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Location;

    fn loc(line: u32) -> Location {
        Location::new(line, 1)
    }

    fn stmt_var() -> Expr {
        Expr::Local {
            name:     "stmt".into(),
            location: loc(1)
        }
    }

    fn row_count_eq_zero(line: u32) -> Expr {
        Expr::Binary {
            op:       BinaryOp::Identical,
            left:     Box::new(Expr::Call {
                receiver: Some(Box::new(stmt_var())),
                method:   "rowCount".into(),
                args:     vec![],
                location: loc(line)
            }),
            right:    Box::new(Expr::Int {
                value:    0,
                location: loc(line)
            }),
            location: loc(line)
        }
    }

    fn fetch_assign(line: u32) -> Stmt {
        Stmt::Assign {
            target:     Target::Local("row".into()),
            value:      Expr::Call {
                receiver: Some(Box::new(stmt_var())),
                method:   "fetch".into(),
                args:     vec![],
                location: loc(line)
            },
            annotation: None,
            location:   loc(line)
        }
    }

    fn guard_of(block: &[Stmt], index: usize) -> FetchGuard {
        let cx = StmtCx {
            stmt: &block[index],
            siblings: block,
            index
        };
        detect_guard(
            cx,
            Role::Body,
            Some(&Target::Local("stmt".into())),
            Some(&Target::Local("row".into()))
        )
    }

    #[test]
    fn test_row_count_guard_with_throw() {
        let block = vec![
            Stmt::If {
                condition: row_count_eq_zero(1),
                then:      vec![Stmt::Throw {
                    value:    Expr::Other {
                        location: loc(2)
                    },
                    location: loc(2)
                }],
                otherwise: vec![],
                location:  loc(1)
            },
            fetch_assign(4),
        ];
        assert_eq!(guard_of(&block, 1), FetchGuard::RowCountGuarded);
    }

    #[test]
    fn test_row_count_guard_with_empty_body_does_not_count() {
        let block = vec![
            Stmt::If {
                condition: row_count_eq_zero(1),
                then:      vec![],
                otherwise: vec![],
                location:  loc(1)
            },
            fetch_assign(3),
        ];
        assert_eq!(guard_of(&block, 1), FetchGuard::None);
    }

    #[test]
    fn test_false_check_after_fetch() {
        let block = vec![
            fetch_assign(1),
            Stmt::If {
                condition: Expr::Binary {
                    op:       BinaryOp::Identical,
                    left:     Box::new(Expr::Bool {
                        value:    false,
                        location: loc(2)
                    }),
                    right:    Box::new(Expr::Local {
                        name:     "row".into(),
                        location: loc(2)
                    }),
                    location: loc(2)
                },
                then:      vec![],
                otherwise: vec![],
                location:  loc(2)
            },
        ];
        assert_eq!(guard_of(&block, 0), FetchGuard::FalseChecked);
    }

    #[test]
    fn test_unguarded_fetch() {
        let block = vec![fetch_assign(1)];
        assert_eq!(guard_of(&block, 0), FetchGuard::None);
    }
}
