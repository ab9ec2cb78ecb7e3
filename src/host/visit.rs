//! Generic traversal over host statement trees.
//!
//! [`walk_stmts`] visits every statement (recursing into branches, loop bodies
//! and blocks) together with its sibling context. [`visit_calls`] builds on it
//! and reports every classified call matching a predicate, so collectors never
//! write their own recursive "find all calls like X" walks.

use super::{
    ast::{ArrayItem, Expr, Stmt, StrPart},
    classify::{Call, classify}
};

/// Where in its statement an expression sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Statement body: assigned value, returned value, expression statement.
    Body,
    /// Condition of an `if`.
    IfCondition,
    /// Condition of a `while` loop.
    LoopCondition
}

/// A statement together with the block it lives in.
#[derive(Debug, Clone, Copy)]
pub struct StmtCx<'a> {
    pub stmt:     &'a Stmt,
    pub siblings: &'a [Stmt],
    pub index:    usize
}

impl<'a> StmtCx<'a> {
    pub fn preceding(&self) -> &'a [Stmt] {
        &self.siblings[..self.index]
    }

    pub fn following(&self) -> &'a [Stmt] {
        &self.siblings[self.index + 1..]
    }
}

/// Visit every statement in `body`, depth first, in textual order.
pub fn walk_stmts<'a, F>(body: &'a [Stmt], callback: &mut F)
where
    F: FnMut(StmtCx<'a>)
{
    for (index, stmt) in body.iter().enumerate() {
        callback(StmtCx {
            stmt,
            siblings: body,
            index
        });
        match stmt {
            Stmt::If {
                then,
                otherwise,
                ..
            } => {
                walk_stmts(then, callback);
                walk_stmts(otherwise, callback);
            }
            Stmt::While {
                body, ..
            }
            | Stmt::Foreach {
                body, ..
            }
            | Stmt::Block {
                body, ..
            } => walk_stmts(body, callback),
            _ => {}
        }
    }
}

/// Visit the expressions owned directly by `stmt` (not by nested statements).
pub fn stmt_exprs(stmt: &Stmt) -> Vec<(&Expr, Role)> {
    match stmt {
        Stmt::Expr {
            expr, ..
        } => vec![(expr, Role::Body)],
        Stmt::Assign {
            value, ..
        } => vec![(value, Role::Body)],
        Stmt::Return {
            value, ..
        } => value.iter().map(|v| (v, Role::Body)).collect(),
        Stmt::If {
            condition, ..
        } => vec![(condition, Role::IfCondition)],
        Stmt::While {
            condition, ..
        } => vec![(condition, Role::LoopCondition)],
        Stmt::Foreach {
            subject, ..
        } => vec![(subject, Role::Body)],
        Stmt::Throw {
            value, ..
        } => vec![(value, Role::Body)],
        Stmt::Block {
            ..
        } => vec![]
    }
}

/// Call `callback` for `expr` and each of its sub-expressions, outermost first.
pub fn walk_expr<'a, F>(expr: &'a Expr, callback: &mut F)
where
    F: FnMut(&'a Expr)
{
    callback(expr);
    match expr {
        Expr::Interpolated {
            parts, ..
        } => {
            for part in parts {
                if let StrPart::Expr(inner) = part {
                    walk_expr(inner, callback);
                }
            }
        }
        Expr::Concat {
            left,
            right,
            ..
        }
        | Expr::Binary {
            left,
            right,
            ..
        } => {
            walk_expr(left, callback);
            walk_expr(right, callback);
        }
        Expr::Call {
            receiver,
            args,
            ..
        } => {
            if let Some(receiver) = receiver {
                walk_expr(receiver, callback);
            }
            for arg in args {
                walk_expr(arg, callback);
            }
        }
        Expr::Array {
            items, ..
        } => {
            for ArrayItem {
                key,
                value,
                ..
            } in items
            {
                if let Some(key) = key {
                    walk_expr(key, callback);
                }
                walk_expr(value, callback);
            }
        }
        Expr::Not {
            expr: inner, ..
        } => walk_expr(inner, callback),
        Expr::Assign {
            value, ..
        } => walk_expr(value, callback),
        Expr::Str {
            ..
        }
        | Expr::Local {
            ..
        }
        | Expr::Field {
            ..
        }
        | Expr::Int {
            ..
        }
        | Expr::Bool {
            ..
        }
        | Expr::Null {
            ..
        }
        | Expr::Other {
            ..
        } => {}
    }
}

/// Report every classified call in `body` accepted by `predicate`.
///
/// The callback receives the enclosing statement context, the role of the
/// top-level expression the call was found in, and the call itself.
pub fn visit_calls<'a, P, F>(body: &'a [Stmt], predicate: P, callback: &mut F)
where
    P: Fn(&Call<'a>) -> bool,
    F: FnMut(StmtCx<'a>, Role, Call<'a>)
{
    walk_stmts(body, &mut |cx: StmtCx<'a>| {
        for (expr, role) in stmt_exprs(cx.stmt) {
            walk_expr(expr, &mut |node: &'a Expr| {
                if let Some(call) = classify(node)
                    && predicate(&call)
                {
                    callback(cx, role, call);
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{
        ast::{Location, Target},
        classify::CallKind
    };

    fn call(receiver: &str, method: &str, line: u32) -> Expr {
        Expr::Call {
            receiver: Some(Box::new(Expr::Local {
                name:     receiver.into(),
                location: Location::new(line, 1)
            })),
            method:   method.into(),
            args:     vec![],
            location: Location::new(line, 5)
        }
    }

    #[test]
    fn test_visit_calls_reaches_nested_blocks() {
        let body = vec![
            Stmt::Expr {
                expr:       call("stmt", "execute", 2),
                annotation: None,
                location:   Location::new(2, 1)
            },
            Stmt::If {
                condition: call("stmt", "rowCount", 3),
                then:      vec![Stmt::Expr {
                    expr:       call("stmt", "execute", 4),
                    annotation: None,
                    location:   Location::new(4, 1)
                }],
                otherwise: vec![],
                location:  Location::new(3, 1)
            },
        ];
        let mut seen = Vec::new();
        visit_calls(
            &body,
            |c| c.kind == CallKind::Execute,
            &mut |_, role, c| seen.push((c.location.line, role))
        );
        assert_eq!(seen, vec![(2, Role::Body), (4, Role::Body)]);
    }

    #[test]
    fn test_visit_calls_reports_condition_role() {
        let body = vec![Stmt::While {
            condition:  Expr::Assign {
                target:   Target::Local("row".into()),
                value:    Box::new(call("stmt", "fetch", 7)),
                location: Location::new(7, 8)
            },
            body:       vec![],
            annotation: None,
            location:   Location::new(7, 1)
        }];
        let mut roles = Vec::new();
        visit_calls(&body, |c| c.kind.is_fetch(), &mut |_, role, _| {
            roles.push(role)
        });
        assert_eq!(roles, vec![Role::LoopCondition]);
    }
}
