//! Host program boundary: the tree a front-end hands over, call
//! classification and traversal helpers.

pub mod ast;
pub mod classify;
pub mod visit;

pub use ast::{
    ArrayItem, BinaryOp, Expr, Location, Method, SourceFile, Stmt, StrPart, Target, TypeAlias,
    TypeDecl
};
pub use classify::{Call, CallKind, classify};
pub use visit::{Role, StmtCx, visit_calls, walk_expr, walk_stmts};
