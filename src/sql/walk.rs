//! Walkers over a parsed statement.
//!
//! [`StatementParts::collect`] visits a statement once, nested queries
//! included, and keeps the pieces the semantic rules look at: declared table
//! sources, filter conditions and expressions whose column references must
//! resolve.

use sqlparser::ast::{
    BinaryOperator, Expr, FromTable, FunctionArg, FunctionArgExpr, FunctionArguments,
    GroupByExpr, Ident, JoinConstraint, JoinOperator, ObjectName, OrderByKind, Query, Select,
    SelectItem, SelectItemQualifiedWildcardKind, SetExpr, Statement, TableFactor, TableWithJoins,
    UpdateTableFromKind
};

/// A table source declared by a FROM-like clause.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Table {
        name:  &'a ObjectName,
        alias: Option<&'a Ident>
    },
    /// `(SELECT ...) AS alias`
    Derived(&'a Ident),
    /// `WITH name AS (...)`
    Cte(&'a Ident)
}

/// Pieces of a statement relevant to the semantic rules.
#[derive(Debug, Default)]
pub struct StatementParts<'a> {
    pub sources:             Vec<Source<'a>>,
    /// WHERE, HAVING and JOIN ... ON expressions
    pub conditions:          Vec<&'a Expr>,
    /// Projection, WHERE, GROUP BY, ORDER BY, HAVING and JOIN ... ON
    pub references:          Vec<&'a Expr>,
    /// Qualifiers of `q.*` projection items
    pub wildcard_qualifiers: Vec<&'a ObjectName>
}

impl<'a> StatementParts<'a> {
    pub fn collect(statement: &'a Statement) -> Self {
        let mut parts = Self::default();
        parts.statement(statement);
        parts
    }

    fn statement(&mut self, statement: &'a Statement) {
        match statement {
            Statement::Query(query) => self.query(query),
            Statement::Insert(insert) => {
                if let Some(source) = &insert.source {
                    self.query(source);
                }
            }
            Statement::Update(update) => {
                self.table_with_joins(&update.table);
                if let Some(
                    UpdateTableFromKind::BeforeSet(tables) | UpdateTableFromKind::AfterSet(tables)
                ) = &update.from
                {
                    for table in tables {
                        self.table_with_joins(table);
                    }
                }
                if let Some(selection) = &update.selection {
                    self.condition(selection);
                }
            }
            Statement::Delete(delete) => {
                let (FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables)) =
                    &delete.from;
                for table in tables {
                    self.table_with_joins(table);
                }
                for table in delete.using.iter().flatten() {
                    self.table_with_joins(table);
                }
                if let Some(selection) = &delete.selection {
                    self.condition(selection);
                }
                for order_by in &delete.order_by {
                    self.reference(&order_by.expr);
                }
            }
            _ => {}
        }
    }

    fn query(&mut self, query: &'a Query) {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.sources.push(Source::Cte(&cte.alias.name));
                self.query(&cte.query);
            }
        }
        self.set_expr(&query.body);
        if let Some(order_by) = &query.order_by
            && let OrderByKind::Expressions(exprs) = &order_by.kind
        {
            for expr in exprs {
                self.reference(&expr.expr);
            }
        }
    }

    fn set_expr(&mut self, set_expr: &'a SetExpr) {
        match set_expr {
            SetExpr::Select(select) => self.select(select),
            SetExpr::Query(query) => self.query(query),
            SetExpr::SetOperation {
                left,
                right,
                ..
            } => {
                self.set_expr(left);
                self.set_expr(right);
            }
            _ => {}
        }
    }

    fn select(&mut self, select: &'a Select) {
        for table in &select.from {
            self.table_with_joins(table);
        }
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr)
                | SelectItem::ExprWithAlias {
                    expr, ..
                } => self.reference(expr),
                SelectItem::QualifiedWildcard(SelectItemQualifiedWildcardKind::ObjectName(name), _) => {
                    self.wildcard_qualifiers.push(name)
                }
                _ => {}
            }
        }
        if let Some(selection) = &select.selection {
            self.condition(selection);
        }
        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                self.reference(expr);
            }
        }
        if let Some(having) = &select.having {
            self.condition(having);
        }
    }

    fn table_with_joins(&mut self, table: &'a TableWithJoins) {
        self.table_factor(&table.relation);
        for join in &table.joins {
            self.table_factor(&join.relation);
            if let Some(on) = join_on_expr(&join.join_operator) {
                self.condition(on);
            }
        }
    }

    fn table_factor(&mut self, factor: &'a TableFactor) {
        match factor {
            TableFactor::Table {
                name,
                alias,
                ..
            } => self.sources.push(Source::Table {
                name,
                alias: alias.as_ref().map(|a| &a.name)
            }),
            TableFactor::Derived {
                subquery,
                alias,
                ..
            } => {
                if let Some(alias) = alias {
                    self.sources.push(Source::Derived(&alias.name));
                }
                self.query(subquery);
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.table_with_joins(table_with_joins),
            _ => {}
        }
    }

    fn condition(&mut self, expr: &'a Expr) {
        self.conditions.push(expr);
        self.reference(expr);
    }

    fn reference(&mut self, expr: &'a Expr) {
        self.references.push(expr);
        let mut nested = Vec::new();
        visit_expr(expr, &mut |node| match node {
            Expr::Subquery(query)
            | Expr::InSubquery {
                subquery: query, ..
            }
            | Expr::Exists {
                subquery: query, ..
            } => nested.push(query.as_ref()),
            _ => {}
        });
        for query in nested {
            self.query(query);
        }
    }
}

/// Visit `expr` and its sub-expressions, pre-order. Subqueries are not
/// entered; they are reported as nodes only.
pub fn visit_expr<'a, F>(expr: &'a Expr, visitor: &mut F)
where
    F: FnMut(&'a Expr)
{
    visitor(expr);
    match expr {
        Expr::BinaryOp {
            left,
            right,
            ..
        } => {
            visit_expr(left, visitor);
            visit_expr(right, visitor);
        }
        Expr::UnaryOp {
            expr, ..
        }
        | Expr::Nested(expr)
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr)
        | Expr::Cast {
            expr, ..
        }
        | Expr::Extract {
            expr, ..
        }
        | Expr::InSubquery {
            expr, ..
        } => visit_expr(expr, visitor),
        Expr::InList {
            expr,
            list,
            ..
        } => {
            visit_expr(expr, visitor);
            for item in list {
                visit_expr(item, visitor);
            }
        }
        Expr::Between {
            expr,
            low,
            high,
            ..
        } => {
            visit_expr(expr, visitor);
            visit_expr(low, visitor);
            visit_expr(high, visitor);
        }
        Expr::Like {
            expr,
            pattern,
            ..
        }
        | Expr::ILike {
            expr,
            pattern,
            ..
        } => {
            visit_expr(expr, visitor);
            visit_expr(pattern, visitor);
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                visit_expr(operand, visitor);
            }
            for case_when in conditions {
                visit_expr(&case_when.condition, visitor);
                visit_expr(&case_when.result, visitor);
            }
            if let Some(else_result) = else_result {
                visit_expr(else_result, visitor);
            }
        }
        Expr::Function(func) => {
            if let FunctionArguments::List(arg_list) = &func.args {
                for arg in &arg_list.args {
                    if let FunctionArg::Unnamed(FunctionArgExpr::Expr(e))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(e),
                        ..
                    } = arg
                    {
                        visit_expr(e, visitor);
                    }
                }
            }
        }
        Expr::Tuple(items) => {
            for item in items {
                visit_expr(item, visitor);
            }
        }
        _ => {}
    }
}

/// Operands of an AND chain, with parentheses removed.
pub fn conjuncts(expr: &Expr) -> Vec<&Expr> {
    let mut out = Vec::new();
    collect_conjuncts(expr, &mut out);
    out
}

fn collect_conjuncts<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right
        } => {
            collect_conjuncts(left, out);
            collect_conjuncts(right, out);
        }
        Expr::Nested(inner) => collect_conjuncts(inner, out),
        other => out.push(other)
    }
}

/// The ON expression of a join, if it has one.
pub fn join_on_expr(join_operator: &JoinOperator) -> Option<&Expr> {
    let constraint = match join_operator {
        JoinOperator::Join(constraint)
        | JoinOperator::Inner(constraint)
        | JoinOperator::Left(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::Right(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint) => constraint,
        _ => return None
    };
    match constraint {
        JoinConstraint::On(expr) => Some(expr),
        _ => None
    }
}

/// `(qualifier, column)` of a column reference; the qualifier is the part
/// right before the column name.
pub fn column_reference(expr: &Expr) -> Option<(Option<&str>, &str)> {
    match expr {
        Expr::Identifier(ident) => Some((None, ident.value.as_str())),
        Expr::CompoundIdentifier(idents) => {
            let [.., qualifier, column] = idents.as_slice() else {
                return None;
            };
            Some((Some(qualifier.value.as_str()), column.value.as_str()))
        }
        Expr::Nested(inner) => column_reference(inner),
        _ => None
    }
}

/// Textual operator for comparison operators, `None` for anything else.
pub fn comparison_symbol(op: &BinaryOperator) -> Option<&'static str> {
    match op {
        BinaryOperator::Eq => Some("="),
        BinaryOperator::NotEq => Some("<>"),
        BinaryOperator::Lt => Some("<"),
        BinaryOperator::Gt => Some(">"),
        BinaryOperator::LtEq => Some("<="),
        BinaryOperator::GtEq => Some(">="),
        _ => None
    }
}

#[cfg(test)]
mod tests {
    use sqlparser::{dialect::GenericDialect, parser::Parser};

    use super::*;

    fn parse(sql: &str) -> Statement {
        Parser::parse_sql(&GenericDialect {}, sql)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_collects_sources_and_conditions() {
        let stmt = parse(
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id WHERE u.active = 1 AND o.total > 5"
        );
        let parts = StatementParts::collect(&stmt);
        assert_eq!(parts.sources.len(), 2);
        assert_eq!(parts.conditions.len(), 2);
        let where_parts: usize = parts.conditions.iter().map(|c| conjuncts(c).len()).sum();
        assert_eq!(where_parts, 3);
    }

    #[test]
    fn test_nested_queries_are_collected() {
        let stmt = parse(
            "SELECT id FROM (SELECT id FROM a) AS d WHERE id IN (SELECT b.id FROM b WHERE b.x = 1)"
        );
        let parts = StatementParts::collect(&stmt);
        assert_eq!(parts.sources.len(), 3);
        assert_eq!(parts.conditions.len(), 2);
    }

    #[test]
    fn test_update_and_delete() {
        let parts_update = parse("UPDATE users SET a = 1 WHERE users.id = 2");
        let parts = StatementParts::collect(&parts_update);
        assert_eq!(parts.sources.len(), 1);
        assert_eq!(parts.conditions.len(), 1);
        let delete = parse("DELETE FROM users WHERE id = 3");
        let parts = StatementParts::collect(&delete);
        assert_eq!(parts.sources.len(), 1);
        assert_eq!(parts.conditions.len(), 1);
    }

    #[test]
    fn test_column_reference() {
        let stmt = parse("SELECT a.b.c, d FROM t");
        let parts = StatementParts::collect(&stmt);
        assert_eq!(column_reference(parts.references[0]), Some((Some("b"), "c")));
        assert_eq!(column_reference(parts.references[1]), Some((None, "d")));
    }
}
