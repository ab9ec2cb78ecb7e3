//! Checks over one resolved query text.
//!
//! Every rule looks at a single query through a [`QueryContext`] and reports
//! diagnostics anchored at the preparation call, shifted by the row the
//! finding sits on inside the query text.
//!
//! | ID | Rule | Needs parse |
//! |----|------|-------------|
//! | SQL001 | [`SyntaxCheck`] | yes |
//! | SQL002 | [`Tautology`] | yes, after a text pre-filter |
//! | SQL003 | [`SelfReference`] | yes |
//! | SQL004 | [`InvalidTableReference`] | yes |
//! | SQL005 | [`Portability`] | no |
//!
//! The parse is done lazily, at most once per query. A query the parser
//! rejects only gets its syntax diagnostics; the structured checks are
//! abandoned for it.

mod portability;
mod self_reference;
mod table_reference;
mod tautology;

use std::cell::OnceCell;

pub use portability::Portability;
pub use self_reference::SelfReference;
use sqlparser::ast::Statement;
pub use table_reference::InvalidTableReference;
pub use tautology::Tautology;

use crate::{
    diagnostic::{Category, Diagnostic},
    host::Location,
    sql::{ParseOutcome, lines::LineLocator, syntax::{SyntaxValidator, issues}}
};

/// One query under analysis.
pub struct QueryContext<'a> {
    /// Resolved query text
    pub text:        &'a str,
    /// `text` with placeholders replaced by parameter markers
    pub neutralized: String,
    /// Location of the preparation call
    pub anchor:      Location,
    validator:       &'a SyntaxValidator<'a>,
    outcome:         OnceCell<Option<ParseOutcome>>
}

impl<'a> QueryContext<'a> {
    pub fn new(text: &'a str, anchor: Location, validator: &'a SyntaxValidator<'a>) -> Self {
        Self {
            text,
            neutralized: validator.neutralize(text),
            anchor,
            validator,
            outcome: OnceCell::new()
        }
    }

    /// Parse result, `None` when the text was not analyzed.
    pub fn outcome(&self) -> Option<&ParseOutcome> {
        self.outcome
            .get_or_init(|| self.validator.parse(self.text))
            .as_ref()
    }

    /// Parsed statements, `None` unless every statement parsed.
    pub fn statements(&self) -> Option<Vec<&Statement>> {
        self.outcome()?.statements()
    }

    /// Host location of a row within the query text.
    pub fn location_at_row(&self, row: u32) -> Location {
        self.anchor.offset_rows(row)
    }
}

/// Trait for checks over a single query.
///
/// Rules are stateless and must be `Send + Sync`, units are analyzed in
/// parallel.
pub trait Rule: Send + Sync {
    /// The category this rule reports.
    fn category(&self) -> Category;

    /// Analyzes a query and returns any diagnostics found.
    ///
    /// `lines` belongs to this query only and maps flagged expressions back
    /// to rows of [`QueryContext::neutralized`].
    fn check(&self, cx: &QueryContext<'_>, lines: &mut LineLocator<'_>) -> Vec<Diagnostic>;
}

/// Parser errors in the query text.
pub struct SyntaxCheck;

impl Rule for SyntaxCheck {
    fn category(&self) -> Category {
        Category::SyntaxError
    }

    fn check(&self, cx: &QueryContext<'_>, _lines: &mut LineLocator<'_>) -> Vec<Diagnostic> {
        let Some(outcome) = cx.outcome() else {
            return vec![];
        };
        issues(outcome)
            .into_iter()
            .map(|issue| {
                Diagnostic::new(
                    self.category(),
                    format!("SQL syntax error: {}", issue.message),
                    cx.location_at_row(issue.line_within_text.unwrap_or(0))
                )
            })
            .collect()
    }
}

/// Every query rule, in reporting order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(SyntaxCheck),
        Box::new(Tautology),
        Box::new(SelfReference),
        Box::new(InvalidTableReference),
        Box::new(Portability),
    ]
}
