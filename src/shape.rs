//! Shape correlation: declared result shapes against the governing query and
//! the fetch call consuming it.
//!
//! Every annotated fetch site goes through four independent checks:
//!
//! 1. governing-query lookup, through the fetch receiver or the preparation
//!    call it is chained onto (no query means nothing to check)
//! 2. arity: `fetchAll` wants a collection shape, `fetch`/`fetchObject` a
//!    single row
//! 3. column matching against the SELECT output, skipped for opaque text and
//!    wildcard projections
//! 4. no-row handling for single-row fetches

mod annotation;
mod columns;
mod distance;

pub use annotation::{Arrayness, ShapeAnnotation};
use compact_str::CompactString;
pub use columns::{ColumnVec, SelectColumns, derive_select_columns};
pub use distance::levenshtein_distance;
use tracing::trace;

use crate::{
    diagnostic::{Category, Diagnostic},
    host::CallKind,
    sites::{FetchSite, QuerySite, Unit, UnitFacts}
};

/// Largest edit distance still reported as a probable typo.
pub const MAX_TYPO_DISTANCE: usize = 3;

/// A declared field absent from the query output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFinding {
    pub field:      CompactString,
    /// Closest undeclared output column, when one is close enough
    pub suggestion: Option<CompactString>
}

/// Compare declared fields with derived output columns.
///
/// Output columns that are not declared are always fine. For each declared
/// field missing from the output, the closest undeclared output column within
/// [`MAX_TYPO_DISTANCE`] edits is suggested; the first one wins on ties.
pub fn match_columns<'a, D>(declared: D, output: &[CompactString]) -> Vec<ColumnFinding>
where
    D: IntoIterator<Item = &'a CompactString>
{
    let declared: Vec<&CompactString> = declared.into_iter().collect();
    let candidates: Vec<&CompactString> = output
        .iter()
        .filter(|col| !declared.contains(col))
        .collect();
    declared
        .iter()
        .filter(|field| !output.contains(**field))
        .map(|field| {
            let suggestion = candidates
                .iter()
                .map(|col| (levenshtein_distance(field, col), *col))
                .filter(|(d, _)| (1..=MAX_TYPO_DISTANCE).contains(d))
                .min_by_key(|(d, _)| *d)
                .map(|(_, col)| col.clone());
            ColumnFinding {
                field: (*field).clone(),
                suggestion
            }
        })
        .collect()
}

/// Run the shape checks for every annotated fetch site of a unit.
pub fn correlate(facts: &UnitFacts, unit: Unit<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for fetch in &facts.fetches {
        let Some((raw, at)) = &fetch.annotation else {
            continue;
        };
        let Some(shape) = ShapeAnnotation::parse(raw, *at, unit.aliases) else {
            trace!(at = %at, "annotation is not a shape");
            continue;
        };
        let governing = match (&fetch.target, fetch.chained) {
            (Some(target), _) => facts.governing_query(target, fetch.method, fetch.location),
            (None, Some(at)) => facts.query_at(fetch.method, at),
            (None, None) => None
        };
        let query =
            governing.or_else(|| facts.closest_query_before(fetch.method, shape.location));
        let Some(query) = query else {
            trace!(at = %fetch.location, "no governing query for fetch");
            continue;
        };
        check_arity(fetch, &shape, query, &mut diagnostics);
        check_columns(&shape, query, &mut diagnostics);
        check_nullable(fetch, &shape, &mut diagnostics);
    }
    diagnostics
}

fn check_arity(
    fetch: &FetchSite,
    shape: &ShapeAnnotation,
    query: &QuerySite,
    out: &mut Vec<Diagnostic>
) {
    let expected = match fetch.kind {
        CallKind::FetchAll => Arrayness::Collection,
        _ => Arrayness::Scalar
    };
    if shape.arrayness == expected {
        return;
    }
    let (returns, wants) = match expected {
        Arrayness::Collection => ("a list of rows", "a single row shape"),
        Arrayness::Scalar => ("a single row", "a list shape")
    };
    let message = format!(
        "{}() returns {} but the declared shape is {} (query on line {})",
        fetch.kind.method_name(),
        returns,
        wants,
        query.location.line
    );
    let suggestion = match expected {
        Arrayness::Collection => "Declare a list shape, e.g. list<array{...}>",
        Arrayness::Scalar => "Declare a single row shape, or use fetchAll()"
    };
    out.push(
        Diagnostic::new(Category::FetchTypeMismatch, message, fetch.location)
            .with_suggestion(suggestion)
    );
}

fn check_columns(shape: &ShapeAnnotation, query: &QuerySite, out: &mut Vec<Diagnostic>) {
    if query.opaque {
        return;
    }
    let Some(text) = &query.text else {
        return;
    };
    let SelectColumns::Columns(output) = derive_select_columns(text) else {
        return;
    };
    for finding in match_columns(shape.fields.keys(), &output) {
        let diagnostic = match &finding.suggestion {
            Some(candidate) => Diagnostic::new(
                Category::ColumnMismatch,
                format!(
                    "Declared field '{}' is not selected by the query on line {}; possible typo of '{}'",
                    finding.field, query.location.line, candidate
                ),
                shape.location
            )
            .with_suggestion(format!("Rename '{}' to '{}'", finding.field, candidate)),
            None => Diagnostic::new(
                Category::ColumnMissing,
                format!(
                    "Declared field '{}' is not selected by the query on line {}",
                    finding.field, query.location.line
                ),
                shape.location
            )
        };
        out.push(diagnostic);
    }
}

fn check_nullable(fetch: &FetchSite, shape: &ShapeAnnotation, out: &mut Vec<Diagnostic>) {
    if fetch.kind == CallKind::FetchAll || shape.admits_sentinel || fetch.guard.is_guarded() {
        return;
    }
    out.push(
        Diagnostic::new(
            Category::MissingNullableHandling,
            format!(
                "{}() returns false when no row matches, but the result is used without a check",
                fetch.kind.method_name()
            ),
            fetch.location
        )
        .with_suggestion("Check the result against false, or declare the shape as ...|false")
    );
}
