//! Binding correlation: placeholders declared by a query against the values
//! supplied for them.
//!
//! An `execute` with an array argument is checked against the array keys. An
//! `execute` without arguments is checked against every `bindValue` and
//! `bindParam` made on the same target before it: earlier in the method for
//! locals, anywhere earlier in the unit for fields.

use compact_str::CompactString;
use indexmap::IndexSet;
use tracing::trace;

use crate::{
    diagnostic::{Category, Diagnostic},
    host::Location,
    sites::{ExecuteParam, ExecuteSite, QuerySite, UnitFacts}
};

/// Run the binding checks for every execute site of a unit.
pub fn correlate(facts: &UnitFacts) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for execute in &facts.executes {
        let Some(query) = facts.governing_query(&execute.target, execute.method, execute.location)
        else {
            trace!(at = %execute.location, "execute without a governing query");
            continue;
        };
        if query.text.is_none() || query.placeholders.is_empty() {
            continue;
        }
        match &execute.params {
            Some(params) => check_params(query, execute, params, &mut diagnostics),
            None => check_bindings(facts, query, execute, &mut diagnostics)
        }
    }
    diagnostics
}

fn check_params(
    query: &QuerySite,
    execute: &ExecuteSite,
    params: &[ExecuteParam],
    out: &mut Vec<Diagnostic>
) {
    let supplied: IndexSet<&CompactString> = params.iter().map(|p| &p.name).collect();
    for name in query.placeholders.iter().filter(|p| !supplied.contains(p)) {
        out.push(
            Diagnostic::new(
                Category::MissingParameter,
                format!(
                    "Placeholder ':{}' of the query on line {} has no value in execute()",
                    name, query.location.line
                ),
                execute.location
            )
            .with_suggestion(format!("Add '{}' to the execute() parameters", name))
        );
    }
    let mut reported: IndexSet<&CompactString> = IndexSet::new();
    for param in params {
        if query.placeholders.contains(&param.name) || !reported.insert(&param.name) {
            continue;
        }
        out.push(unused(
            Category::UnusedParameter,
            &param.name,
            query,
            param.location,
            "Remove the parameter or add the placeholder to the query"
        ));
    }
}

fn check_bindings(
    facts: &UnitFacts,
    query: &QuerySite,
    execute: &ExecuteSite,
    out: &mut Vec<Diagnostic>
) {
    let bindings: Vec<_> = facts
        .bindings_before(&execute.target, execute.method, execute.location)
        .collect();
    let bound: IndexSet<&CompactString> = bindings.iter().map(|b| &b.param).collect();
    for name in query.placeholders.iter().filter(|p| !bound.contains(p)) {
        out.push(
            Diagnostic::new(
                Category::MissingBinding,
                format!(
                    "Placeholder ':{}' of the query on line {} is never bound before execute()",
                    name, query.location.line
                ),
                execute.location
            )
            .with_suggestion(format!("Call bindValue(':{}', ...) before execute()", name))
        );
    }
    for binding in bindings {
        if query.placeholders.contains(&binding.param) {
            continue;
        }
        out.push(unused(
            Category::UnusedBinding,
            &binding.param,
            query,
            binding.location,
            "Remove the binding or add the placeholder to the query"
        ));
    }
}

fn unused(
    category: Category,
    name: &str,
    query: &QuerySite,
    at: Location,
    suggestion: &str
) -> Diagnostic {
    Diagnostic::new(
        category,
        format!(
            "Parameter ':{}' does not appear in the query on line {}",
            name, query.location.line
        ),
        at
    )
    .with_suggestion(suggestion)
}
