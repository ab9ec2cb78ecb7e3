//! Orchestration of the whole analysis.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ SourceFiles │────▶│    Units     │────▶│    UnitFacts     │
//! └─────────────┘     │  (parallel)  │     └────────┬─────────┘
//!                     └──────────────┘              │
//!                 ┌─────────────────┬───────────────┴──┐
//!                 ▼                 ▼                  ▼
//!           ┌──────────┐      ┌──────────┐      ┌─────────────┐
//!           │ binding  │      │  shape   │      │ query rules │
//!           └──────────┘      └──────────┘      └─────────────┘
//! ```
//!
//! Units never share state, so they run in parallel with [`rayon`]. Each
//! query gets its own [`QueryContext`] and [`LineLocator`], dropped as soon
//! as its rules have run.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    binding,
    config::{AnalysisConfig, Config, RulesConfig},
    diagnostic::{AnalysisReport, Category, Diagnostic, FileReport, Severity},
    host::{SourceFile, TypeAlias},
    rules::{QueryContext, Rule, all_rules},
    shape,
    sites::{Unit, UnitFacts},
    sql::{EmbeddedParser, SqlparserAdapter, lines::LineLocator, syntax::SyntaxValidator}
};

/// Runs every analysis over a set of host files.
///
/// # Example
///
/// ```ignore
/// let analyzer = Analyzer::new(&Config::default());
/// let report = analyzer.analyze(&files);
///
/// println!("Found {} errors", report.error_count());
/// ```
pub struct Analyzer {
    analysis:       AnalysisConfig,
    parser:         Box<dyn EmbeddedParser>,
    rules:          Vec<Box<dyn Rule>>,
    disabled:       HashSet<Category>,
    severity_cache: HashMap<Category, Severity>
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Analyzer {
    /// Create an analyzer backed by `sqlparser` in the configured dialect.
    pub fn new(config: &Config) -> Self {
        let parser = SqlparserAdapter::new(config.analysis.dialect);
        Self::with_parser(config, Box::new(parser))
    }

    /// Create an analyzer with a custom embedded parser.
    pub fn with_parser(config: &Config, parser: Box<dyn EmbeddedParser>) -> Self {
        let disabled = disabled_categories(&config.rules);
        let severity_cache = severity_overrides(&config.rules);
        let rules = all_rules()
            .into_iter()
            .filter(|rule| !disabled.contains(&rule.category()))
            .filter(|rule| config.analysis.portability || rule.category() != Category::Portability)
            .collect();
        Self {
            analysis: config.analysis.clone(),
            parser,
            rules,
            disabled,
            severity_cache
        }
    }

    /// Analyze all files. Files keep their input order in the report.
    pub fn analyze(&self, files: &[SourceFile]) -> AnalysisReport {
        let reports: Vec<(FileReport, usize)> =
            files.par_iter().map(|file| self.analyze_file(file)).collect();
        let units_count = reports.iter().map(|(_, units)| units).sum();
        AnalysisReport {
            files: reports.into_iter().map(|(report, _)| report).collect(),
            units_count
        }
    }

    fn analyze_file(&self, file: &SourceFile) -> (FileReport, usize) {
        let no_aliases: &[TypeAlias] = &[];
        let units: Vec<Unit<'_>> = file
            .types
            .iter()
            .map(|decl| Unit {
                name:    &decl.name,
                methods: &decl.methods,
                aliases: &decl.aliases
            })
            .chain(file.functions.iter().map(|function| Unit {
                name:    &function.name,
                methods: std::slice::from_ref(function),
                aliases: no_aliases
            }))
            .collect();
        let mut diagnostics: Vec<Diagnostic> = units
            .par_iter()
            .flat_map(|unit| self.analyze_unit(*unit))
            .collect();
        finish(&mut diagnostics);
        debug!(
            path = %file.path,
            units = units.len(),
            diagnostics = diagnostics.len(),
            "file analyzed"
        );
        (
            FileReport {
                path: file.path.clone(),
                diagnostics
            },
            units.len()
        )
    }

    /// All diagnostics of one unit, filtered and with severities applied.
    pub fn analyze_unit(&self, unit: Unit<'_>) -> Vec<Diagnostic> {
        debug!(unit = unit.name, "analyzing unit");
        let facts = UnitFacts::collect(unit);
        let mut diagnostics = binding::correlate(&facts);
        diagnostics.extend(shape::correlate(&facts, unit));

        let validator = SyntaxValidator::new(self.parser.as_ref(), self.analysis.max_query_length);
        for query in &facts.queries {
            let Some(text) = query.text.as_deref() else {
                debug!(at = %query.location, "query text not resolved, skipped");
                continue;
            };
            let cx = QueryContext::new(text, query.location, &validator);
            let mut lines = LineLocator::new(&cx.neutralized);
            for rule in &self.rules {
                diagnostics.extend(rule.check(&cx, &mut lines));
            }
        }

        diagnostics.retain(|d| !self.disabled.contains(&d.category));
        for diagnostic in &mut diagnostics {
            if let Some(&severity) = self.severity_cache.get(&diagnostic.category) {
                diagnostic.severity = severity;
            }
        }
        debug!(unit = unit.name, diagnostics = diagnostics.len(), "unit analyzed");
        diagnostics
    }
}

/// Sort into the final order and drop duplicates.
fn finish(diagnostics: &mut Vec<Diagnostic>) {
    diagnostics.sort_by(|a, b| {
        a.location
            .cmp(&b.location)
            .then_with(|| a.rule_id.cmp(b.rule_id))
            .then_with(|| a.message.cmp(&b.message))
    });
    diagnostics.dedup_by(|a, b| {
        a.category == b.category && a.location == b.location && a.message == b.message
    });
}

fn disabled_categories(config: &RulesConfig) -> HashSet<Category> {
    config
        .disabled
        .iter()
        .filter_map(|key| {
            let category = Category::from_key(key);
            if category.is_none() {
                warn!(rule = %key, "unknown rule in disabled list");
            }
            category
        })
        .collect()
}

fn severity_overrides(config: &RulesConfig) -> HashMap<Category, Severity> {
    let mut cache = HashMap::new();
    for (key, value) in &config.severity {
        match (Category::from_key(key), Severity::parse(value)) {
            (Some(category), Some(severity)) => {
                cache.insert(category, severity);
            }
            _ => warn!(rule = %key, severity = %value, "ignoring severity override")
        }
    }
    cache
}
