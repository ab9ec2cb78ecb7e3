//! Application logic for the SQL Flow Analyzer CLI.
//!
//! This module contains the core application logic separated from the main
//! entry point to enable testing.

mod input;

use std::path::PathBuf;

pub use input::{decode_source_files, read_source_files};
use tracing::info;

use crate::{
    analyzer::Analyzer,
    cli::{Dialect, Format},
    config::Config,
    diagnostic::{AnalysisReport, Severity},
    error::AppResult,
    output::{OutputFormat, OutputOptions, format_report},
    sql::SqlDialect
};

/// Parameters for the check command
#[derive(Debug, Clone)]
pub struct CheckParams {
    pub inputs:        Vec<PathBuf>,
    pub output_format: Format,
    pub dialect:       Option<Dialect>,
    pub no_color:      bool,
    pub verbose:       bool
}

/// Result of a check run
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub exit_code: i32,
    pub output:    String
}

/// Convert CLI dialect to internal SqlDialect
pub fn convert_dialect(dialect: Dialect) -> SqlDialect {
    match dialect {
        Dialect::Generic => SqlDialect::Generic,
        Dialect::Mysql => SqlDialect::MySQL,
        Dialect::Postgresql => SqlDialect::PostgreSQL,
        Dialect::Sqlite => SqlDialect::SQLite,
        Dialect::Clickhouse => SqlDialect::ClickHouse
    }
}

/// Convert CLI format to internal OutputFormat
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Calculate exit code based on diagnostic severities
///
/// - `0` - No diagnostics or only informational ones
/// - `1` - At least one warning present
/// - `2` - At least one error present
pub fn calculate_exit_code(report: &AnalysisReport) -> i32 {
    match report.max_severity() {
        Some(Severity::Error) => 2,
        Some(Severity::Warning) => 1,
        Some(Severity::Info) | None => 0
    }
}

/// Run the check command
pub fn run_check(params: CheckParams, mut config: Config) -> AppResult<CheckResult> {
    if let Some(dialect) = params.dialect {
        config.analysis.dialect = convert_dialect(dialect);
    }

    let mut files = Vec::new();
    for path in &params.inputs {
        files.extend(read_source_files(path)?);
    }

    let analyzer = Analyzer::new(&config);
    let report = analyzer.analyze(&files);
    info!(
        files = files.len(),
        units = report.units_count,
        errors = report.error_count(),
        warnings = report.warning_count(),
        "analysis finished"
    );

    let opts = OutputOptions {
        format:  convert_format(params.output_format),
        colored: !params.no_color,
        verbose: params.verbose
    };
    Ok(CheckResult {
        exit_code: calculate_exit_code(&report),
        output:    format_report(&report, &opts)?
    })
}
