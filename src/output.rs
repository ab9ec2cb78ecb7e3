use colored::Colorize;

use crate::{
    diagnostic::{AnalysisReport, Diagnostic, Severity},
    error::{AppResult, output_error}
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    /// Print suggestions under each diagnostic
    pub verbose: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            verbose: false
        }
    }
}

/// Render a report in the requested format.
pub fn format_report(report: &AnalysisReport, opts: &OutputOptions) -> AppResult<String> {
    match opts.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).map_err(|e| output_error(e.to_string()))
        }
        OutputFormat::Yaml => serde_yaml::to_string(report).map_err(|e| output_error(e.to_string())),
        OutputFormat::Text => Ok(format_text(report, opts))
    }
}

fn format_text(report: &AnalysisReport, opts: &OutputOptions) -> String {
    let mut out = String::new();
    for file in &report.files {
        for diagnostic in &file.diagnostics {
            out.push_str(&format_diagnostic(&file.path, diagnostic, opts));
        }
    }
    if !out.is_empty() {
        out.push('\n');
    }

    let summary = format!(
        "{} error(s), {} warning(s), {} info in {} unit(s)",
        report.error_count(),
        report.warning_count(),
        report.info_count(),
        report.units_count
    );
    if opts.colored {
        out.push_str(&summary.bold().to_string());
    } else {
        out.push_str(&summary);
    }
    out
}

fn format_diagnostic(path: &str, diagnostic: &Diagnostic, opts: &OutputOptions) -> String {
    let severity = diagnostic.severity.to_string();
    let severity = if opts.colored {
        match diagnostic.severity {
            Severity::Error => severity.red().bold().to_string(),
            Severity::Warning => severity.yellow().bold().to_string(),
            Severity::Info => severity.blue().to_string()
        }
    } else {
        severity
    };
    let position = format!("{}:{}", path, diagnostic.location);
    let position = if opts.colored {
        position.cyan().to_string()
    } else {
        position
    };
    let mut line = format!(
        "{} {} [{}] {}\n",
        position, severity, diagnostic.rule_id, diagnostic.message
    );
    if opts.verbose
        && let Some(suggestion) = &diagnostic.suggestion
    {
        line.push_str(&format!("    = help: {}\n", suggestion));
    }
    line
}
