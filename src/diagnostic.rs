//! Diagnostic records produced by the analysis.
//!
//! This module defines the types every analyzer emits:
//! - [`Severity`] - Diagnostic severity levels (Info, Warning, Error)
//! - [`RuleGroup`] - Which component produced a diagnostic
//! - [`Category`] - The named defect kinds, each with a stable ID
//! - [`Diagnostic`] - One reported defect with its host location
//! - [`AnalysisReport`] - Complete analysis results per file

use serde::Serialize;

use crate::host::Location;

/// Severity level of a diagnostic.
///
/// Ordered from lowest to highest severity for sorting purposes.
/// Exit codes are determined by the highest severity found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// Informational suggestion, does not affect exit code
    Info,
    /// Warning that may indicate a problem (exit code 1)
    Warning,
    /// Definite defect (exit code 2)
    Error
}

impl Severity {
    /// Parse a configuration value such as `"warn"` or `"error"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR")
        }
    }
}

/// Component that produces a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleGroup {
    /// Placeholders vs. bound parameters
    Binding,
    /// Declared result shapes vs. the query and fetch calls
    Shape,
    /// Embedded parser errors
    Syntax,
    /// Checks over the structured parse
    Semantic,
    /// Dialect-specific constructs
    Portability
}

impl std::fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binding => write!(f, "Binding"),
            Self::Shape => write!(f, "Shape"),
            Self::Syntax => write!(f, "Syntax"),
            Self::Semantic => write!(f, "Semantic"),
            Self::Portability => write!(f, "Portability")
        }
    }
}

/// Every defect kind the analysis can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    MissingParameter,
    UnusedParameter,
    MissingBinding,
    UnusedBinding,
    FetchTypeMismatch,
    ColumnMismatch,
    ColumnMissing,
    MissingNullableHandling,
    SyntaxError,
    Tautology,
    SelfReference,
    InvalidTableReference,
    Portability
}

impl Category {
    pub const ALL: [Category; 13] = [
        Self::MissingParameter,
        Self::UnusedParameter,
        Self::MissingBinding,
        Self::UnusedBinding,
        Self::FetchTypeMismatch,
        Self::ColumnMismatch,
        Self::ColumnMissing,
        Self::MissingNullableHandling,
        Self::SyntaxError,
        Self::Tautology,
        Self::SelfReference,
        Self::InvalidTableReference,
        Self::Portability
    ];

    /// Stable identifier (e.g. `"BIND001"`).
    pub fn id(self) -> &'static str {
        match self {
            Self::MissingParameter => "BIND001",
            Self::UnusedParameter => "BIND002",
            Self::MissingBinding => "BIND003",
            Self::UnusedBinding => "BIND004",
            Self::FetchTypeMismatch => "SHAPE001",
            Self::ColumnMismatch => "SHAPE002",
            Self::ColumnMissing => "SHAPE003",
            Self::MissingNullableHandling => "SHAPE004",
            Self::SyntaxError => "SQL001",
            Self::Tautology => "SQL002",
            Self::SelfReference => "SQL003",
            Self::InvalidTableReference => "SQL004",
            Self::Portability => "SQL005"
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::MissingParameter => "Missing execute parameter",
            Self::UnusedParameter => "Unused execute parameter",
            Self::MissingBinding => "Missing binding",
            Self::UnusedBinding => "Unused binding",
            Self::FetchTypeMismatch => "Fetch type mismatch",
            Self::ColumnMismatch => "Column mismatch",
            Self::ColumnMissing => "Column missing",
            Self::MissingNullableHandling => "Missing no-row handling",
            Self::SyntaxError => "SQL syntax error",
            Self::Tautology => "Constant condition",
            Self::SelfReference => "Self-referencing condition",
            Self::InvalidTableReference => "Invalid table reference",
            Self::Portability => "Non-portable SQL"
        }
    }

    pub fn group(self) -> RuleGroup {
        match self {
            Self::MissingParameter
            | Self::UnusedParameter
            | Self::MissingBinding
            | Self::UnusedBinding => RuleGroup::Binding,
            Self::FetchTypeMismatch
            | Self::ColumnMismatch
            | Self::ColumnMissing
            | Self::MissingNullableHandling => RuleGroup::Shape,
            Self::SyntaxError => RuleGroup::Syntax,
            Self::Tautology | Self::SelfReference | Self::InvalidTableReference => {
                RuleGroup::Semantic
            }
            Self::Portability => RuleGroup::Portability
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            Self::MissingNullableHandling | Self::Tautology | Self::SelfReference => {
                Severity::Warning
            }
            Self::Portability => Severity::Info,
            _ => Severity::Error
        }
    }

    /// Look up a category by ID or by its variant name, ignoring case.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| {
            c.id().eq_ignore_ascii_case(key) || format!("{:?}", c).eq_ignore_ascii_case(key)
        })
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single reported defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Stable rule identifier, derived from the category
    pub rule_id:    &'static str,
    pub category:   Category,
    pub severity:   Severity,
    /// Detailed description of the defect
    pub message:    String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
    /// Host document position (1-indexed line)
    pub location:   Location
}

impl Diagnostic {
    pub fn new(category: Category, message: impl Into<String>, location: Location) -> Self {
        Self {
            rule_id: category.id(),
            category,
            severity: category.default_severity(),
            message: message.into(),
            suggestion: None,
            location
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Diagnostics for one host file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path:        String,
    pub diagnostics: Vec<Diagnostic>
}

/// Complete analysis report.
///
/// Use [`error_count`](Self::error_count),
/// [`warning_count`](Self::warning_count), and [`info_count`](Self::info_count)
/// to get counts by severity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub files:       Vec<FileReport>,
    /// Number of analyzed units (types and free functions)
    pub units_count: usize
}

impl AnalysisReport {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    /// Highest severity present, if any diagnostic was reported.
    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics().map(|d| d.severity).max()
    }
}
