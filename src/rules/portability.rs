use std::sync::LazyLock;

use regex::Regex;

use super::{QueryContext, Rule};
use crate::{
    diagnostic::{Category, Diagnostic},
    scan,
    sql::lines::LineLocator
};

/// Dialect-specific functions and their portable replacements.
const FUNCTIONS: [(&str, &str); 13] = [
    ("IFNULL", "Use COALESCE(x, y)"),
    ("ISNULL", "Use COALESCE(x, y) or x IS NULL"),
    ("NVL", "Use COALESCE(x, y)"),
    ("NOW", "Use CURRENT_TIMESTAMP"),
    ("CURDATE", "Use CURRENT_DATE"),
    ("CURTIME", "Use CURRENT_TIME"),
    ("GETDATE", "Use CURRENT_TIMESTAMP"),
    ("SYSDATE", "Use CURRENT_TIMESTAMP"),
    ("RAND", "Use the random function of the target dialect (RANDOM() or RAND())"),
    ("GROUP_CONCAT", "Use STRING_AGG or LISTAGG"),
    ("DATE_FORMAT", "Format dates in the application or use CAST"),
    ("UNIX_TIMESTAMP", "Use EXTRACT(EPOCH FROM ...)"),
    ("LEN", "Use CHAR_LENGTH")
];

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = FUNCTIONS.iter().map(|(name, _)| *name).collect();
    Regex::new(&format!(r"(?i)(?:^|[^\w:.])({})\s*\(", names.join("|")))
        .expect("valid function regex")
});

static LIMIT_COMMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bLIMIT\s+(\d+|:\w+|\?)\s*,\s*(\d+|:\w+|\?)").expect("valid limit regex")
});

/// Functions and clauses that only some SQL dialects understand.
///
/// Works on the raw text, so it also reports on queries the parser rejects.
pub struct Portability;

fn suggestion_for(function: &str) -> &'static str {
    FUNCTIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(function))
        .map_or("Use a standard SQL equivalent", |(_, suggestion)| suggestion)
}

impl Rule for Portability {
    fn category(&self) -> Category {
        Category::Portability
    }

    fn check(&self, cx: &QueryContext<'_>, _lines: &mut LineLocator<'_>) -> Vec<Diagnostic> {
        let masked = scan::mask_literals(cx.text);
        let mut found: Vec<(usize, Diagnostic)> = Vec::new();

        for caps in FUNCTION_CALL.captures_iter(&masked) {
            let Some(name) = caps.get(1) else {
                continue;
            };
            let row = scan::row_at(&masked, name.start());
            found.push((
                name.start(),
                Diagnostic::new(
                    self.category(),
                    format!(
                        "Function {}() is not portable across SQL dialects",
                        name.as_str().to_uppercase()
                    ),
                    cx.location_at_row(row)
                )
                .with_suggestion(suggestion_for(name.as_str()))
            ));
        }

        for caps in LIMIT_COMMA.captures_iter(&masked) {
            let (Some(whole), Some(offset), Some(count)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let row = scan::row_at(&masked, whole.start());
            found.push((
                whole.start(),
                Diagnostic::new(
                    self.category(),
                    "LIMIT offset, count is MySQL-specific syntax",
                    cx.location_at_row(row)
                )
                .with_suggestion(format!(
                    "Use LIMIT {} OFFSET {}",
                    count.as_str(),
                    offset.as_str()
                ))
            ));
        }

        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, d)| d).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::Location,
        sql::{SqlDialect, SqlparserAdapter, syntax::SyntaxValidator}
    };

    fn check(sql: &str) -> Vec<Diagnostic> {
        let parser = SqlparserAdapter::new(SqlDialect::Generic);
        let validator = SyntaxValidator::new(&parser, 10_000);
        let cx = QueryContext::new(sql, Location::new(10, 5), &validator);
        let mut lines = LineLocator::new(&cx.neutralized);
        Portability.check(&cx, &mut lines)
    }

    #[test]
    fn test_function_names_are_flagged_with_rows() {
        let found = check("SELECT IFNULL(a, 0),\n  now()\nFROM t");
        assert_eq!(found.len(), 2);
        assert!(found[0].message.contains("IFNULL()"));
        assert_eq!(found[0].location.line, 10);
        assert!(found[1].message.contains("NOW()"));
        assert_eq!(found[1].location.line, 11);
        assert_eq!(found[1].suggestion.as_deref(), Some("Use CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_quoted_and_qualified_names_are_ignored() {
        assert!(check("SELECT 'now()' FROM t").is_empty());
        assert!(check("SELECT t.len(x), lengthy(y) FROM t").is_empty());
        assert!(check("SELECT COALESCE(a, 0) FROM t").is_empty());
    }

    #[test]
    fn test_limit_with_offset_comma() {
        let found = check("SELECT id FROM t\nLIMIT 20, 10");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location.line, 11);
        assert_eq!(found[0].suggestion.as_deref(), Some("Use LIMIT 10 OFFSET 20"));
        assert!(check("SELECT id FROM t LIMIT 10 OFFSET 20").is_empty());
    }

    #[test]
    fn test_limit_with_placeholders() {
        let found = check("SELECT id FROM t LIMIT :offset, :count");
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].suggestion.as_deref(),
            Some("Use LIMIT :count OFFSET :offset")
        );
    }
}
