//! Syntax validation of resolved query text.

use tracing::debug;

use super::{Command, EmbeddedParser, ParseOutcome, clean_message};
use crate::scan;

/// Queries longer than this many characters are not parsed by default.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 10_000;

/// A syntax problem found in one query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub message:          String,
    /// 0-based row within the query text, when the parser could place it
    pub line_within_text: Option<u32>
}

/// Validates query text with an [`EmbeddedParser`].
pub struct SyntaxValidator<'a> {
    parser:           &'a dyn EmbeddedParser,
    max_query_length: usize
}

impl<'a> SyntaxValidator<'a> {
    pub fn new(parser: &'a dyn EmbeddedParser, max_query_length: usize) -> Self {
        Self {
            parser,
            max_query_length
        }
    }

    pub fn is_available(&self) -> bool {
        self.parser.is_available()
    }

    /// `text` with placeholders replaced by the parser's parameter marker.
    pub fn neutralize(&self, text: &str) -> String {
        scan::neutralize(text, self.parser.parameter_marker())
    }

    /// Parse `text` with placeholders neutralized.
    ///
    /// Returns `None` when the text is over the size ceiling or the parser is
    /// unavailable; such text counts as not analyzed.
    pub fn parse(&self, text: &str) -> Option<ParseOutcome> {
        if !self.is_available() {
            return None;
        }
        let length = text.chars().count();
        if length > self.max_query_length {
            debug!(length, limit = self.max_query_length, "query text over size ceiling, skipped");
            return None;
        }
        Some(self.parser.parse(&self.neutralize(text)))
    }

    pub fn validate(&self, text: &str) -> Vec<SyntaxIssue> {
        self.parse(text)
            .map(|outcome| issues(&outcome))
            .unwrap_or_default()
    }
}

/// Syntax issues carried by a parse outcome.
pub fn issues(outcome: &ParseOutcome) -> Vec<SyntaxIssue> {
    match outcome {
        ParseOutcome::Failed(message) => vec![SyntaxIssue {
            message:          clean_message(message),
            line_within_text: None
        }],
        ParseOutcome::Commands(commands) => commands
            .iter()
            .filter_map(|command| match command {
                Command::Invalid(invalid) => Some(SyntaxIssue {
                    message:          clean_message(&invalid.error),
                    line_within_text: invalid.row()
                }),
                Command::Valid(_) => None
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqlparserAdapter;

    struct Unavailable;

    impl EmbeddedParser for Unavailable {
        fn parse(&self, _text: &str) -> ParseOutcome {
            ParseOutcome::Commands(vec![])
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_valid_query_with_placeholders() {
        let parser = SqlparserAdapter::default();
        let validator = SyntaxValidator::new(&parser, DEFAULT_MAX_QUERY_LENGTH);
        assert!(validator
            .validate("SELECT id FROM users WHERE id = :id AND name = ':x'")
            .is_empty());
    }

    #[test]
    fn test_named_placeholders_under_postgres() {
        let parser = SqlparserAdapter::new(crate::sql::SqlDialect::PostgreSQL);
        let validator = SyntaxValidator::new(&parser, DEFAULT_MAX_QUERY_LENGTH);
        assert!(validator
            .validate("SELECT id FROM users WHERE id = :id AND name IN (:a, :b)")
            .is_empty());
    }

    #[test]
    fn test_incomplete_statement() {
        let parser = SqlparserAdapter::default();
        let validator = SyntaxValidator::new(&parser, DEFAULT_MAX_QUERY_LENGTH);
        let issues = validator.validate("SELECT id\nFROM");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line_within_text, Some(1));
        assert!(!issues[0].message.contains("Line:"));
    }

    #[test]
    fn test_oversized_text_is_skipped() {
        let parser = SqlparserAdapter::default();
        let validator = SyntaxValidator::new(&parser, 10);
        assert!(validator.validate("SELECT FROM WHERE garbage").is_empty());
    }

    #[test]
    fn test_tokenizer_failure_has_no_line() {
        let parser = SqlparserAdapter::default();
        let validator = SyntaxValidator::new(&parser, DEFAULT_MAX_QUERY_LENGTH);
        let issues = validator.validate("SELECT 'unterminated");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line_within_text, None);
    }

    #[test]
    fn test_unavailable_parser() {
        let validator = SyntaxValidator::new(&Unavailable, DEFAULT_MAX_QUERY_LENGTH);
        assert!(validator.validate("SELEC").is_empty());
    }
}
