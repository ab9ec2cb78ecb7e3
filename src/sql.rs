//! Embedded SQL parser adapter.
//!
//! The analysis talks to the SQL parser through [`EmbeddedParser`]. A parse
//! either fails outright ([`ParseOutcome::Failed`], the text could not even be
//! tokenized) or yields one [`Command`] per statement, where statements the
//! parser rejects become [`Command::Invalid`] markers that keep the token rows
//! needed to place the error.

pub mod alias;
pub mod lines;
pub mod syntax;
pub mod walk;

use serde::{Deserialize, Serialize};
use sqlparser::{
    ast::Statement,
    dialect::{
        ClickHouseDialect, Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect
    },
    parser::Parser,
    tokenizer::{Token, TokenWithSpan, Tokenizer}
};
use tracing::debug;

use crate::scan;

/// SQL dialect for parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SqlDialect {
    #[default]
    Generic,
    MySQL,
    #[serde(alias = "postgres")]
    PostgreSQL,
    SQLite,
    ClickHouse
}

impl SqlDialect {
    /// Convert to sqlparser dialect for parsing
    pub fn into_parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::MySQL => Box::new(MySqlDialect {}),
            Self::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Self::SQLite => Box::new(SQLiteDialect {}),
            Self::ClickHouse => Box::new(ClickHouseDialect {})
        }
    }

    /// Parameter marker the dialect's grammar accepts in place of a named
    /// placeholder.
    pub fn parameter_marker(self) -> &'static str {
        match self {
            Self::PostgreSQL => "$1",
            _ => scan::NEUTRAL_MARKER
        }
    }

    /// Parse a dialect name as written in config files and env vars.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "generic" => Some(Self::Generic),
            "mysql" | "mariadb" => Some(Self::MySQL),
            "postgresql" | "postgres" => Some(Self::PostgreSQL),
            "sqlite" => Some(Self::SQLite),
            "clickhouse" => Some(Self::ClickHouse),
            _ => None
        }
    }
}

/// A token of a rejected statement and the row it starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRow {
    /// 1-based line within the statement, as reported by the tokenizer
    pub line:   u64,
    pub column: u64,
    /// 0-based row within the whole query text
    pub row:    u32
}

/// A statement the parser rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCommand {
    /// Raw parser error message
    pub error:    String,
    /// `Line`/`Column` from the error, statement-relative
    pub position: Option<(u64, u64)>,
    /// Non-whitespace tokens of the statement in source order
    pub tokens:   Vec<TokenRow>
}

impl InvalidCommand {
    /// Row of the token the error points at.
    ///
    /// Positions past every token, and errors at end of input, resolve to
    /// the row of the last token.
    pub fn row(&self) -> Option<u32> {
        let last = self.tokens.last().map(|t| t.row);
        if self.error.contains("found: EOF") {
            return last;
        }
        let Some((line, column)) = self.position else {
            return last;
        };
        self.tokens
            .iter()
            .find(|t| (t.line, t.column) >= (line, column))
            .map(|t| t.row)
            .or(last)
    }
}

/// One statement of a parsed text.
#[derive(Debug, Clone)]
pub enum Command {
    Valid(Box<Statement>),
    Invalid(InvalidCommand)
}

/// Result of handing a text to the embedded parser.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Commands(Vec<Command>),
    /// The parser gave up on the whole text
    Failed(String)
}

impl ParseOutcome {
    /// Parsed statements, or `None` if anything in the text was rejected.
    pub fn statements(&self) -> Option<Vec<&Statement>> {
        let ParseOutcome::Commands(commands) = self else {
            return None;
        };
        commands
            .iter()
            .map(|command| match command {
                Command::Valid(statement) => Some(statement.as_ref()),
                Command::Invalid(_) => None
            })
            .collect()
    }
}

/// Structured parser used for syntax validation and semantic checks.
pub trait EmbeddedParser: Send + Sync {
    fn parse(&self, text: &str) -> ParseOutcome;

    /// Marker that replaces named placeholders before [`parse`](Self::parse).
    fn parameter_marker(&self) -> &str {
        scan::NEUTRAL_MARKER
    }

    /// Whether the parser can be used at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// [`EmbeddedParser`] backed by `sqlparser`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlparserAdapter {
    dialect: SqlDialect
}

impl SqlparserAdapter {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

impl EmbeddedParser for SqlparserAdapter {
    fn parameter_marker(&self) -> &str {
        self.dialect.parameter_marker()
    }

    fn parse(&self, text: &str) -> ParseOutcome {
        let dialect = self.dialect.into_parser_dialect();
        if let Err(e) = Tokenizer::new(dialect.as_ref(), text).tokenize_with_location() {
            debug!(error = %e, "query text could not be tokenized");
            return ParseOutcome::Failed(e.to_string());
        }
        let mut commands = Vec::new();
        for chunk in scan::split_statements(text) {
            match Parser::parse_sql(dialect.as_ref(), chunk.text) {
                Ok(statements) => {
                    commands.extend(
                        statements
                            .into_iter()
                            .map(|s| Command::Valid(Box::new(s)))
                    );
                }
                Err(e) => {
                    let error = e.to_string();
                    let base_row = scan::row_at(text, chunk.start);
                    commands.push(Command::Invalid(InvalidCommand {
                        position: extract_position(&error),
                        tokens: token_rows(dialect.as_ref(), chunk.text, base_row),
                        error
                    }));
                }
            }
        }
        ParseOutcome::Commands(commands)
    }
}

fn token_rows(dialect: &dyn Dialect, text: &str, base_row: u32) -> Vec<TokenRow> {
    let Ok(tokens) = Tokenizer::new(dialect, text).tokenize_with_location() else {
        return Vec::new();
    };
    tokens
        .iter()
        .filter(|t: &&TokenWithSpan| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
        .map(|t| TokenRow {
            line:   t.span.start.line,
            column: t.span.start.column,
            row:    base_row + t.span.start.line.saturating_sub(1) as u32
        })
        .collect()
}

/// Pull `Line: X, Column: Y` out of a sqlparser error message.
pub fn extract_position(message: &str) -> Option<(u64, u64)> {
    let line_marker = "Line: ";
    let line_start = message.rfind(line_marker)? + line_marker.len();
    let rest = &message[line_start..];
    let line_end = rest.find(|c: char| !c.is_ascii_digit())?;
    let line = rest[..line_end].parse().ok()?;
    let rest = &rest[line_end..];
    let rest = rest
        .strip_prefix(", Column: ")
        .or_else(|| rest.strip_prefix(", Column "))?;
    let column_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let column = rest[..column_end].parse().ok()?;
    Some((line, column))
}

/// Strip the parser's error prefix and the trailing position dump.
pub fn clean_message(message: &str) -> String {
    let message = message
        .strip_prefix("sql parser error: ")
        .unwrap_or(message);
    let message = match message.find(" at Line:") {
        Some(cut) => &message[..cut],
        None => message
    };
    message.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_position() {
        assert_eq!(
            extract_position("sql parser error: Expected: end of statement, found: x at Line: 3, Column: 14"),
            Some((3, 14))
        );
        assert_eq!(extract_position("Expected: an expression, found: EOF"), None);
    }

    #[test]
    fn test_clean_message() {
        assert_eq!(
            clean_message("sql parser error: Expected: end of statement, found: x at Line: 3, Column: 14"),
            "Expected: end of statement, found: x"
        );
    }

    #[test]
    fn test_valid_statements() {
        let outcome = SqlparserAdapter::default().parse("SELECT 1; SELECT 2");
        assert_eq!(outcome.statements().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_invalid_statement_keeps_rows() {
        let outcome = SqlparserAdapter::default().parse("SELECT 1;\nSELECT id\nFROM");
        let ParseOutcome::Commands(commands) = outcome else {
            panic!("expected commands");
        };
        assert_eq!(commands.len(), 2);
        let Command::Invalid(invalid) = &commands[1] else {
            panic!("expected invalid second statement");
        };
        assert_eq!(invalid.row(), Some(2));
    }

    #[test]
    fn test_parameter_marker_follows_dialect() {
        for dialect in [SqlDialect::Generic, SqlDialect::MySQL, SqlDialect::SQLite] {
            assert_eq!(SqlparserAdapter::new(dialect).parameter_marker(), "?");
        }
        let postgres = SqlparserAdapter::new(SqlDialect::PostgreSQL);
        assert_eq!(postgres.parameter_marker(), "$1");
        let text = scan::neutralize("SELECT id FROM t WHERE id = :id", postgres.parameter_marker());
        assert!(postgres.parse(&text).statements().is_some());
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(SqlDialect::from_name("MySQL"), Some(SqlDialect::MySQL));
        assert_eq!(SqlDialect::from_name("postgres"), Some(SqlDialect::PostgreSQL));
        assert_eq!(SqlDialect::from_name("oracle"), None);
    }
}
