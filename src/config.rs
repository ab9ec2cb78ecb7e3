//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.sql-flow.toml` in current directory
//! 4. `~/.config/sql-flow/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [analysis]
//! dialect = "mysql"            # generic, mysql, postgresql, sqlite, clickhouse
//! max_query_length = 10000
//! portability = true
//!
//! [rules]
//! disabled = ["SQL005", "MissingNullableHandling"]
//!
//! [rules.severity]
//! SHAPE004 = "error"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `SQL_FLOW_DIALECT` | SQL dialect for the embedded parser |
//! | `SQL_FLOW_MAX_QUERY_LENGTH` | Character ceiling for parser invocation |

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf}
};

use serde::Deserialize;

use crate::{
    error::{AppResult, config_error},
    sql::{SqlDialect, syntax::DEFAULT_MAX_QUERY_LENGTH}
};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub rules:    RulesConfig
}

/// Analysis settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub dialect:          SqlDialect,
    /// Queries longer than this many characters are not parsed
    pub max_query_length: usize,
    /// Report dialect-specific functions and clauses
    pub portability:      bool
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dialect:          SqlDialect::Generic,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            portability:      true
        }
    }
}

/// Rules configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RulesConfig {
    /// Disabled categories, by ID (`SQL005`) or name (`Portability`)
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Severity overrides (category ID or name -> severity)
    #[serde(default)]
    pub severity: HashMap<String, String>
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.sql-flow.toml)
    /// 3. Config file in home directory (~/.config/sql-flow/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sql-flow")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".sql-flow.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Read one TOML config file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            config_error(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    /// Override settings from `SQL_FLOW_*` environment variables.
    pub fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(dialect) = env::var("SQL_FLOW_DIALECT") {
            self.analysis.dialect = SqlDialect::from_name(&dialect).ok_or_else(|| {
                config_error(format!("Unknown SQL_FLOW_DIALECT value '{}'", dialect))
            })?;
        }
        if let Ok(length) = env::var("SQL_FLOW_MAX_QUERY_LENGTH") {
            self.analysis.max_query_length = length.trim().parse().map_err(|_| {
                config_error(format!(
                    "SQL_FLOW_MAX_QUERY_LENGTH must be a number, got '{}'",
                    length
                ))
            })?;
        }
        Ok(())
    }
}
