use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SQL Flow Analyzer - Check query text, parameter binding and result shapes
/// in database-access code
#[derive(Parser, Debug)]
#[command(name = "sql-flow-analyzer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check host files lowered to JSON or YAML
    Check {
        /// Host input files (.json, .yaml, .yml)
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        /// SQL dialect for parsing (overrides configuration)
        #[arg(long, value_enum)]
        dialect: Option<Dialect>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Enable debug logging and show suggestions
        #[arg(short, long)]
        verbose: bool
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Dialect {
    Generic,
    Mysql,
    Postgresql,
    Sqlite,
    Clickhouse
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
