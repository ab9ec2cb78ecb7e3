//! # SQL Flow Analyzer
//!
//! Static checks for database-access code, without a database.
//!
//! `sql-flow-analyzer` reads host programs that a language front-end lowered
//! to JSON or YAML, follows literal query text into the calls that prepare,
//! bind, execute and fetch it, and reports inconsistencies between them.
//!
//! # Quick Start
//!
//! ```bash
//! sql-flow-analyzer check -i src/UserRepository.json
//!
//! # Several inputs, machine-readable output
//! sql-flow-analyzer check -i a.json -i b.yaml -f json
//!
//! # Debug logging on stderr
//! RUST_LOG=sql_flow_analyzer=trace sql-flow-analyzer check -i a.json
//! ```
//!
//! # Exit Codes
//!
//! - `0` - Success, no issues or only informational messages
//! - `1` - Warnings found
//! - `2` - Errors found

use std::process;

use clap::Parser;
use sql_flow_analyzer::{
    app::{CheckParams, run_check},
    cli::{Cli, Commands},
    config::Config,
    error::AppResult
};
use tracing_subscriber::EnvFilter;

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> AppResult<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            inputs,
            output_format,
            dialect,
            no_color,
            verbose
        } => {
            init_tracing(verbose);
            let config = Config::load()?;
            let result = run_check(
                CheckParams {
                    inputs,
                    output_format,
                    dialect,
                    no_color,
                    verbose
                },
                config
            )?;
            println!("{}", result.output);
            Ok(result.exit_code)
        }
    }
}
