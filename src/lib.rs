//! # SQL Flow Analyzer Library
//!
//! Static analysis of database-access code: follows literal query text into
//! the calls that prepare, bind, execute and fetch it, and checks that the
//! pieces agree with each other and with a structured parse of the SQL.
//!
//! # Pipeline
//!
//! 1. [`host`] - the host program as handed over by a front-end
//! 2. [`sites`] - per-unit facts: query sites, bindings, executes, fetches
//! 3. [`resolve`] and [`scan`] - query text and its placeholders
//! 4. [`binding`] - placeholders against supplied parameters
//! 5. [`shape`] - declared result shapes against the query and the fetch
//! 6. [`sql`] and [`rules`] - syntax and semantic checks on the parsed query
//! 7. [`diagnostic`] - the records everything above produces
//!
//! [`analyzer::Analyzer`] ties these together per unit.
//!
//! # Example
//!
//! ```ignore
//! use sql_flow_analyzer::{analyzer::Analyzer, app::read_source_files, config::Config};
//!
//! let files = read_source_files("UserRepository.json".as_ref())?;
//! let report = Analyzer::new(&Config::default()).analyze(&files);
//! for diagnostic in report.diagnostics() {
//!     println!("{} {}", diagnostic.rule_id, diagnostic.message);
//! }
//! ```

pub mod analyzer;
pub mod app;
pub mod binding;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod host;
pub mod output;
pub mod resolve;
pub mod rules;
pub mod scan;
pub mod shape;
pub mod sites;
pub mod sql;
