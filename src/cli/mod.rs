//! CLI module for bindsl
//!
//! Provides command-line interface for:
//! - compile: Compile expressions to typed trees
//! - explain: Explain secondary-index selection
//! - batch: Compile and select index filters

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    batch_requests, compile_requests, explain_requests, run, run_command, BatchSummary,
};
pub use config::{Config, ContextDefinition, IndexDefinition, KeyDefinition};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_request, write_error, write_response, Request};
