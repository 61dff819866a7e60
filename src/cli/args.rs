//! CLI argument definitions using clap
//!
//! Commands:
//! - bindsl compile
//! - bindsl explain --config <path>
//! - bindsl batch --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bindsl - compile path expressions and select secondary-index filters
#[derive(Parser, Debug)]
#[command(name = "bindsl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log at TRACE level regardless of the configured level
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile each request read from stdin and print the expression tree
    Compile,

    /// Explain index selection for each request read from stdin
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./bindsl.json")]
        config: PathBuf,
    },

    /// Compile each request and select its index filter and residual
    Batch {
        /// Path to configuration file
        #[arg(long, default_value = "./bindsl.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch() {
        let cli = Cli::try_parse_from(["bindsl", "batch", "--config", "x.json", "--verbose"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Batch { config } => assert_eq!(config, PathBuf::from("x.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["bindsl", "explain"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Command::Explain { config } => assert_eq!(config, PathBuf::from("./bindsl.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
