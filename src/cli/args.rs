//! CLI argument definitions using clap
//!
//! Commands:
//! - kvquery explain --config <path>
//! - kvquery query --config <path>
//! - kvquery check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kvquery - object queries over a schemaless key/value store
#[derive(Parser, Debug)]
#[command(name = "kvquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan the query read from stdin and print the plan
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./kvquery.json")]
        config: PathBuf,
    },

    /// Run the query read from stdin against the configured data
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./kvquery.json")]
        config: PathBuf,
    },

    /// Load the configuration, mappings and data, then exit
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./kvquery.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
