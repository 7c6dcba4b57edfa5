//! CLI module for kvquery
//!
//! Provides command-line interface for:
//! - explain: plan one query and print the plan or the rejection
//! - query: run one query against the configured entity data
//! - check-config: validate configuration, mappings and data

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    check_config, explain, query, run, run_command, Config, QueryRequest, Session,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_response, ok_response, parse_request, read_request, write_error, write_response};
