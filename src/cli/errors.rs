//! CLI-specific error types
//!
//! CLI errors end the process. Query rejections are not CLI errors; they are
//! reported in-band as error responses.

use std::io;

use thiserror::Error;

use crate::datastore::StoreError;
use crate::mapping::MappingError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Request is not a valid query request
    InvalidRequest,
    /// Mapping files could not be loaded
    MappingError,
    /// Entity data could not be loaded
    DataError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "KVQ_CLI_CONFIG_ERROR",
            Self::IoError => "KVQ_CLI_IO_ERROR",
            Self::InvalidRequest => "KVQ_CLI_INVALID_REQUEST",
            Self::MappingError => "KVQ_CLI_MAPPING_ERROR",
            Self::DataError => "KVQ_CLI_DATA_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<MappingError> for CliError {
    fn from(e: MappingError) -> Self {
        Self::new(CliErrorCode::MappingError, e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::new(CliErrorCode::DataError, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
