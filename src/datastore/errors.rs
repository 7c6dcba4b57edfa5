//! Datastore errors

use thiserror::Error;

/// Errors raised by a datastore implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store refused the query as illegal
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("datastore failure: {0}")]
    Failure(String),

    #[error("datastore timeout: {0}")]
    Timeout(String),
}

impl StoreError {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, StoreError::BadRequest(_))
    }
}
