//! Value coercion errors

use thiserror::Error;

use super::key::KeyError;

/// Failure to convert between the object model and the store's type system
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error("value '{value}' cannot be used as a key of kind '{kind}'")]
    NotAKey { kind: String, value: String },

    #[error("key of kind '{found}' where kind '{expected}' was expected")]
    KindMismatch { expected: String, found: String },

    #[error("a {found} value cannot be stored in a {expected} property")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("collection value where a single value was expected")]
    UnexpectedCollection,

    #[error("managed object of kind '{kind}' cannot be compared with a basic property")]
    UnexpectedObject { kind: String },

    #[error("invalid JSON value: {0}")]
    InvalidJson(String),
}
