//! Mapping errors

use thiserror::Error;

pub type MappingResult<T> = Result<T, MappingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("entity '{0}' is not mapped")]
    UnknownEntity(String),

    #[error("entity '{entity}' has no property '{path}'")]
    UnknownProperty { entity: String, path: String },

    #[error("property '{path}' of entity '{entity}' is not embedded and cannot be traversed")]
    NotEmbeddable { entity: String, path: String },

    #[error("property '{path}' of entity '{entity}' is an embedded object, not a stored property")]
    NotAProperty { entity: String, path: String },

    #[error("entity '{entity}' is mapped twice")]
    DuplicateEntity { entity: String },

    #[error("invalid mapping in {source_name}: {reason}")]
    Invalid { source_name: String, reason: String },

    #[error("cannot read mappings from {path}: {reason}")]
    Io { path: String, reason: String },
}

impl MappingError {
    pub fn invalid(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        MappingError::Invalid {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
