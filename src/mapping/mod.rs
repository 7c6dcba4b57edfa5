//! Entity mapping metadata
//!
//! The query engine consumes mappings through [`MappingRegistry`]: entity
//! name to kind, primary key, ancestor property, and property paths to
//! storage names.

mod errors;
mod loader;
mod types;

pub use errors::{MappingError, MappingResult};
pub use loader::{MappingLoader, MappingRegistry};
pub use types::{
    EntityMeta, FieldMeta, FieldType, PrimaryKeyMeta, ResolvedProperty, KEY_PROPERTY,
};
