//! Native datastore interface
//!
//! The query engine only ever talks to a store through [`Datastore`]: run a
//! native query and iterate its results, or fetch entities by key.

mod entity;
mod errors;
mod memory;

pub use entity::Entity;
pub use errors::StoreError;
pub use memory::{Fault, InMemoryDatastore};

use crate::planner::NativeQuery;
use crate::value::Key;

/// Query features a store may or may not execute natively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Supports `!=` filters
    pub native_not_equal: bool,
    /// Supports `IN` filters; without it IN lists are exploded into branches
    pub native_in: bool,
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        Self {
            native_not_equal: true,
            native_in: false,
        }
    }
}

/// Lazily produced query results
pub type RecordCursor<'a> = Box<dyn Iterator<Item = Result<Entity, StoreError>> + 'a>;

/// A schemaless key/value store
pub trait Datastore {
    fn capabilities(&self) -> StoreCapabilities;

    /// Opens a cursor over the results of one native query.
    fn run_query(&self, query: &NativeQuery) -> Result<RecordCursor<'_>, StoreError>;

    /// Fetches entities by key; missing keys are skipped.
    fn batch_get(&self, keys: &[Key]) -> Result<Vec<Entity>, StoreError>;
}
