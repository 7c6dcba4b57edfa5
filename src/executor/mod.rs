//! Query execution
//!
//! Consumes query plans and produces result rows.
//!
//! # Execution Flow
//!
//! 1. Open the plan's native queries, or batch-get its keys
//! 2. Merge branch results in the store's order, dropping duplicate keys
//! 3. Apply offset and limit to the merged stream
//! 4. Shape each entity into a row
//!
//! Results are pulled lazily. A store failure surfaces as an error item
//! and ends the stream.

mod executor;
mod filters;
mod merge;
mod result;
mod sorter;

pub use executor::QueryExecutor;
pub use filters::PredicateFilter;
pub use merge::{MergeStats, MergedCursor, WindowedCursor};
pub use result::{QueryResults, ResultRow};
pub use sorter::ResultSorter;
