//! kvquery - object queries over a schemaless key/value datastore
//!
//! Translates JDOQL/JPQL-style query trees into the primitive queries a
//! key/value store can execute, rewrites disjunctions into merged
//! multi-query unions, and routes key lookups to batch gets.

pub mod cli;
pub mod datastore;
pub mod executor;
pub mod mapping;
pub mod observability;
pub mod planner;
pub mod value;
