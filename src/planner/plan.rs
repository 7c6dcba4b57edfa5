//! Executable plans

use super::classifier::ProjectedField;
use super::native::{FilterPredicate, NativeQuery, SortPredicate, Window};
use crate::value::Key;

/// What each result row holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputShape {
    Entities,
    Fields(Vec<ProjectedField>),
    Count,
}

impl OutputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputShape::Entities => "ENTITIES",
            OutputShape::Fields(_) => "FIELDS",
            OutputShape::Count => "COUNT",
        }
    }
}

/// One or more native queries whose results are merged
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub queries: Vec<NativeQuery>,
    /// Sort order shared by every query, used to merge
    pub sorts: Vec<SortPredicate>,
    /// Applied after merging
    pub window: Window,
    pub output: OutputShape,
}

/// Direct key lookup with client-side filtering, sorting and windowing
#[derive(Debug, Clone, PartialEq)]
pub struct BatchGetPlan {
    pub kind: String,
    pub keys: Vec<Key>,
    pub ancestor: Option<Key>,
    /// Filters evaluated against the fetched entities
    pub residual: Vec<FilterPredicate>,
    pub sorts: Vec<SortPredicate>,
    pub window: Window,
    pub output: OutputShape,
}

/// Plan for one bound query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    Scan(ScanPlan),
    BatchGet(BatchGetPlan),
    /// Can never match; nothing runs
    Empty(OutputShape),
}

impl QueryPlan {
    pub fn strategy(&self) -> &'static str {
        match self {
            QueryPlan::Scan(scan) if scan.queries.len() > 1 => "MULTI_QUERY",
            QueryPlan::Scan(_) => "SCAN",
            QueryPlan::BatchGet(_) => "BATCH_GET",
            QueryPlan::Empty(_) => "EMPTY",
        }
    }

    pub fn output(&self) -> &OutputShape {
        match self {
            QueryPlan::Scan(scan) => &scan.output,
            QueryPlan::BatchGet(batch) => &batch.output,
            QueryPlan::Empty(output) => output,
        }
    }

    /// Number of native operations the plan issues
    pub fn operation_count(&self) -> usize {
        match self {
            QueryPlan::Scan(scan) => scan.queries.len(),
            QueryPlan::BatchGet(_) => 1,
            QueryPlan::Empty(_) => 0,
        }
    }
}
