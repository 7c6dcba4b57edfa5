//! Query planning
//!
//! Translates object-model query trees into native datastore queries.
//!
//! # Pipeline
//!
//! 1. Prepare: resolve the candidate entity, reject unsupported structure
//! 2. Classify: bind parameters, rewrite each conjunct into native filters
//! 3. Expand: explode IN filters into branches when the store lacks IN
//! 4. Build: one native query per branch, or a batch get for key lookups
//!
//! Every rejection names the layer responsible: the query itself, the
//! object mapping, or the datastore.

mod ast;
mod branches;
mod builder;
mod classifier;
mod errors;
mod explain;
mod fastpath;
mod like;
mod native;
mod params;
mod plan;
mod planner;
mod rules;

pub use ast::{
    BoolOperator, Expr, Operator, OrderExpr, ParamRef, PropertyPath, QueryTree, StatementKind,
    UnaryOperator,
};
pub use branches::RewriteBranchSet;
pub use builder::{BuiltQueries, NativeQueryBuilder};
pub use classifier::{Classifier, FieldSource, NormalForm, ProjectedField};
pub use errors::{QueryError, QueryErrorCode, QueryResult, Severity};
pub use explain::ExplainPlan;
pub use fastpath::try_fast_path;
pub use like::{prefix_range, PrefixRange};
pub use native::{
    FilterOperator, FilterPredicate, NativeQuery, SortDirection, SortPredicate, Window,
};
pub use params::Parameters;
pub use plan::{BatchGetPlan, OutputShape, QueryPlan, ScanPlan};
pub use planner::{PlannerConfig, PreparedQuery, QueryPlanner, DEFAULT_MAX_BRANCHES};
