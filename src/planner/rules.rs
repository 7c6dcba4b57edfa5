//! Operator translation rules
//!
//! Every decision about whether an operator can be expressed natively lives
//! here, so the full table can be read in one place:
//!
//! | operator          | column      | primary key  | ancestor | child rel. | parent rel. |
//! |-------------------|-------------|--------------|----------|------------|-------------|
//! | `=`               | filter `=`  | key `=`      | ancestor | key `=`    | ancestor    |
//! | `<` `<=` `>` `>=` | filter      | key filter   | store    | store      | store       |
//! | `<>`              | filter `!=`*| key `!=`*    | store    | store      | store       |
//! | arithmetic, `\|\|`, `IS` | orm  | orm          | orm      | orm        | orm         |
//!
//! `orm` rejects with `KVQ_UNSUPPORTED_BY_ORM`, `store` with
//! `KVQ_UNSUPPORTED_BY_DATASTORE`. Starred entries need native not-equal
//! support and are store rejections without it.

use super::ast::{Operator, UnaryOperator};
use super::errors::{QueryError, QueryResult};
use super::native::FilterOperator;
use crate::datastore::StoreCapabilities;

/// What a property path resolved to, for rule lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Column,
    PrimaryKey,
    Ancestor,
    ChildRelation,
    ParentRelation,
}

impl Target {
    fn describe(&self) -> &'static str {
        match self {
            Target::Column => "property",
            Target::PrimaryKey => "primary key",
            Target::Ancestor => "ancestor property",
            Target::ChildRelation => "child relation",
            Target::ParentRelation => "parent relation",
        }
    }
}

/// Native form of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// Property filter
    Filter(FilterOperator),
    /// `__key__` filter; equality feeds the batch-get fast path
    KeyFilter(FilterOperator),
    /// Sets the ancestor constraint
    Ancestor,
    /// Key equality on the operand's parent key
    ChildKey,
    /// Ancestor constraint from the operand's key
    ParentAncestor,
}

/// Treatment of a unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryRule {
    /// Folded into a numeric literal
    FoldNegative,
    Unsupported,
}

/// Treatment of a function call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRule {
    /// Resolves to the clock's "now"
    CurrentTime,
    /// Bare `COUNT` in the result clause
    Count,
    Unsupported,
}

fn comparison_operator(op: Operator) -> Option<FilterOperator> {
    match op {
        Operator::Eq => Some(FilterOperator::Eq),
        Operator::Ne => Some(FilterOperator::Ne),
        Operator::Lt => Some(FilterOperator::Lt),
        Operator::Lte => Some(FilterOperator::Lte),
        Operator::Gt => Some(FilterOperator::Gt),
        Operator::Gte => Some(FilterOperator::Gte),
        Operator::Add
        | Operator::Sub
        | Operator::Mul
        | Operator::Div
        | Operator::Mod
        | Operator::Concat
        | Operator::Is
        | Operator::IsNot => None,
    }
}

/// Rejects operators the query layer never translates.
pub fn check_operator(op: Operator) -> QueryResult<FilterOperator> {
    comparison_operator(op).ok_or_else(|| QueryError::unsupported_operator(op.token()))
}

/// Looks up the native form of `op` applied to a `target`.
pub fn comparison_rule(
    op: Operator,
    target: Target,
    capabilities: &StoreCapabilities,
) -> QueryResult<Translation> {
    let filter_op = check_operator(op)?;

    if filter_op == FilterOperator::Ne && !capabilities.native_not_equal {
        return Err(QueryError::unsupported_by_datastore(
            "Not-equal filters are not supported by the datastore",
        )
        .with_operator(op.token()));
    }

    match (target, filter_op) {
        (Target::Column, op) => Ok(Translation::Filter(op)),
        (Target::PrimaryKey, op) => Ok(Translation::KeyFilter(op)),
        (Target::Ancestor, FilterOperator::Eq) => Ok(Translation::Ancestor),
        (Target::ChildRelation, FilterOperator::Eq) => Ok(Translation::ChildKey),
        (Target::ParentRelation, FilterOperator::Eq) => Ok(Translation::ParentAncestor),
        (target, _) => Err(QueryError::unsupported_by_datastore(format!(
            "Operator '{}' is not supported on a {}; only equality is",
            op.token(),
            target.describe()
        ))
        .with_operator(op.token())),
    }
}

pub fn unary_rule(op: UnaryOperator) -> UnaryRule {
    match op {
        UnaryOperator::Neg => UnaryRule::FoldNegative,
        UnaryOperator::Not | UnaryOperator::Complement => UnaryRule::Unsupported,
    }
}

pub fn function_rule(name: &str) -> FunctionRule {
    match name.to_ascii_uppercase().as_str() {
        "CURRENT_DATE" | "CURRENT_TIME" | "CURRENT_TIMESTAMP" => FunctionRule::CurrentTime,
        "COUNT" => FunctionRule::Count,
        _ => FunctionRule::Unsupported,
    }
}
