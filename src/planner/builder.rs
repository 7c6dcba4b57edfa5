//! Native query construction
//!
//! Turns a classified query into executable native queries: one per branch,
//! sharing ancestor, sorts and projection. When several branches run, each
//! fetches the widened window and the caller windows the merged stream.

use std::collections::BTreeSet;

use super::branches::RewriteBranchSet;
use super::classifier::{FieldSource, NormalForm};
use super::errors::{QueryError, QueryResult};
use super::native::{NativeQuery, Window};
use crate::datastore::StoreCapabilities;

/// Native queries for one bound query, plus the window still to apply
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQueries {
    pub queries: Vec<NativeQuery>,
    /// Applied to the merged stream; unbounded for a single query
    pub window: Window,
}

/// Builds native queries from a normal form
pub struct NativeQueryBuilder<'a> {
    form: &'a NormalForm,
    capabilities: StoreCapabilities,
    max_branches: usize,
}

impl<'a> NativeQueryBuilder<'a> {
    pub fn new(form: &'a NormalForm, capabilities: StoreCapabilities, max_branches: usize) -> Self {
        Self {
            form,
            capabilities,
            max_branches,
        }
    }

    pub fn build(&self) -> QueryResult<BuiltQueries> {
        check_inequalities(self.form)?;
        let window = resolve_window(self.form)?;

        let branches =
            RewriteBranchSet::expand(&self.form.filters, &self.capabilities, self.max_branches)?;
        let single = branches.branch_count() == 1;
        let branch_window = if single { window } else { window.widened() };
        let projection = projection(self.form);

        let queries = branches
            .into_branches()
            .into_iter()
            .map(|filters| NativeQuery {
                kind: self.form.kind.clone(),
                ancestor: self.form.ancestor.clone(),
                filters,
                sorts: self.form.sorts.clone(),
                offset: branch_window.offset,
                limit: branch_window.limit,
                projection: projection.clone(),
            })
            .collect();

        Ok(BuiltQueries {
            queries,
            window: if single { Window::unbounded() } else { window },
        })
    }
}

/// Enforces the store's inequality rules: at most one property carries
/// inequality filters, and if the query is sorted that property sorts first.
pub fn check_inequalities(form: &NormalForm) -> QueryResult<()> {
    let properties: BTreeSet<&str> = form
        .filters
        .iter()
        .filter(|f| f.operator.is_inequality())
        .map(|f| f.property.as_str())
        .collect();

    if properties.len() > 1 {
        let names: Vec<&str> = properties.into_iter().collect();
        return Err(QueryError::unsupported_by_datastore(format!(
            "Inequality filters are allowed on only one property, found {}",
            names.join(", ")
        ))
        .with_property(names.join(", ")));
    }

    if let (Some(property), Some(first)) = (properties.iter().next(), form.sorts.first()) {
        if first.property != *property {
            return Err(QueryError::unsupported_by_datastore(format!(
                "Property '{}' has an inequality filter and must be sorted first, but the first sort is on '{}'",
                property, first.property
            ))
            .with_property(property.to_string()));
        }
    }
    Ok(())
}

/// Validates the offset and limit and checks them against the result shape.
pub fn resolve_window(form: &NormalForm) -> QueryResult<Window> {
    let to_u64 = |value: Option<i64>, what: &str| -> QueryResult<Option<u64>> {
        match value {
            None => Ok(None),
            Some(v) => u64::try_from(v).map(Some).map_err(|_| {
                QueryError::unsupported_by_orm(format!("{} must not be negative, got {}", what, v))
                    .with_operator(what.to_ascii_uppercase())
            }),
        }
    };

    let offset = to_u64(form.offset, "Offset")?.unwrap_or(0);
    let limit = to_u64(form.limit, "Limit")?;

    if form.count && offset > 0 {
        return Err(
            QueryError::unsupported_by_orm("COUNT cannot be combined with an offset")
                .with_operator("OFFSET"),
        );
    }
    if form.count && !form.fields.is_empty() {
        return Err(QueryError::unsupported_by_datastore(
            "COUNT cannot be combined with projected properties",
        ));
    }
    Ok(Window::new(offset, limit))
}

/// Storage properties a projection needs; `None` fetches whole entities.
///
/// Sort properties are kept so merged branches can still be ordered.
fn projection(form: &NormalForm) -> Option<Vec<String>> {
    if form.fields.is_empty() {
        return None;
    }
    let mut names: Vec<String> = Vec::new();
    let fields = form.fields.iter().filter_map(|field| match &field.source {
        FieldSource::Property { name, .. } => Some(name),
        _ => None,
    });
    for name in fields.chain(form.sorts.iter().map(|s| &s.property)) {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    Some(names)
}
