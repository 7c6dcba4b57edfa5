//! Disjunction expansion
//!
//! A store without native IN runs one query per combination of IN values.
//! Filters stay in their original order inside every branch so that equal
//! inputs always expand into identical branches.

use super::errors::{QueryError, QueryResult};
use super::native::{FilterOperator, FilterPredicate};
use crate::datastore::StoreCapabilities;

/// Conjunctive filter lists, one per native query
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteBranchSet {
    branches: Vec<Vec<FilterPredicate>>,
}

impl RewriteBranchSet {
    /// Expands IN filters into branches.
    ///
    /// The branch count is checked against `max_branches` before any branch
    /// is built.
    pub fn expand(
        filters: &[FilterPredicate],
        capabilities: &StoreCapabilities,
        max_branches: usize,
    ) -> QueryResult<Self> {
        if capabilities.native_in {
            return Ok(Self {
                branches: vec![filters.to_vec()],
            });
        }

        let total = filters
            .iter()
            .filter(|f| f.operator == FilterOperator::In)
            .try_fold(1usize, |acc, f| acc.checked_mul(f.candidates().len().max(1)))
            .unwrap_or(usize::MAX);
        if total > max_branches {
            return Err(QueryError::too_complex(total, max_branches));
        }

        let mut branches: Vec<Vec<FilterPredicate>> = vec![Vec::with_capacity(filters.len())];
        for filter in filters {
            if filter.operator != FilterOperator::In {
                for branch in &mut branches {
                    branch.push(filter.clone());
                }
                continue;
            }

            let candidates = filter.candidates();
            let mut expanded = Vec::with_capacity(branches.len() * candidates.len());
            for branch in &branches {
                for candidate in &candidates {
                    let mut next = branch.clone();
                    next.push(FilterPredicate::new(
                        filter.property.clone(),
                        FilterOperator::Eq,
                        candidate.clone(),
                    ));
                    expanded.push(next);
                }
            }
            branches = expanded;
        }

        Ok(Self { branches })
    }

    /// Native queries this set will run
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn branches(&self) -> &[Vec<FilterPredicate>] {
        &self.branches
    }

    pub fn into_branches(self) -> Vec<Vec<FilterPredicate>> {
        self.branches
    }
}
