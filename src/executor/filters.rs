//! Client-side predicate evaluation
//!
//! Evaluates native filters the way the store does: a missing property never
//! matches, a multi-valued property matches if any of its values does, and
//! range comparisons only match values of the same type family.

use std::cmp::Ordering;

use crate::datastore::Entity;
use crate::planner::{FilterOperator, FilterPredicate};
use crate::value::{Key, NativeValue};

/// Evaluates filter predicates against entities
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if an entity matches all predicates
    pub fn matches(entity: &Entity, predicates: &[FilterPredicate]) -> bool {
        predicates
            .iter()
            .all(|pred| Self::matches_predicate(entity, pred))
    }

    /// Checks if an entity lies in the ancestor's entity group
    pub fn in_ancestor(entity: &Entity, ancestor: Option<&Key>) -> bool {
        ancestor.map_or(true, |a| entity.key.has_ancestor(a))
    }

    fn matches_predicate(entity: &Entity, predicate: &FilterPredicate) -> bool {
        let actual = match entity.value(&predicate.property) {
            Some(v) => v,
            None => return false,
        };

        match actual.as_ref() {
            NativeValue::List(values) => values
                .iter()
                .any(|v| Self::matches_value(v, predicate)),
            value => Self::matches_value(value, predicate),
        }
    }

    fn matches_value(actual: &NativeValue, predicate: &FilterPredicate) -> bool {
        let bound = &predicate.value;
        match predicate.operator {
            FilterOperator::Eq => actual.same_as(bound),
            FilterOperator::Ne => !actual.same_as(bound),
            FilterOperator::In => match bound {
                NativeValue::List(candidates) => candidates.iter().any(|c| actual.same_as(c)),
                single => actual.same_as(single),
            },
            FilterOperator::Lt => Self::range_match(actual, bound, |o| o == Ordering::Less),
            FilterOperator::Lte => Self::range_match(actual, bound, |o| o != Ordering::Greater),
            FilterOperator::Gt => Self::range_match(actual, bound, |o| o == Ordering::Greater),
            FilterOperator::Gte => Self::range_match(actual, bound, |o| o != Ordering::Less),
        }
    }

    fn range_match(actual: &NativeValue, bound: &NativeValue, accept: fn(Ordering) -> bool) -> bool {
        if actual.type_rank() != bound.type_rank() {
            return false;
        }
        accept(actual.compare(bound))
    }
}
