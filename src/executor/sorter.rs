//! Result ordering
//!
//! Orders entities by native sort predicates. A multi-valued property sorts
//! by its smallest value ascending and its largest value descending. Entities
//! lacking a sort property are not part of a sorted result.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::datastore::Entity;
use crate::planner::{SortDirection, SortPredicate};
use crate::value::NativeValue;

/// Sorts and compares entities
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts entities by the predicates, ties broken by key.
    pub fn sort(entities: &mut [Entity], sorts: &[SortPredicate]) {
        entities.sort_by(|a, b| Self::compare_with_key(a, b, sorts));
    }

    /// Compares by the sort predicates only.
    pub fn compare(a: &Entity, b: &Entity, sorts: &[SortPredicate]) -> Ordering {
        for sort in sorts {
            let a_val = Self::sort_value(a, sort);
            let b_val = Self::sort_value(b, sort);

            let ordering = match (a_val, b_val) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.compare(&y),
            };
            let ordering = match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// The store's full result order: the sort predicates, then the key.
    pub fn compare_with_key(a: &Entity, b: &Entity, sorts: &[SortPredicate]) -> Ordering {
        Self::compare(a, b, sorts).then_with(|| a.key.cmp(&b.key))
    }

    /// True if the entity has a value for every sorted property
    pub fn has_sort_values(entity: &Entity, sorts: &[SortPredicate]) -> bool {
        sorts.iter().all(|s| Self::sort_value(entity, s).is_some())
    }

    fn sort_value<'e>(entity: &'e Entity, sort: &SortPredicate) -> Option<Cow<'e, NativeValue>> {
        let value = entity.value(&sort.property)?;
        match value {
            Cow::Borrowed(NativeValue::List(values)) => {
                let pick = match sort.direction {
                    SortDirection::Asc => values.iter().min_by(|x, y| x.compare(y)),
                    SortDirection::Desc => values.iter().max_by(|x, y| x.compare(y)),
                };
                pick.map(Cow::Borrowed)
            }
            other => Some(other),
        }
    }
}
