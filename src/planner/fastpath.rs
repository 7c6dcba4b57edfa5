//! Key-lookup fast path
//!
//! A query pinned to explicit keys by `__key__` equality or IN becomes a
//! batch get. Every other filter, the sort order and the window are applied
//! to the fetched entities.

use super::classifier::NormalForm;
use super::native::{FilterOperator, FilterPredicate, Window};
use super::plan::{BatchGetPlan, OutputShape};
use crate::mapping::KEY_PROPERTY;
use crate::value::{Key, NativeValue};

fn is_key_lookup(filter: &FilterPredicate) -> bool {
    filter.property == KEY_PROPERTY
        && matches!(filter.operator, FilterOperator::Eq | FilterOperator::In)
}

fn candidate_keys(filter: &FilterPredicate) -> Vec<Key> {
    filter
        .candidates()
        .into_iter()
        .filter_map(|v| match v {
            NativeValue::Key(key) => Some(key),
            _ => None,
        })
        .collect()
}

/// Builds a batch-get plan if the query is pinned to explicit keys.
///
/// Several key filters intersect. Keys of another kind, or outside the
/// ancestor, can never match and are dropped.
pub fn try_fast_path(form: &NormalForm, window: Window, output: OutputShape) -> Option<BatchGetPlan> {
    let (lookups, residual): (Vec<&FilterPredicate>, Vec<&FilterPredicate>) =
        form.filters.iter().partition(|f| is_key_lookup(f));

    let (first, rest) = lookups.split_first()?;

    let mut keys: Vec<Key> = Vec::new();
    for key in candidate_keys(first) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    for filter in rest {
        let allowed = candidate_keys(filter);
        keys.retain(|k| allowed.contains(k));
    }

    keys.retain(|k| {
        k.kind() == form.kind && form.ancestor.as_ref().map_or(true, |a| k.has_ancestor(a))
    });

    Some(BatchGetPlan {
        kind: form.kind.clone(),
        keys,
        ancestor: form.ancestor.clone(),
        residual: residual.into_iter().cloned().collect(),
        sorts: form.sorts.clone(),
        window,
        output,
    })
}
