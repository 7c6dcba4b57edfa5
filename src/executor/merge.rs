//! Multi-query merging
//!
//! Merges the cursors of several native queries into one stream. Sorted
//! branches are merged by the store's result order (sort predicates, then
//! key); unsorted branches are concatenated in branch order. An entity
//! returned by more than one branch is yielded once. The first store error
//! is surfaced and ends the stream.

use std::collections::HashSet;
use std::iter::Fuse;
use std::sync::Arc;

use super::sorter::ResultSorter;
use crate::datastore::{Entity, RecordCursor, StoreError};
use crate::observability::MetricsRegistry;
use crate::planner::{SortPredicate, Window};
use crate::value::Key;

/// Counters for one merged stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub records_merged: u64,
    pub duplicates_dropped: u64,
}

/// Ordered, de-duplicated union of several cursors
pub struct MergedCursor<'a> {
    cursors: Vec<Fuse<RecordCursor<'a>>>,
    /// Pulled but not yet yielded item of each cursor
    heads: Vec<Option<Result<Entity, StoreError>>>,
    sorts: Vec<SortPredicate>,
    sorted: bool,
    /// Next cursor to drain when concatenating
    current: usize,
    seen: HashSet<Key>,
    finished: bool,
    stats: MergeStats,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<'a> MergedCursor<'a> {
    /// Merges by `sorts` if non-empty, otherwise concatenates.
    pub fn new(cursors: Vec<RecordCursor<'a>>, sorts: Vec<SortPredicate>) -> Self {
        Self {
            heads: cursors.iter().map(|_| None).collect(),
            cursors: cursors.into_iter().map(Iterator::fuse).collect(),
            sorted: !sorts.is_empty(),
            sorts,
            current: 0,
            seen: HashSet::new(),
            finished: false,
            stats: MergeStats::default(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<MetricsRegistry>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    fn next_sorted(&mut self) -> Option<Result<Entity, StoreError>> {
        for (cursor, head) in self.cursors.iter_mut().zip(self.heads.iter_mut()) {
            if head.is_none() {
                *head = cursor.next();
            }
        }

        if let Some(failed) = self.heads.iter().position(|h| matches!(h, Some(Err(_)))) {
            return self.heads[failed].take();
        }

        let mut best: Option<(usize, &Entity)> = None;
        for (i, head) in self.heads.iter().enumerate() {
            if let Some(Ok(candidate)) = head {
                let better = best.map_or(true, |(_, current)| {
                    ResultSorter::compare_with_key(candidate, current, &self.sorts).is_lt()
                });
                if better {
                    best = Some((i, candidate));
                }
            }
        }

        let (index, _) = best?;
        self.heads[index].take()
    }

    fn next_concatenated(&mut self) -> Option<Result<Entity, StoreError>> {
        while self.current < self.cursors.len() {
            if let Some(item) = self.cursors[self.current].next() {
                return Some(item);
            }
            self.current += 1;
        }
        None
    }
}

impl Iterator for MergedCursor<'_> {
    type Item = Result<Entity, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let item = if self.sorted {
                self.next_sorted()
            } else {
                self.next_concatenated()
            };

            match item {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                Some(Ok(entity)) => {
                    if !self.seen.insert(entity.key.clone()) {
                        self.stats.duplicates_dropped += 1;
                        if let Some(metrics) = &self.metrics {
                            metrics.add_duplicates_dropped(1);
                        }
                        continue;
                    }
                    self.stats.records_merged += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.add_records_merged(1);
                    }
                    return Some(Ok(entity));
                }
            }
        }
    }
}

/// Applies an offset and limit to a fallible stream.
///
/// Only successful items count towards the window; errors pass through.
pub struct WindowedCursor<I> {
    inner: I,
    skip: u64,
    remaining: Option<u64>,
}

impl<I> WindowedCursor<I> {
    pub fn new(inner: I, window: Window) -> Self {
        Self {
            inner,
            skip: window.offset,
            remaining: window.limit,
        }
    }
}

impl<I, T, E> Iterator for WindowedCursor<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }

        loop {
            match self.inner.next()? {
                Ok(_) if self.skip > 0 => self.skip -= 1,
                Ok(item) => {
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(item));
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
