//! Query executor
//!
//! Runs query plans against a [`Datastore`], producing a lazy row stream.
//!
//! Execution flow:
//! 1. Open one cursor per native query, or issue a single batch get
//! 2. Merge and de-duplicate branch cursors in result order
//! 3. Apply the client-side window
//! 4. Shape entities into rows (entities, projected fields or a count)
//!
//! Batch gets filter, sort and window in memory, since the store gives no
//! order for them.

use std::sync::Arc;

use uuid::Uuid;

use crate::datastore::{Datastore, Entity, RecordCursor};
use crate::observability::{log_event, Event, MetricsRegistry, ObservationScope};
use crate::planner::{BatchGetPlan, QueryError, QueryPlan, QueryResult, ScanPlan};

use super::filters::PredicateFilter;
use super::merge::{MergedCursor, WindowedCursor};
use super::result::{shape_rows, EntityStream, QueryResults};
use super::sorter::ResultSorter;

/// Executes query plans against a store
pub struct QueryExecutor<'a, D: Datastore + ?Sized> {
    store: &'a D,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<'a, D: Datastore + ?Sized> QueryExecutor<'a, D> {
    pub fn new(store: &'a D) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Executes a plan.
    ///
    /// Errors opening a query are returned here; errors while iterating end
    /// the returned stream.
    pub fn execute(&self, plan: &QueryPlan) -> QueryResult<QueryResults<'a>> {
        let query_id = Uuid::new_v4().to_string();
        let scope = ObservationScope::with_fields(
            "QUERY",
            &[
                ("query_id", query_id.as_str()),
                ("strategy", plan.strategy()),
            ],
        );

        let entities = match plan {
            QueryPlan::Empty(_) => Ok(Box::new(std::iter::empty()) as EntityStream<'a>),
            QueryPlan::BatchGet(batch) => self.batch_get(batch),
            QueryPlan::Scan(scan) => self.scan(scan, &query_id),
        };

        match entities {
            Ok(entities) => Ok(QueryResults::new(
                shape_rows(entities, plan.output()),
                scope,
                self.metrics.clone(),
            )),
            Err(err) => {
                log_event(
                    Event::QueryStoreFailure,
                    &[("code", err.code().code()), ("query_id", query_id.as_str())],
                );
                scope.fail(err.message());
                if let Some(metrics) = &self.metrics {
                    metrics.increment_queries_failed();
                }
                Err(err)
            }
        }
    }

    fn batch_get(&self, plan: &BatchGetPlan) -> QueryResult<EntityStream<'a>> {
        let fetched = if plan.keys.is_empty() {
            Vec::new()
        } else {
            if let Some(metrics) = &self.metrics {
                metrics.increment_batch_gets();
            }
            self.store
                .batch_get(&plan.keys)
                .map_err(QueryError::from_store)?
        };

        let mut entities: Vec<Entity> = fetched
            .into_iter()
            .filter(|e| e.kind() == plan.kind)
            .filter(|e| PredicateFilter::in_ancestor(e, plan.ancestor.as_ref()))
            .filter(|e| PredicateFilter::matches(e, &plan.residual))
            .filter(|e| ResultSorter::has_sort_values(e, &plan.sorts))
            .collect();

        if !plan.sorts.is_empty() {
            ResultSorter::sort(&mut entities, &plan.sorts);
        }

        let offset = usize::try_from(plan.window.offset).unwrap_or(usize::MAX);
        let limit = plan
            .window
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(Box::new(
            entities
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(Ok::<Entity, QueryError>),
        ))
    }

    fn scan(&self, plan: &ScanPlan, query_id: &str) -> QueryResult<EntityStream<'a>> {
        let store: &'a D = self.store;
        let mut cursors: Vec<RecordCursor<'a>> = Vec::with_capacity(plan.queries.len());

        for (index, query) in plan.queries.iter().enumerate() {
            let cursor = store.run_query(query).map_err(QueryError::from_store)?;
            let branch = index.to_string();
            let fingerprint = query.fingerprint();
            log_event(
                Event::BranchExecuted,
                &[
                    ("branch", branch.as_str()),
                    ("fingerprint", fingerprint.as_str()),
                    ("query_id", query_id),
                ],
            );
            cursors.push(cursor);
        }

        if let Some(metrics) = &self.metrics {
            metrics.add_branches_executed(cursors.len() as u64);
        }

        let merged =
            MergedCursor::new(cursors, plan.sorts.clone()).with_metrics(self.metrics.clone());
        let windowed = WindowedCursor::new(merged, plan.window);
        Ok(Box::new(windowed.map(|r| r.map_err(QueryError::from_store))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{Fault, InMemoryDatastore, StoreError};
    use crate::executor::ResultRow;
    use crate::planner::{
        FilterOperator, FilterPredicate, NativeQuery, OutputShape, QueryErrorCode, SortPredicate,
        Window,
    };
    use crate::value::Key;

    fn book(id: i64, isbn: i64, author: &str) -> Entity {
        Entity::new(Key::with_id("Book", id))
            .with_property("isbn", isbn)
            .with_property("author", author)
    }

    fn store() -> InMemoryDatastore {
        InMemoryDatastore::new()
            .with_entity(book(1, 1, "auth1"))
            .with_entity(book(2, 2, "auth2"))
            .with_entity(book(3, 3, "auth3"))
            .with_entity(book(4, 4, "auth1"))
    }

    fn author_query(author: &str, window: Window) -> NativeQuery {
        let mut query = NativeQuery::new("Book");
        query.filters.push(FilterPredicate::new(
            "author",
            FilterOperator::Eq,
            author.into(),
        ));
        query.sorts.push(SortPredicate::desc("isbn"));
        query.offset = window.offset;
        query.limit = window.limit;
        query
    }

    fn ids(rows: Vec<ResultRow>) -> Vec<Key> {
        rows.into_iter()
            .map(|row| match row {
                ResultRow::Entity(e) => e.key,
                other => panic!("unexpected row {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_multi_query_merge_and_window() {
        let store = store();
        let window = Window::new(1, Some(2));
        let plan = QueryPlan::Scan(ScanPlan {
            queries: vec![
                author_query("auth1", window.widened()),
                author_query("auth3", window.widened()),
            ],
            sorts: vec![SortPredicate::desc("isbn")],
            window,
            output: OutputShape::Entities,
        });

        let metrics = Arc::new(MetricsRegistry::new());
        let executor = QueryExecutor::new(&store).with_metrics(metrics.clone());
        let rows = executor.execute(&plan).unwrap().fetch_all().unwrap();

        assert_eq!(ids(rows), vec![Key::with_id("Book", 3), Key::with_id("Book", 1)]);
        assert_eq!(metrics.snapshot().branches_executed, 2);
        assert_eq!(metrics.snapshot().queries_executed, 1);
    }

    #[test]
    fn test_batch_get_skips_missing_and_filters() {
        let store = store();
        let plan = QueryPlan::BatchGet(BatchGetPlan {
            kind: "Book".into(),
            keys: vec![
                Key::with_id("Book", 4),
                Key::with_id("Book", 1),
                Key::with_id("Book", 99),
            ],
            ancestor: None,
            residual: vec![FilterPredicate::new(
                "author",
                FilterOperator::Eq,
                "auth1".into(),
            )],
            sorts: vec![SortPredicate::asc("isbn")],
            window: Window::unbounded(),
            output: OutputShape::Entities,
        });

        let rows = QueryExecutor::new(&store)
            .execute(&plan)
            .unwrap()
            .fetch_all()
            .unwrap();
        assert_eq!(ids(rows), vec![Key::with_id("Book", 1), Key::with_id("Book", 4)]);
    }

    #[test]
    fn test_empty_plan_counts_zero() {
        let store = store();
        let rows = QueryExecutor::new(&store)
            .execute(&QueryPlan::Empty(OutputShape::Count))
            .unwrap()
            .fetch_all()
            .unwrap();
        assert_eq!(rows, vec![ResultRow::Count(0)]);
        assert!(store.executed_queries().is_empty());
    }

    #[test]
    fn test_open_failure_is_store_failure() {
        let store = store().with_fault(Fault::OnOpen {
            call: 1,
            error: StoreError::Timeout("deadline".into()),
        });
        let plan = QueryPlan::Scan(ScanPlan {
            queries: vec![
                author_query("auth1", Window::unbounded()),
                author_query("auth2", Window::unbounded()),
            ],
            sorts: vec![SortPredicate::desc("isbn")],
            window: Window::unbounded(),
            output: OutputShape::Entities,
        });

        let err = QueryExecutor::new(&store).execute(&plan).err().unwrap();
        assert_eq!(err.code(), QueryErrorCode::StoreFailure);
    }

    #[test]
    fn test_batch_get_failure() {
        let store = store().with_fault(Fault::OnBatchGet(StoreError::Failure("down".into())));
        let plan = QueryPlan::BatchGet(BatchGetPlan {
            kind: "Book".into(),
            keys: vec![Key::with_id("Book", 1)],
            ancestor: None,
            residual: Vec::new(),
            sorts: Vec::new(),
            window: Window::unbounded(),
            output: OutputShape::Entities,
        });

        assert!(QueryExecutor::new(&store).execute(&plan).is_err());
    }
}
