//! Multi-Query Execution Tests
//!
//! End-to-end tests from query tree to result rows:
//! - Branch results are merged, de-duplicated and windowed globally
//! - Key lookups skip missing keys
//! - Store failures surface as errors, never as partial success

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use kvquery::datastore::{Datastore, Entity, Fault, InMemoryDatastore, StoreCapabilities, StoreError};
use kvquery::executor::{QueryExecutor, ResultRow};
use kvquery::mapping::{EntityMeta, FieldMeta, FieldType, MappingLoader};
use kvquery::observability::MetricsRegistry;
use kvquery::planner::{
    Expr, Parameters, QueryErrorCode, QueryPlan, QueryPlanner, QueryResult, QueryTree,
    SortDirection,
};
use kvquery::value::{FixedClock, Key, KeyId, NativeValue, ObjectRef, QueryValue};

// =============================================================================
// Helper Functions
// =============================================================================

fn registry() -> MappingLoader {
    let mut loader = MappingLoader::new();
    loader
        .register(
            EntityMeta::new("Book", "Book", "id")
                .with_field(FieldMeta::new("title", FieldType::String))
                .with_field(FieldMeta::new("author", FieldType::String))
                .with_field(FieldMeta::new("isbn", FieldType::String))
                .with_field(FieldMeta::new("pages", FieldType::Int))
                .with_field(FieldMeta::new(
                    "chapter",
                    FieldType::ChildRelation {
                        kind: "Chapter".into(),
                    },
                )),
        )
        .unwrap();
    loader
}

fn book(name: &str, title: &str, author: &str, isbn: &str, pages: i64) -> Entity {
    Entity::new(Key::with_name("Book", name))
        .with_property("title", title)
        .with_property("author", author)
        .with_property("isbn", isbn)
        .with_property("pages", pages)
}

fn library() -> InMemoryDatastore {
    InMemoryDatastore::new()
        .with_entity(book("keyA", "Alpha", "auth1", "isbn1", 100))
        .with_entity(book("keyB", "Beta", "auth2", "isbn2", 200))
        .with_entity(book("keyD", "Delta", "auth3", "isbn3", 300))
        .with_entity(book("keyE", "Epsilon", "auth1", "isbn4", 400))
}

fn plan_for(store: &InMemoryDatastore, tree: &QueryTree, params: &Parameters) -> QueryResult<QueryPlan> {
    let registry = registry();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    QueryPlanner::new(&registry, store.capabilities()).plan(tree, params, &clock)
}

fn run(store: &InMemoryDatastore, tree: &QueryTree, params: &Parameters) -> QueryResult<Vec<ResultRow>> {
    let plan = plan_for(store, tree, params)?;
    QueryExecutor::new(store).execute(&plan)?.fetch_all()
}

fn names(rows: &[ResultRow]) -> Vec<String> {
    rows.iter()
        .map(|row| match row {
            ResultRow::Entity(e) => e.key.name().unwrap_or_default().to_string(),
            other => panic!("expected an entity row, got {:?}", other),
        })
        .collect()
}

// =============================================================================
// Multi-Query Tests
// =============================================================================

/// Two IN lists run as four branches and keep only the matching pair.
#[test]
fn test_in_times_in_returns_intersection() {
    let store = library();
    let tree = QueryTree::new("Book").filter(Expr::and(vec![
        Expr::prop("author").in_list(vec![Expr::param("p1"), Expr::param("p2")]),
        Expr::prop("isbn").in_list(vec![Expr::param("p3"), Expr::param("p4")]),
    ]));
    let params = Parameters::new()
        .with_named("p1", "auth1")
        .with_named("p2", "auth3")
        .with_named("p3", "isbn3")
        .with_named("p4", "isbn2");

    let rows = run(&store, &tree, &params).unwrap();

    assert_eq!(names(&rows), vec!["keyD"]);
    assert_eq!(store.executed_queries().len(), 4);
}

/// The window applies to the merged stream, after duplicates are dropped.
#[test]
fn test_window_applies_after_merge() {
    let store = library().with_entity(
        Entity::new(Key::with_name("Book", "keyF"))
            .with_property("title", "Phi")
            .with_property(
                "author",
                NativeValue::List(vec!["auth1".into(), "auth3".into()]),
            )
            .with_property("isbn", "isbn5")
            .with_property("pages", 500i64),
    );
    let tree = QueryTree::new("Book")
        .filter(Expr::prop("author").in_list(vec![Expr::lit("auth1"), Expr::lit("auth3")]))
        .order_by(Expr::prop("pages"), SortDirection::Desc)
        .offset(1)
        .limit(2);

    let plan = plan_for(&store, &tree, &Parameters::new()).unwrap();
    let metrics = Arc::new(MetricsRegistry::new());
    let rows = QueryExecutor::new(&store)
        .with_metrics(metrics.clone())
        .execute(&plan)
        .unwrap()
        .fetch_all()
        .unwrap();

    // Merged order is keyF, keyE, keyD, keyA with keyF seen in both branches.
    assert_eq!(names(&rows), vec!["keyE", "keyD"]);
    for query in store.executed_queries() {
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, Some(3));
    }
    assert_eq!(metrics.snapshot().duplicates_dropped, 1);
}

/// An OR of equalities returns every matching entity exactly once.
#[test]
fn test_or_of_equalities() {
    let store = library();
    let tree = QueryTree::new("Book")
        .filter(Expr::or(vec![
            Expr::prop("author").eq(Expr::lit("auth1")),
            Expr::prop("author").eq(Expr::lit("auth2")),
        ]))
        .order_by(Expr::prop("title"), SortDirection::Asc);

    let rows = run(&store, &tree, &Parameters::new()).unwrap();
    assert_eq!(names(&rows), vec!["keyA", "keyB", "keyE"]);
}

/// A trailing-wildcard LIKE returns the prefix matches in ascending order.
#[test]
fn test_like_prefix_scan() {
    let store = ["xxxx", "y", "yb", "z"]
        .iter()
        .enumerate()
        .fold(InMemoryDatastore::new(), |store, (i, title)| {
            store.with_entity(book(&format!("k{}", i), title, "auth", "isbn", 1))
        });
    let tree = QueryTree::new("Book").filter(Expr::prop("title").like(Expr::lit("y%")));

    let rows = run(&store, &tree, &Parameters::new()).unwrap();
    let titles: Vec<NativeValue> = rows
        .iter()
        .map(|row| match row {
            ResultRow::Entity(e) => e.properties["title"].clone(),
            other => panic!("unexpected row {:?}", other),
        })
        .collect();
    assert_eq!(titles, vec![NativeValue::from("y"), NativeValue::from("yb")]);
}

// =============================================================================
// Key Lookup Tests
// =============================================================================

/// Missing keys are skipped, not errors.
#[test]
fn test_batch_get_skips_missing_key() {
    let store = library();
    let tree = QueryTree::new("Book").filter(Expr::prop("id").in_list(vec![
        Expr::lit("keyA"),
        Expr::lit("keyB"),
        Expr::lit("keyC"),
    ]));

    let rows = run(&store, &tree, &Parameters::new()).unwrap();

    assert_eq!(names(&rows), vec!["keyA", "keyB"]);
    assert!(store.executed_queries().is_empty());
    assert_eq!(store.batch_gets().len(), 1);
}

/// A child-relation equality fetches the child's parent by key.
#[test]
fn test_child_relation_lookup() {
    let store = library();
    let chapter = Key::with_name("Book", "keyB").child("Chapter", KeyId::Id(7));
    let tree = QueryTree::new("Book").filter(Expr::prop("chapter").eq(Expr::param("c")));
    let params = Parameters::new().with_named("c", ObjectRef::new("Chapter", Some(chapter)));

    let rows = run(&store, &tree, &params).unwrap();
    assert_eq!(names(&rows), vec!["keyB"]);
    assert_eq!(store.batch_gets(), vec![vec![Key::with_name("Book", "keyB")]]);
}

// =============================================================================
// Result Shape Tests
// =============================================================================

/// COUNT returns a single row.
#[test]
fn test_count() {
    let store = library();
    let tree = QueryTree::new("Book")
        .select(Expr::function("COUNT", Vec::new()))
        .filter(Expr::prop("author").in_list(vec![Expr::lit("auth1"), Expr::lit("auth3")]));

    let rows = run(&store, &tree, &Parameters::new()).unwrap();
    assert_eq!(rows, vec![ResultRow::Count(3)]);
}

/// Projections return the selected values in order.
#[test]
fn test_projection() {
    let store = library();
    let tree = QueryTree::new("Book")
        .with_alias("b")
        .select(Expr::prop("b.title"))
        .select(Expr::prop("b.id"))
        .filter(Expr::prop("b.author").eq(Expr::lit("auth1")))
        .order_by(Expr::prop("b.pages"), SortDirection::Desc);

    let rows = run(&store, &tree, &Parameters::new()).unwrap();
    assert_eq!(
        rows,
        vec![
            ResultRow::Fields(vec![
                QueryValue::from("Epsilon"),
                QueryValue::Key(Key::with_name("Book", "keyE")),
            ]),
            ResultRow::Fields(vec![
                QueryValue::from("Alpha"),
                QueryValue::Key(Key::with_name("Book", "keyA")),
            ]),
        ]
    );
}

/// A single-result query returns its one match.
#[test]
fn test_single_result() {
    let store = library();
    let tree = QueryTree::new("Book").filter(Expr::prop("title").eq(Expr::param("p")));
    let params = Parameters::new().with_named("p", "Beta");

    let plan = plan_for(&store, &tree, &params).unwrap();
    let row = QueryExecutor::new(&store).execute(&plan).unwrap().single().unwrap();
    assert_eq!(names(&[row]), vec!["keyB"]);
}

/// No match is a no-result error.
#[test]
fn test_single_result_none() {
    let store = library();
    let tree = QueryTree::new("Book").filter(Expr::prop("title").eq(Expr::param("p")));
    let params = Parameters::new().with_named("p", "not Beta");

    let plan = plan_for(&store, &tree, &params).unwrap();
    let err = QueryExecutor::new(&store).execute(&plan).unwrap().single().unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::NoResult);
}

/// Two matches are a non-unique error.
#[test]
fn test_single_result_many() {
    let store = library().with_entity(book("keyB2", "Beta", "auth2", "isbn2", 200));
    let tree = QueryTree::new("Book").filter(Expr::prop("title").eq(Expr::param("p")));
    let params = Parameters::new().with_named("p", "Beta");

    let plan = plan_for(&store, &tree, &params).unwrap();
    let err = QueryExecutor::new(&store).execute(&plan).unwrap().single().unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::NonUniqueResult);
    assert_eq!(err.code().code(), "KVQ_NON_UNIQUE_RESULT");
}

// =============================================================================
// Failure Tests
// =============================================================================

/// A failure part way through a branch fails the whole query.
#[test]
fn test_mid_stream_failure() {
    let store = library().with_fault(Fault::MidStream {
        call: 1,
        after: 0,
        error: StoreError::Timeout("deadline exceeded".into()),
    });
    let tree = QueryTree::new("Book")
        .filter(Expr::prop("author").in_list(vec![Expr::lit("auth1"), Expr::lit("auth3")]));

    let err = run(&store, &tree, &Parameters::new()).unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::StoreFailure);
    assert_eq!(err.category(), "store");
}

/// Rows already yielded stay yielded; the error ends the stream.
#[test]
fn test_stream_stops_after_error() {
    let store = library().with_fault(Fault::MidStream {
        call: 0,
        after: 1,
        error: StoreError::Failure("node lost".into()),
    });
    let tree = QueryTree::new("Book")
        .filter(Expr::prop("author").eq(Expr::lit("auth1")))
        .order_by(Expr::prop("pages"), SortDirection::Asc);

    let plan = plan_for(&store, &tree, &Parameters::new()).unwrap();
    let results: Vec<_> = QueryExecutor::new(&store).execute(&plan).unwrap().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

/// A query the store refuses maps to a bad request, not a store failure.
#[test]
fn test_store_rejection_is_bad_request() {
    let store = library();
    let registry = registry();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    let tree = QueryTree::new("Book")
        .filter(Expr::prop("author").in_list(vec![Expr::lit("auth1"), Expr::lit("auth3")]));

    // Planned for a store with native IN, run against one without.
    let plan = QueryPlanner::new(
        &registry,
        StoreCapabilities {
            native_not_equal: true,
            native_in: true,
        },
    )
    .plan(&tree, &Parameters::new(), &clock)
    .unwrap();

    let err = QueryExecutor::new(&store).execute(&plan).err().unwrap();
    assert_eq!(err.code(), QueryErrorCode::BadRequest);
    assert_eq!(err.code().code(), "KVQ_BAD_REQUEST");
}
