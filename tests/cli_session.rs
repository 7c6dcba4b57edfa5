//! CLI Session Tests
//!
//! Tests for the file-driven session behind the CLI commands:
//! - Configuration controls store capabilities and the branch cap
//! - Requests carry their own clock for deterministic results
//! - Rejections come back as error envelopes with their category

use std::fs;
use std::path::PathBuf;

use kvquery::cli::{run_command, CliErrorCode, Command, QueryRequest, Session};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const MAPPINGS: &str = r#"{
    "entities": [
        {
            "name": "Book",
            "kind": "Book",
            "primary_key": {"field": "id", "format": "long"},
            "fields": [
                {"name": "title", "type": "string"},
                {"name": "author", "type": "string"},
                {"name": "published", "type": "date"},
                {"name": "genre", "type": "enum", "enum_type": "Genre"}
            ]
        }
    ]
}"#;

fn data() -> Value {
    json!([
        {"key": [{"kind": "Book", "id": 1}], "properties": {
            "title": "xxxx", "author": "auth1", "genre": "FICTION",
            "published": {"$date": "2001-01-01T00:00:00Z"}}},
        {"key": [{"kind": "Book", "id": 2}], "properties": {
            "title": "y", "author": "auth2", "genre": "SCIENCE",
            "published": {"$date": "2010-01-01T00:00:00Z"}}},
        {"key": [{"kind": "Book", "id": 3}], "properties": {
            "title": "yb", "author": "auth3", "genre": "FICTION",
            "published": {"$date": "2020-01-01T00:00:00Z"}}},
        {"key": [{"kind": "Book", "id": 4}], "properties": {
            "title": "z", "author": "auth1", "genre": "SCIENCE",
            "published": {"$date": "2030-01-01T00:00:00Z"}}}
    ])
}

fn create_config(temp_dir: &TempDir, settings: Value) -> PathBuf {
    let mappings_path = temp_dir.path().join("mappings.json");
    let data_path = temp_dir.path().join("data.json");
    fs::write(&mappings_path, MAPPINGS).unwrap();
    fs::write(&data_path, data().to_string()).unwrap();

    let mut config = json!({
        "mappings_path": mappings_path.to_string_lossy(),
        "data_path": data_path.to_string_lossy(),
        "log_level": "error"
    });
    if let (Some(target), Some(settings)) = (config.as_object_mut(), settings.as_object()) {
        for (k, v) in settings {
            target.insert(k.clone(), v.clone());
        }
    }

    let config_path = temp_dir.path().join("kvquery.json");
    fs::write(&config_path, config.to_string()).unwrap();
    config_path
}

fn open(temp_dir: &TempDir, settings: Value) -> Session {
    Session::open(&create_config(temp_dir, settings)).unwrap()
}

fn request(value: Value) -> QueryRequest {
    QueryRequest::from_json(value).unwrap()
}

fn author_in(authors: &[&str]) -> Value {
    let values: Vec<Value> = authors.iter().map(|a| json!({"literal": a})).collect();
    json!({"in": {"operand": {"property": "author"}, "values": values}})
}

// =============================================================================
// Command Tests
// =============================================================================

/// check-config succeeds on a complete configuration.
#[test]
fn test_check_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_config(&temp_dir, json!({}));

    assert!(run_command(Command::CheckConfig { config }).is_ok());
}

/// Commands fail before reading stdin when the configuration is missing.
#[test]
fn test_command_with_missing_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("absent.json");

    let err = run_command(Command::Query { config }).unwrap_err();
    assert_eq!(err.code(), CliErrorCode::ConfigError);
}

/// Unreadable data files are reported as data errors.
#[test]
fn test_bad_data_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_config(&temp_dir, json!({}));
    fs::write(temp_dir.path().join("data.json"), r#"{"not": "an array"}"#).unwrap();

    let err = Session::open(&config).err().unwrap();
    assert_eq!(err.code(), CliErrorCode::DataError);
}

// =============================================================================
// Capability Configuration Tests
// =============================================================================

/// With native IN, a disjunction runs as one query.
#[test]
fn test_native_in_runs_single_query() {
    let temp_dir = TempDir::new().unwrap();
    let session = open(&temp_dir, json!({"native_in": true}));

    let response = session.query(&request(json!({
        "query": {"candidate": "Book", "filter": author_in(&["auth1", "auth3"])}
    })));

    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["strategy"], "SCAN");
    assert_eq!(response["data"]["count"], 3);
    assert_eq!(session.metrics().snapshot().branches_executed, 1);
}

/// The configured branch cap rejects wider expansions.
#[test]
fn test_configured_branch_cap() {
    let temp_dir = TempDir::new().unwrap();
    let session = open(&temp_dir, json!({"max_branches": 2}));

    let response = session.query(&request(json!({
        "query": {"candidate": "Book", "filter": author_in(&["auth1", "auth2", "auth3"])}
    })));

    assert_eq!(response["status"], "error");
    assert_eq!(response["code"], "KVQ_QUERY_TOO_COMPLEX");
    assert_eq!(response["category"], "datastore");
    assert_eq!(session.metrics().snapshot().queries_rejected, 1);
}

/// Without native not-equal, `<>` is a datastore rejection.
#[test]
fn test_not_equal_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let session = open(&temp_dir, json!({"native_not_equal": false}));

    let response = session.query(&request(json!({
        "query": {
            "candidate": "Book",
            "filter": {"binary": {"op": "<>", "left": {"property": "title"}, "right": {"literal": "y"}}}
        }
    })));

    assert_eq!(response["code"], "KVQ_UNSUPPORTED_BY_DATASTORE");
    assert_eq!(response["operator"], "<>");
    assert_eq!(response["property"], "title");
}

// =============================================================================
// Request Tests
// =============================================================================

/// The request clock fixes CURRENT_TIMESTAMP.
#[test]
fn test_request_clock() {
    let temp_dir = TempDir::new().unwrap();
    let session = open(&temp_dir, json!({}));

    let response = session.query(&request(json!({
        "query": {
            "candidate": "Book",
            "result": [{"property": "title"}],
            "filter": {"binary": {
                "op": "<",
                "left": {"property": "published"},
                "right": {"function": {"name": "CURRENT_TIMESTAMP"}}
            }}
        },
        "now": "2015-06-01T00:00:00Z"
    })));

    assert_eq!(response["data"]["rows"], json!([["xxxx"], ["y"]]));
}

/// LIKE with a trailing wildcard, projected and counted.
#[test]
fn test_like_projection_and_count() {
    let temp_dir = TempDir::new().unwrap();
    let session = open(&temp_dir, json!({}));
    let like = json!({"like": {"operand": {"property": "title"}, "pattern": {"literal": "y%"}}});

    let projected = session.query(&request(json!({
        "query": {"candidate": "Book", "result": [{"property": "title"}], "filter": like.clone()}
    })));
    assert_eq!(projected["data"]["rows"], json!([["y"], ["yb"]]));

    let counted = session.query(&request(json!({
        "query": {"candidate": "Book", "result": [{"function": {"name": "COUNT"}}], "filter": like}
    })));
    assert_eq!(counted["data"]["rows"], json!([2]));
}

/// Enum parameters arrive as tagged JSON.
#[test]
fn test_enum_parameter() {
    let temp_dir = TempDir::new().unwrap();
    let session = open(&temp_dir, json!({}));

    let response = session.query(&request(json!({
        "query": {
            "candidate": "Book",
            "result": [{"property": "id"}, {"property": "genre"}],
            "filter": {"binary": {"op": "=", "left": {"property": "genre"}, "right": {"parameter": "g"}}},
            "ordering": [{"expr": {"property": "title"}, "direction": "desc"}]
        },
        "params": {"named": {"g": {"$enum": {"type": "Genre", "name": "FICTION"}}}}
    })));

    let fiction = json!({"$enum": {"type": "Genre", "name": "FICTION"}});
    assert_eq!(
        response["data"]["rows"],
        json!([[3, fiction.clone()], [1, fiction]])
    );
}

/// Explaining the same request twice gives the same plan.
#[test]
fn test_explain_is_stable() {
    let temp_dir = TempDir::new().unwrap();
    let session = open(&temp_dir, json!({}));
    let req = request(json!({
        "query": {
            "candidate": "Book",
            "filter": author_in(&["auth1", "auth2"]),
            "ordering": [{"expr": {"property": "title"}}],
            "offset": 1,
            "limit": 1
        }
    }));

    let first = session.explain(&req).unwrap();
    let second = session.explain(&req).unwrap();
    assert_eq!(first, second);
    assert_eq!(first["strategy"], "MULTI_QUERY");
    assert_eq!(first["window"], "OFFSET 1 LIMIT 1");
    assert_eq!(first["queries"].as_array().map(Vec::len), Some(2));
}
