//! CLI Batch Tests
//!
//! End-to-end tests for the configuration file and request processing:
//! - Configuration loads and builds the index catalog
//! - Each request line gets exactly one response line
//! - Failed requests do not stop the batch

use std::fs;
use std::io::Cursor;

use bindsl::cli::{batch_requests, explain_requests, CliErrorCode, Config};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_config(temp_dir: &TempDir) -> std::path::PathBuf {
    let path = temp_dir.path().join("bindsl.json");
    let config = json!({
        "namespace": "test",
        "log_level": "warn",
        "indexes": [
            { "bin": "intBin1", "name": "idx1", "index_type": "NUMERIC", "cardinality_hint": 0 },
            { "bin": "intBin2", "name": "idx2", "index_type": "NUMERIC", "cardinality_hint": 1 },
            { "bin": "name", "index_type": "STRING" }
        ]
    });
    fs::write(&path, config.to_string()).unwrap();
    path
}

fn responses(out: Vec<u8>) -> Vec<Value> {
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// =============================================================================
// Batch
// =============================================================================

/// Mixed good and bad requests each get one response, in order.
#[test]
fn test_batch_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load(&write_config(&temp_dir)).unwrap();
    let indexes = config.build_indexes().unwrap();

    let input = [
        json!({ "expression": "$.intBin1 > 100 and $.intBin2 > 100" }).to_string(),
        json!({ "expression": "$.name == ?0", "values": ["bob"] }).to_string(),
        json!({ "expression": "$.a > ?0" }).to_string(),
        json!({ "expression": "$.intBin1 > 100 or $.intBin2 > 100" }).to_string(),
    ]
    .join("\n");

    let mut out = Vec::new();
    let summary =
        batch_requests(Cursor::new(input), &mut out, &config.namespace, &indexes).unwrap();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);

    let responses = responses(out);
    assert_eq!(responses.len(), 4);

    assert_eq!(
        responses[0]["data"]["filter_text"],
        "range(intBin2, 101, 9223372036854775807)"
    );
    assert_eq!(responses[0]["data"]["filter"]["index_name"], "idx2");

    assert_eq!(responses[1]["data"]["filter_text"], "equal(name, \"bob\")");
    assert_eq!(responses[1]["data"]["residual"], Value::Null);

    assert_eq!(responses[2]["status"], "error");
    assert_eq!(responses[2]["code"], "DSL_UNRESOLVED_REFERENCE");

    assert_eq!(responses[3]["data"]["filter"], Value::Null);
}

/// Explain text and JSON are returned together.
#[test]
fn test_explain_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load(&write_config(&temp_dir)).unwrap();
    let indexes = config.build_indexes().unwrap();

    let input = json!({
        "expression": "$.intBin1 > 100 and $.intBin2 > 100",
        "hint": { "kind": "index_name", "name": "idx1" }
    })
    .to_string();

    let mut out = Vec::new();
    explain_requests(Cursor::new(input), &mut out, &config.namespace, &indexes).unwrap();

    let responses = responses(out);
    let data = &responses[0]["data"];
    assert_eq!(data["explain"]["selected_index"], "idx1");
    assert_eq!(data["explain"]["reason"], "INDEX_NAME_HINT");
    assert!(data["text"]
        .as_str()
        .unwrap()
        .starts_with("=== INDEX SELECTION ==="));
}

/// An over-deep request gets an error response; the next one still runs.
#[test]
fn test_deep_request_does_not_stop_batch() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load(&write_config(&temp_dir)).unwrap();
    let indexes = config.build_indexes().unwrap();

    let deep = format!("$.intBin1{} > 5", " + 1".repeat(5_000));
    let input = [
        json!({ "expression": deep }).to_string(),
        json!({ "expression": "$.intBin2 == 7" }).to_string(),
    ]
    .join("\n");

    let mut out = Vec::new();
    let summary =
        batch_requests(Cursor::new(input), &mut out, &config.namespace, &indexes).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let responses = responses(out);
    assert_eq!(responses[0]["code"], "DSL_SYNTAX_ERROR");
    assert_eq!(responses[1]["data"]["filter_text"], "equal(intBin2, 7)");
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// An invalid index definition fails the whole configuration.
#[test]
fn test_invalid_index_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bindsl.json");
    fs::write(
        &path,
        json!({ "namespace": "test", "indexes": [{ "bin": "", "index_type": "NUMERIC" }] })
            .to_string(),
    )
    .unwrap();

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
    assert!(err.message().contains("bin must not be blank"));
}
