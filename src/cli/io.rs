//! JSON I/O handling for CLI
//!
//! - Input: one JSON request object per line
//! - Output: one JSON response object per line
//! - UTF-8 only

use std::io::Write;

use serde::Deserialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::model::IndexHint;

/// One request line
///
/// ```json
/// {"expression": "$.a > ?0", "values": [10], "hint": {"kind": "bin_name", "name": "a"}}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    pub expression: String,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub hint: Option<IndexHint>,
}

/// Parses one request line
pub fn parse_request(line: &str) -> CliResult<Request> {
    serde_json::from_str(line).map_err(CliError::from)
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

/// Write an error response
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}
