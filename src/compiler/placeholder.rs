//! External values referenced by `?N` placeholders

use serde_json::Value;

use super::errors::{CompileError, CompileResult};
use super::literals::{build_list, build_map};
use crate::model::Literal;

/// Ordered, read-only value list; `?0` is the first entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderValues {
    values: Vec<Literal>,
}

impl PlaceholderValues {
    pub fn new(values: Vec<Literal>) -> Self {
        Self { values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Converts JSON values; objects become STRING-keyed maps
    pub fn from_json(values: &[Value]) -> CompileResult<Self> {
        let values = values
            .iter()
            .map(literal_from_json)
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(Self { values })
    }

    pub fn get(&self, index: usize) -> CompileResult<&Literal> {
        self.values.get(index).ok_or_else(|| {
            CompileError::unresolved(format!(
                "Missing value for placeholder ?{} ({} value(s) supplied)",
                index,
                self.values.len()
            ))
        })
    }

    /// Lookup that never errors; used while scanning for type hints
    pub fn peek(&self, index: usize) -> Option<&Literal> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn literal_from_json(value: &Value) -> CompileResult<Literal> {
    match value {
        Value::Bool(b) => Ok(Literal::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Literal::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Literal::Float(f))
            } else {
                Err(CompileError::type_mismatch(format!(
                    "Placeholder value {} does not fit INT or FLOAT",
                    n
                )))
            }
        }
        Value::String(s) => Ok(Literal::String(s.clone())),
        Value::Array(items) => build_list(
            items
                .iter()
                .map(literal_from_json)
                .collect::<CompileResult<Vec<_>>>()?,
        ),
        Value::Object(entries) => build_map(
            entries
                .iter()
                .map(|(k, v)| -> CompileResult<(Literal, Literal)> {
                    Ok((Literal::String(k.clone()), literal_from_json(v)?))
                })
                .collect::<CompileResult<Vec<_>>>()?,
        ),
        Value::Null => Err(CompileError::type_mismatch(
            "Placeholder values must not be null",
        )),
    }
}
