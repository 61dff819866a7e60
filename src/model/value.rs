//! Value types and literal constants
//!
//! Every compiled node resolves to exactly one `ValueType`. Literals are the
//! only nodes that carry concrete data.

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Resolved value type of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Int,
    Float,
    String,
    Bool,
    Blob,
    List,
    Map,
}

impl ValueType {
    /// Returns the canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "INT",
            ValueType::Float => "FLOAT",
            ValueType::String => "STRING",
            ValueType::Bool => "BOOL",
            ValueType::Blob => "BLOB",
            ValueType::List => "LIST",
            ValueType::Map => "MAP",
        }
    }

    /// Parses a type name as written in `get(type: ...)`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INT" => Some(ValueType::Int),
            "FLOAT" => Some(ValueType::Float),
            "STRING" => Some(ValueType::String),
            "BOOL" => Some(ValueType::Bool),
            "BLOB" => Some(ValueType::Blob),
            "LIST" => Some(ValueType::List),
            "MAP" => Some(ValueType::Map),
            _ => None,
        }
    }

    /// Returns true for INT and FLOAT
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }

    /// Prefix used when rendering a typed bin, e.g. `intBin`
    pub fn bin_prefix(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Bool => "bool",
            ValueType::Blob => "blob",
            ValueType::List => "list",
            ValueType::Map => "map",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map constant key, restricted to INT or STRING
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapKey {
    Int(i64),
    String(String),
}

impl MapKey {
    pub fn value_type(&self) -> ValueType {
        match self {
            MapKey::Int(_) => ValueType::Int,
            MapKey::String(_) => ValueType::String,
        }
    }

    /// Converts a literal into a map key, if its kind allows it
    pub fn from_literal(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::Int(v) => Some(MapKey::Int(*v)),
            Literal::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }
}

impl From<MapKey> for Literal {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Int(v) => Literal::Int(v),
            MapKey::String(s) => Literal::String(s),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(v) => write!(f, "{}", v),
            MapKey::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// A constant value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Blob(Vec<u8>),
    List(Vec<Literal>),
    Map(#[serde(serialize_with = "serialize_map_entries")] BTreeMap<MapKey, Literal>),
}

impl Literal {
    pub fn value_type(&self) -> ValueType {
        match self {
            Literal::Int(_) => ValueType::Int,
            Literal::Float(_) => ValueType::Float,
            Literal::String(_) => ValueType::String,
            Literal::Bool(_) => ValueType::Bool,
            Literal::Blob(_) => ValueType::Blob,
            Literal::List(_) => ValueType::List,
            Literal::Map(_) => ValueType::Map,
        }
    }

    /// Element kind shared by every item of a list constant
    pub fn element_type(&self) -> Option<ValueType> {
        match self {
            Literal::List(items) => items.first().map(Literal::value_type),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Blob(bytes) => write!(f, "blob({:?})", STANDARD.encode(bytes)),
            Literal::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Literal::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// JSON object keys must be strings, so map constants serialize as pairs
fn serialize_map_entries<S: Serializer>(
    entries: &BTreeMap<MapKey, Literal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(entries.len()))?;
    for entry in entries {
        seq.serialize_element(&entry)?;
    }
    seq.end()
}
