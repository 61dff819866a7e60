//! Secondary index descriptors
//!
//! Indexes are supplied by the caller as an in-memory catalog. Descriptors are
//! immutable once built; construction goes through [`IndexBuilder`] which
//! rejects blank names and negative cardinality.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cdt::ContextFrame;

/// Index validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("index namespace must not be blank")]
    BlankNamespace,

    #[error("index bin must not be blank")]
    BlankBin,

    #[error("index type is required for bin '{0}'")]
    MissingIndexType(String),

    #[error("cardinality hint must be non-negative, got {0}")]
    NegativeCardinality(i64),
}

/// Kind of values an index stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    Numeric,
    String,
    Blob,
    #[serde(rename = "GEO2DSPHERE")]
    Geo2dSphere,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Numeric => "NUMERIC",
            IndexType::String => "STRING",
            IndexType::Blob => "BLOB",
            IndexType::Geo2dSphere => "GEO2DSPHERE",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which part of a bin's value an index covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexCollectionType {
    #[default]
    Default,
    List,
    #[serde(rename = "MAPKEYS")]
    MapKeys,
    #[serde(rename = "MAPVALUES")]
    MapValues,
}

/// Immutable secondary index descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Index {
    namespace: String,
    bin: String,
    name: Option<String>,
    index_type: IndexType,
    collection_type: IndexCollectionType,
    context: Vec<ContextFrame>,
    cardinality_hint: i64,
}

impl Index {
    /// Starts building an index on `namespace`/`bin`
    pub fn builder(namespace: impl Into<String>, bin: impl Into<String>) -> IndexBuilder {
        IndexBuilder {
            namespace: namespace.into(),
            bin: bin.into(),
            name: None,
            index_type: None,
            collection_type: IndexCollectionType::Default,
            context: Vec::new(),
            cardinality_hint: 0,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn collection_type(&self) -> IndexCollectionType {
        self.collection_type
    }

    pub fn context(&self) -> &[ContextFrame] {
        &self.context
    }

    pub fn cardinality_hint(&self) -> i64 {
        self.cardinality_hint
    }

    /// Plain bin index: no collection type and no CDT context
    pub fn is_top_level(&self) -> bool {
        self.collection_type == IndexCollectionType::Default && self.context.is_empty()
    }

    /// Name used in explain output
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}.{}", self.namespace, self.bin),
        }
    }
}

/// Builder for [`Index`]
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    namespace: String,
    bin: String,
    name: Option<String>,
    index_type: Option<IndexType>,
    collection_type: IndexCollectionType,
    context: Vec<ContextFrame>,
    cardinality_hint: i64,
}

impl IndexBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = Some(index_type);
        self
    }

    pub fn collection_type(mut self, collection_type: IndexCollectionType) -> Self {
        self.collection_type = collection_type;
        self
    }

    pub fn context(mut self, context: Vec<ContextFrame>) -> Self {
        self.context = context;
        self
    }

    pub fn cardinality_hint(mut self, cardinality_hint: i64) -> Self {
        self.cardinality_hint = cardinality_hint;
        self
    }

    /// Validates and builds the descriptor
    pub fn build(self) -> Result<Index, IndexError> {
        if self.namespace.trim().is_empty() {
            return Err(IndexError::BlankNamespace);
        }
        if self.bin.trim().is_empty() {
            return Err(IndexError::BlankBin);
        }
        let index_type = self
            .index_type
            .ok_or_else(|| IndexError::MissingIndexType(self.bin.clone()))?;
        if self.cardinality_hint < 0 {
            return Err(IndexError::NegativeCardinality(self.cardinality_hint));
        }

        Ok(Index {
            namespace: self.namespace,
            bin: self.bin,
            name: self.name,
            index_type,
            collection_type: self.collection_type,
            context: self.context,
            cardinality_hint: self.cardinality_hint,
        })
    }
}

/// Caller preference for index selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum IndexHint {
    /// Prefer the index with this name
    IndexName(String),
    /// Prefer indexes on this bin
    BinName(String),
}

/// Index pool narrowed by a hint, plus the pool to fall back to
#[derive(Debug, Clone)]
pub struct IndexSelectionContext<'a> {
    pub namespace: String,
    pub candidate_indexes: Vec<&'a Index>,
    pub fallback_indexes: Option<Vec<&'a Index>>,
}

impl<'a> IndexSelectionContext<'a> {
    /// Builds the pools for `namespace`; a hint that names nothing yields the
    /// full pool with no fallback
    pub fn new(namespace: &str, indexes: &'a [Index], hint: Option<&IndexHint>) -> Self {
        let pool: Vec<&Index> = indexes
            .iter()
            .filter(|idx| idx.namespace() == namespace)
            .collect();

        let narrowed: Vec<&Index> = match hint {
            Some(IndexHint::IndexName(name)) => pool
                .iter()
                .copied()
                .filter(|idx| idx.name() == Some(name.as_str()))
                .collect(),
            Some(IndexHint::BinName(bin)) => pool
                .iter()
                .copied()
                .filter(|idx| idx.bin() == bin)
                .collect(),
            None => Vec::new(),
        };

        if narrowed.is_empty() {
            Self {
                namespace: namespace.to_string(),
                candidate_indexes: pool,
                fallback_indexes: None,
            }
        } else {
            Self {
                namespace: namespace.to_string(),
                candidate_indexes: narrowed,
                fallback_indexes: Some(pool),
            }
        }
    }

    /// True when a hint narrowed the pool
    pub fn is_narrowed(&self) -> bool {
        self.fallback_indexes.is_some()
    }
}
