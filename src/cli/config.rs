//! Configuration file for the `explain` and `batch` commands
//!
//! ```json
//! {
//!   "namespace": "test",
//!   "log_level": "info",
//!   "indexes": [
//!     { "bin": "intBin1", "name": "idx1", "index_type": "NUMERIC", "cardinality_hint": 3 }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{ContextFrame, Index, IndexCollectionType, IndexType, MapKey};
use crate::observability::Severity;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Namespace expressions are evaluated against (required)
    pub namespace: String,

    /// Secondary index catalog (optional, default empty)
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub bin: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Defaults to the configuration namespace
    #[serde(default)]
    pub namespace: Option<String>,

    pub index_type: IndexType,

    #[serde(default)]
    pub collection_type: IndexCollectionType,

    #[serde(default)]
    pub context: Vec<ContextDefinition>,

    #[serde(default)]
    pub cardinality_hint: i64,
}

/// CDT context frame as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "frame", content = "value", rename_all = "snake_case")]
pub enum ContextDefinition {
    ListIndex(i64),
    ListRank(i64),
    MapIndex(i64),
    MapRank(i64),
    MapKey(KeyDefinition),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyDefinition {
    Int(i64),
    String(String),
}

impl From<&ContextDefinition> for ContextFrame {
    fn from(def: &ContextDefinition) -> Self {
        match def {
            ContextDefinition::ListIndex(i) => ContextFrame::ListIndex(*i),
            ContextDefinition::ListRank(r) => ContextFrame::ListRank(*r),
            ContextDefinition::MapIndex(i) => ContextFrame::MapIndex(*i),
            ContextDefinition::MapRank(r) => ContextFrame::MapRank(*r),
            ContextDefinition::MapKey(KeyDefinition::Int(k)) => ContextFrame::MapKey(MapKey::Int(*k)),
            ContextDefinition::MapKey(KeyDefinition::String(k)) => {
                ContextFrame::MapKey(MapKey::String(k.clone()))
            }
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(CliError::config_error("namespace must not be blank"));
        }

        self.severity()?;
        self.build_indexes()?;

        Ok(())
    }

    /// Configured minimum log severity
    pub fn severity(&self) -> CliResult<Severity> {
        Severity::from_name(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!("Invalid log_level: '{}'", self.log_level))
        })
    }

    /// Builds the index catalog, validating every entry
    pub fn build_indexes(&self) -> CliResult<Vec<Index>> {
        self.indexes
            .iter()
            .map(|def| {
                let namespace = def.namespace.as_deref().unwrap_or(&self.namespace);
                let mut builder = Index::builder(namespace, def.bin.as_str())
                    .index_type(def.index_type)
                    .collection_type(def.collection_type)
                    .context(def.context.iter().map(ContextFrame::from).collect())
                    .cardinality_hint(def.cardinality_hint);
                if let Some(name) = &def.name {
                    builder = builder.name(name.as_str());
                }
                builder.build().map_err(|e| {
                    CliError::config_error(format!("Invalid index on '{}': {}", def.bin, e))
                })
            })
            .collect()
    }
}
