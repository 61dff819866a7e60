//! Collection (CDT) path model
//!
//! A path such as `$.mapBin.a.[1:3].count()` is parsed into a [`PathChain`]:
//! the root bin, the ordered [`CdtStep`]s and an optional [`PathFunction`].
//! The chain is then folded into a [`PathResult`], the accessor node that
//! appears in the compiled tree.

use std::fmt;

use serde::Serialize;

use super::value::{Literal, MapKey, ValueType};

/// Store flag marking an inverted selection
pub const RETURN_INVERTED: i32 = 0x10000;

/// Collection kind a step or accessor operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionKind {
    List,
    Map,
}

impl CollectionKind {
    pub fn value_type(&self) -> ValueType {
        match self {
            CollectionKind::List => ValueType::List,
            CollectionKind::Map => ValueType::Map,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Map => "map",
        }
    }
}

/// What a collection accessor returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnType {
    Value,
    KeyValue,
    UnorderedMap,
    OrderedMap,
    Key,
    Index,
    ReverseIndex,
    Rank,
    ReverseRank,
    Count,
    Exists,
}

impl ReturnType {
    /// Parses a return name as written in `get(return: ...)`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "VALUE" => Some(ReturnType::Value),
            "KEY_VALUE" => Some(ReturnType::KeyValue),
            "UNORDERED_MAP" => Some(ReturnType::UnorderedMap),
            "ORDERED_MAP" => Some(ReturnType::OrderedMap),
            "KEY" => Some(ReturnType::Key),
            "INDEX" => Some(ReturnType::Index),
            "REVERSE_INDEX" => Some(ReturnType::ReverseIndex),
            "RANK" => Some(ReturnType::Rank),
            "REVERSE_RANK" => Some(ReturnType::ReverseRank),
            "COUNT" => Some(ReturnType::Count),
            "EXISTS" => Some(ReturnType::Exists),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Value => "VALUE",
            ReturnType::KeyValue => "KEY_VALUE",
            ReturnType::UnorderedMap => "UNORDERED_MAP",
            ReturnType::OrderedMap => "ORDERED_MAP",
            ReturnType::Key => "KEY",
            ReturnType::Index => "INDEX",
            ReturnType::ReverseIndex => "REVERSE_INDEX",
            ReturnType::Rank => "RANK",
            ReturnType::ReverseRank => "REVERSE_RANK",
            ReturnType::Count => "COUNT",
            ReturnType::Exists => "EXISTS",
        }
    }

    /// Store wire code of the return type
    pub fn code(&self) -> i32 {
        match self {
            ReturnType::Index => 1,
            ReturnType::ReverseIndex => 2,
            ReturnType::Rank => 3,
            ReturnType::ReverseRank => 4,
            ReturnType::Count => 5,
            ReturnType::Key => 6,
            ReturnType::Value => 7,
            ReturnType::KeyValue => 8,
            ReturnType::Exists => 13,
            ReturnType::UnorderedMap => 16,
            ReturnType::OrderedMap => 17,
        }
    }

    /// Only maps carry keys
    pub fn is_map_only(&self) -> bool {
        matches!(self, ReturnType::Key | ReturnType::KeyValue)
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed collection descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum CdtStep {
    /// `[]` or `{}`
    TypeDesignator(CollectionKind),
    /// `.key`, `.'key'`, `{key}`
    Key(MapKey),
    /// `[i]`, `{i}`
    Index { kind: CollectionKind, index: i64 },
    /// `[=v]`, `{=v}`
    Value { kind: CollectionKind, value: Literal },
    /// `[#r]`, `{#r}`
    Rank { kind: CollectionKind, rank: i64 },
    /// `[i:j]`, `{i:j}`
    IndexRange {
        kind: CollectionKind,
        start: i64,
        end: Option<i64>,
        inverted: bool,
    },
    /// `{k1-k2}`
    KeyRange {
        begin: Option<MapKey>,
        end: Option<MapKey>,
        inverted: bool,
    },
    /// `[=v1:v2]`, `{=v1:v2}`
    ValueRange {
        kind: CollectionKind,
        begin: Literal,
        end: Option<Literal>,
        inverted: bool,
    },
    /// `[#r1:r2]`, `{#r1:r2}`
    RankRange {
        kind: CollectionKind,
        start: i64,
        end: Option<i64>,
        inverted: bool,
    },
    /// `[#r1:~v]`, `[#r1:r2~v]`
    RelativeRankRange {
        kind: CollectionKind,
        start: i64,
        end: Option<i64>,
        anchor: Literal,
        inverted: bool,
    },
    /// `{i1:~k}`, `{i1:i2~k}`
    RelativeIndexRange {
        start: i64,
        end: Option<i64>,
        anchor: MapKey,
        inverted: bool,
    },
    /// `[=v1,v2]`, `{=v1,v2}`
    ValueList {
        kind: CollectionKind,
        values: Vec<Literal>,
        inverted: bool,
    },
    /// `{k1,k2}`
    KeyList { keys: Vec<MapKey>, inverted: bool },
}

impl CdtStep {
    /// Collection kind this step navigates
    pub fn kind(&self) -> CollectionKind {
        match self {
            CdtStep::TypeDesignator(kind)
            | CdtStep::Index { kind, .. }
            | CdtStep::Value { kind, .. }
            | CdtStep::Rank { kind, .. }
            | CdtStep::IndexRange { kind, .. }
            | CdtStep::ValueRange { kind, .. }
            | CdtStep::RankRange { kind, .. }
            | CdtStep::RelativeRankRange { kind, .. }
            | CdtStep::ValueList { kind, .. } => *kind,
            CdtStep::Key(_)
            | CdtStep::KeyRange { .. }
            | CdtStep::RelativeIndexRange { .. }
            | CdtStep::KeyList { .. } => CollectionKind::Map,
        }
    }

    /// True for descriptors that select more than one element
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            CdtStep::IndexRange { .. }
                | CdtStep::KeyRange { .. }
                | CdtStep::ValueRange { .. }
                | CdtStep::RankRange { .. }
                | CdtStep::RelativeRankRange { .. }
                | CdtStep::RelativeIndexRange { .. }
                | CdtStep::ValueList { .. }
                | CdtStep::KeyList { .. }
        )
    }

    pub fn is_inverted(&self) -> bool {
        match self {
            CdtStep::IndexRange { inverted, .. }
            | CdtStep::KeyRange { inverted, .. }
            | CdtStep::ValueRange { inverted, .. }
            | CdtStep::RankRange { inverted, .. }
            | CdtStep::RelativeRankRange { inverted, .. }
            | CdtStep::RelativeIndexRange { inverted, .. }
            | CdtStep::ValueList { inverted, .. }
            | CdtStep::KeyList { inverted, .. } => *inverted,
            CdtStep::TypeDesignator(_)
            | CdtStep::Key(_)
            | CdtStep::Index { .. }
            | CdtStep::Value { .. }
            | CdtStep::Rank { .. } => false,
        }
    }
}

/// Terminal modifier of a path
#[derive(Debug, Clone, PartialEq)]
pub enum PathFunction {
    Get {
        value_type: Option<ValueType>,
        return_type: Option<ReturnType>,
    },
    Cast(ValueType),
    Count,
    Size,
    Exists,
}

/// Parsed path: root bin, descriptor steps, terminal function
#[derive(Debug, Clone, PartialEq)]
pub struct PathChain {
    pub bin: String,
    pub steps: Vec<CdtStep>,
    pub function: Option<PathFunction>,
}

/// One intermediate descent used to reach a nested collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "frame", content = "value", rename_all = "snake_case")]
pub enum ContextFrame {
    ListIndex(i64),
    ListRank(i64),
    ListValue(Literal),
    MapKey(MapKey),
    MapIndex(i64),
    MapRank(i64),
    MapValue(Literal),
}

impl fmt::Display for ContextFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextFrame::ListIndex(i) => write!(f, "listIndex({})", i),
            ContextFrame::ListRank(r) => write!(f, "listRank({})", r),
            ContextFrame::ListValue(v) => write!(f, "listValue({})", v),
            ContextFrame::MapKey(k) => write!(f, "mapKey({})", k),
            ContextFrame::MapIndex(i) => write!(f, "mapIndex({})", i),
            ContextFrame::MapRank(r) => write!(f, "mapRank({})", r),
            ContextFrame::MapValue(v) => write!(f, "mapValue({})", v),
        }
    }
}

/// Primary accessor operation of a resolved path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Accessor {
    Size,
    ByIndex {
        index: i64,
    },
    ByRank {
        rank: i64,
    },
    ByKey {
        key: MapKey,
    },
    ByValue {
        value: Literal,
    },
    ByIndexRange {
        index: i64,
        count: Option<i64>,
    },
    ByRankRange {
        rank: i64,
        count: Option<i64>,
    },
    ByKeyRange {
        begin: Option<MapKey>,
        end: Option<MapKey>,
    },
    ByValueRange {
        begin: Literal,
        end: Option<Literal>,
    },
    ByValueRelativeRankRange {
        value: Literal,
        rank: i64,
        count: Option<i64>,
    },
    ByKeyRelativeIndexRange {
        key: MapKey,
        index: i64,
        count: Option<i64>,
    },
    ByValueList {
        values: Vec<Literal>,
    },
    ByKeyList {
        keys: Vec<MapKey>,
    },
}

impl Accessor {
    pub fn name(&self) -> &'static str {
        match self {
            Accessor::Size => "size",
            Accessor::ByIndex { .. } => "getByIndex",
            Accessor::ByRank { .. } => "getByRank",
            Accessor::ByKey { .. } => "getByKey",
            Accessor::ByValue { .. } => "getByValue",
            Accessor::ByIndexRange { .. } => "getByIndexRange",
            Accessor::ByRankRange { .. } => "getByRankRange",
            Accessor::ByKeyRange { .. } => "getByKeyRange",
            Accessor::ByValueRange { .. } => "getByValueRange",
            Accessor::ByValueRelativeRankRange { .. } => "getByValueRelativeRankRange",
            Accessor::ByKeyRelativeIndexRange { .. } => "getByKeyRelativeIndexRange",
            Accessor::ByValueList { .. } => "getByValueList",
            Accessor::ByKeyList { .. } => "getByKeyList",
        }
    }

    /// Renders the operation-specific arguments
    fn args(&self) -> Vec<String> {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            match v {
                Some(v) => v.to_string(),
                None => "nil".to_string(),
            }
        }
        match self {
            Accessor::Size => Vec::new(),
            Accessor::ByIndex { index } => vec![index.to_string()],
            Accessor::ByRank { rank } => vec![rank.to_string()],
            Accessor::ByKey { key } => vec![key.to_string()],
            Accessor::ByValue { value } => vec![value.to_string()],
            Accessor::ByIndexRange { index, count } => vec![index.to_string(), opt(count)],
            Accessor::ByRankRange { rank, count } => vec![rank.to_string(), opt(count)],
            Accessor::ByKeyRange { begin, end } => vec![opt(begin), opt(end)],
            Accessor::ByValueRange { begin, end } => vec![begin.to_string(), opt(end)],
            Accessor::ByValueRelativeRankRange { value, rank, count } => {
                vec![value.to_string(), rank.to_string(), opt(count)]
            }
            Accessor::ByKeyRelativeIndexRange { key, index, count } => {
                vec![key.to_string(), index.to_string(), opt(count)]
            }
            Accessor::ByValueList { values } => {
                vec![Literal::List(values.clone()).to_string()]
            }
            Accessor::ByKeyList { keys } => {
                let items: Vec<Literal> = keys.iter().cloned().map(Literal::from).collect();
                vec![Literal::List(items).to_string()]
            }
        }
    }
}

/// A resolved collection accessor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResult {
    /// Root bin name; the bin's type is `bin_type`
    pub bin: String,
    /// LIST or MAP, decided by the first step
    pub bin_type: CollectionKind,
    /// Descents applied before the accessor
    pub context: Vec<ContextFrame>,
    /// Collection kind the accessor operates on
    pub collection: CollectionKind,
    pub accessor: Accessor,
    /// `None` for `Size`, which has no return selector
    pub return_type: Option<ReturnType>,
    pub inverted: bool,
    /// Type of the accessor's result
    pub value_type: ValueType,
}

impl PathResult {
    /// Return selector including the inverted flag
    pub fn return_flags(&self) -> Option<i32> {
        self.return_type.map(|rt| {
            if self.inverted {
                rt.code() | RETURN_INVERTED
            } else {
                rt.code()
            }
        })
    }
}

impl fmt::Display for PathResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args = Vec::new();
        if let Some(rt) = self.return_type {
            if self.inverted {
                args.push(format!("{}|INVERTED", rt));
            } else {
                args.push(rt.to_string());
            }
            args.push(self.value_type.to_string());
        }
        args.extend(self.accessor.args());
        args.push(format!(
            "{}Bin({:?})",
            self.bin_type.value_type().bin_prefix(),
            self.bin
        ));
        if !self.context.is_empty() {
            let frames: Vec<String> = self.context.iter().map(|c| c.to_string()).collect();
            args.push(format!("ctx({})", frames.join(", ")));
        }
        write!(
            f,
            "{}.{}({})",
            self.collection.as_str(),
            self.accessor.name(),
            args.join(", ")
        )
    }
}
