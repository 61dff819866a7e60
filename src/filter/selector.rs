//! Index selection
//!
//! Chooses one candidate and the index that serves it. Hints are tried first;
//! a hint that selects nothing falls back to automatic selection over the
//! full namespace pool. Automatic selection prefers the highest cardinality
//! hint, ties broken lexicographically by bin name.

use std::cmp::Ordering;

use serde::Serialize;

use super::candidate::{extract, Candidate, CandidateValue};
use super::explain::{CandidateExplain, SelectionExplain};
use super::residual::residual;
use super::{eligible_leaves, FilterSelection, IndexFilter};
use crate::model::{Expr, Index, IndexHint, IndexSelectionContext, IndexType};
use crate::observability::{log_event_with_fields, Event};

/// Why a candidate was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionReason {
    IndexNameHint,
    BinNameHint,
    Cardinality,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::IndexNameHint => "INDEX_NAME_HINT",
            SelectionReason::BinNameHint => "BIN_NAME_HINT",
            SelectionReason::Cardinality => "CARDINALITY",
        }
    }
}

/// A chosen candidate with its serving index
struct Choice<'a> {
    candidate: usize,
    index: &'a Index,
    reason: SelectionReason,
}

/// Everything one selection pass learned, shared by `select` and `explain`
struct Evaluation<'a, 'e> {
    leaves: Vec<&'e Expr>,
    candidates: Vec<Candidate<'e>>,
    choice: Option<Choice<'a>>,
    hint_fallback: bool,
}

/// Selects index filters for one namespace
///
/// Deterministic: the same expression, catalog and hint always give the
/// same selection.
pub struct IndexSelector<'a> {
    namespace: &'a str,
    indexes: &'a [Index],
}

impl<'a> IndexSelector<'a> {
    pub fn new(namespace: &'a str, indexes: &'a [Index]) -> Self {
        Self { namespace, indexes }
    }

    /// Splits `expr` into at most one index filter and the residual
    pub fn select(&self, expr: &Expr, hint: Option<&IndexHint>) -> FilterSelection {
        let evaluation = self.evaluate(expr, hint);

        let Some(choice) = &evaluation.choice else {
            let candidates = evaluation.candidates.len().to_string();
            log_event_with_fields(
                Event::IndexFilterNone,
                &[("namespace", self.namespace), ("candidates", &candidates)],
            );
            return FilterSelection {
                filter: None,
                residual: Some(expr.clone()),
            };
        };

        let candidate = &evaluation.candidates[choice.candidate];
        let filter = IndexFilter::from_candidate(candidate, choice.index);
        let rendered = filter.to_string();
        let index_name = choice.index.display_name();
        log_event_with_fields(
            Event::IndexFilterSelected,
            &[
                ("namespace", self.namespace),
                ("bin", candidate.bin),
                ("index", &index_name),
                ("filter", &rendered),
                ("reason", choice.reason.as_str()),
            ],
        );

        FilterSelection {
            filter: Some(filter),
            residual: residual(expr, candidate.leaf),
        }
    }

    /// Describes how `select` would treat `expr`
    pub fn explain(&self, expr: &Expr, hint: Option<&IndexHint>) -> SelectionExplain {
        let evaluation = self.evaluate(expr, hint);
        let pool = self.namespace_pool();

        let candidates = evaluation
            .candidates
            .iter()
            .map(|candidate| {
                let index = best_index_for(candidate, &pool);
                CandidateExplain {
                    leaf: candidate.leaf.to_string(),
                    bin: candidate.bin.to_string(),
                    op: candidate.op.name().to_string(),
                    bounds: describe_value(&candidate.value),
                    index: index.map(Index::display_name),
                    cardinality: index.map(Index::cardinality_hint),
                }
            })
            .collect();

        let (selected, residual_tree) = match &evaluation.choice {
            Some(choice) => {
                let candidate = &evaluation.candidates[choice.candidate];
                (
                    Some((
                        IndexFilter::from_candidate(candidate, choice.index),
                        choice.index.display_name(),
                        choice.reason,
                    )),
                    residual(expr, candidate.leaf),
                )
            }
            None => (None, Some(expr.clone())),
        };

        SelectionExplain {
            namespace: self.namespace.to_string(),
            hint: hint.map(describe_hint),
            leaves: evaluation.leaves.iter().map(|leaf| leaf.to_string()).collect(),
            candidates,
            selected_index: selected.as_ref().map(|(_, name, _)| name.clone()),
            selected_bin: selected.as_ref().map(|(filter, _, _)| filter.bin.clone()),
            filter: selected.as_ref().map(|(filter, _, _)| filter.to_string()),
            reason: selected.map(|(_, _, reason)| reason),
            hint_fallback: evaluation.hint_fallback,
            residual: residual_tree.map(|tree| tree.to_string()),
        }
    }

    fn namespace_pool(&self) -> Vec<&'a Index> {
        self.indexes
            .iter()
            .filter(|idx| idx.namespace() == self.namespace)
            .collect()
    }

    fn evaluate<'e>(&self, expr: &'e Expr, hint: Option<&IndexHint>) -> Evaluation<'a, 'e> {
        let leaves = eligible_leaves(expr);
        let candidates: Vec<Candidate<'e>> = leaves.iter().copied().filter_map(extract).collect();

        let ctx = IndexSelectionContext::new(self.namespace, self.indexes, hint);

        let hinted = match hint {
            Some(IndexHint::IndexName(_)) if ctx.is_narrowed() => {
                first_served(&candidates, &ctx.candidate_indexes, SelectionReason::IndexNameHint)
            }
            Some(IndexHint::BinName(_)) if ctx.is_narrowed() => {
                if ctx.candidate_indexes.len() == 1 {
                    first_served(&candidates, &ctx.candidate_indexes, SelectionReason::BinNameHint)
                } else {
                    automatic(&candidates, &ctx.candidate_indexes).map(|choice| Choice {
                        reason: SelectionReason::BinNameHint,
                        ..choice
                    })
                }
            }
            _ => None,
        };

        if hinted.is_some() {
            return Evaluation {
                leaves,
                candidates,
                choice: hinted,
                hint_fallback: false,
            };
        }

        let hint_fallback = hint.is_some();
        if let Some(hint) = hint {
            let described = describe_hint(hint);
            log_event_with_fields(
                Event::IndexHintFallback,
                &[("namespace", self.namespace), ("hint", &described)],
            );
        }

        let pool = ctx.fallback_indexes.as_ref().unwrap_or(&ctx.candidate_indexes);
        let choice = automatic(&candidates, pool);

        Evaluation {
            leaves,
            candidates,
            choice,
            hint_fallback,
        }
    }
}

/// An index can serve a candidate when it covers the plain bin with a
/// matching value kind
fn serves(index: &Index, candidate: &Candidate<'_>) -> bool {
    if index.bin() != candidate.bin || !index.is_top_level() {
        return false;
    }
    matches!(
        (index.index_type(), &candidate.value),
        (IndexType::Numeric, CandidateValue::Int { .. })
            | (IndexType::String, CandidateValue::String(_))
            | (IndexType::Blob, CandidateValue::Blob(_))
    )
}

/// Highest cardinality serving index, ties by display name
fn best_index_for<'a>(candidate: &Candidate<'_>, pool: &[&'a Index]) -> Option<&'a Index> {
    pool.iter()
        .copied()
        .filter(|idx| serves(idx, candidate))
        .min_by(|a, b| {
            b.cardinality_hint()
                .cmp(&a.cardinality_hint())
                .then_with(|| a.display_name().cmp(&b.display_name()))
        })
}

/// First candidate in source order that the pool can serve
fn first_served<'a>(
    candidates: &[Candidate<'_>],
    pool: &[&'a Index],
    reason: SelectionReason,
) -> Option<Choice<'a>> {
    candidates.iter().enumerate().find_map(|(position, candidate)| {
        best_index_for(candidate, pool).map(|index| Choice {
            candidate: position,
            index,
            reason,
        })
    })
}

/// Highest cardinality, ties broken by the lexicographically smallest bin;
/// within one bin the first candidate in source order wins
fn automatic<'a>(candidates: &[Candidate<'_>], pool: &[&'a Index]) -> Option<Choice<'a>> {
    let mut best: Option<Choice<'a>> = None;

    for (position, candidate) in candidates.iter().enumerate() {
        let Some(index) = best_index_for(candidate, pool) else {
            continue;
        };

        let better = match &best {
            None => true,
            Some(current) => {
                let current_bin = candidates[current.candidate].bin;
                match index.cardinality_hint().cmp(&current.index.cardinality_hint()) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => candidate.bin < current_bin,
                }
            }
        };

        if better {
            best = Some(Choice {
                candidate: position,
                index,
                reason: SelectionReason::Cardinality,
            });
        }
    }

    best
}

fn describe_hint(hint: &IndexHint) -> String {
    match hint {
        IndexHint::IndexName(name) => format!("index_name={}", name),
        IndexHint::BinName(bin) => format!("bin_name={}", bin),
    }
}

fn describe_value(value: &CandidateValue) -> String {
    match value {
        CandidateValue::Int { begin, end } => format!("[{}, {}]", begin, end),
        CandidateValue::String(s) => format!("{:?}", s),
        CandidateValue::Blob(bytes) => format!("blob({} bytes)", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOperation, FilterValue, RANGE_MAX};
    use crate::model::{ContextFrame, IndexCollectionType, MapKey};

    fn numeric(bin: &str, cardinality: i64) -> Index {
        Index::builder("test", bin)
            .index_type(IndexType::Numeric)
            .cardinality_hint(cardinality)
            .build()
            .unwrap()
    }

    fn named(bin: &str, name: &str, cardinality: i64) -> Index {
        Index::builder("test", bin)
            .name(name)
            .index_type(IndexType::Numeric)
            .cardinality_hint(cardinality)
            .build()
            .unwrap()
    }

    fn two_bins() -> Expr {
        Expr::and(vec![
            Expr::gt(Expr::int_bin("intBin1"), Expr::int(100)),
            Expr::gt(Expr::int_bin("intBin2"), Expr::int(100)),
        ])
    }

    #[test]
    fn test_highest_cardinality_wins() {
        let indexes = vec![numeric("intBin1", 0), numeric("intBin2", 1)];
        let selector = IndexSelector::new("test", &indexes);
        let selection = selector.select(&two_bins(), None);

        assert_eq!(
            selection.filter.map(|f| f.to_string()),
            Some(format!("range(intBin2, 101, {})", RANGE_MAX))
        );
        assert_eq!(
            selection.residual,
            Some(Expr::gt(Expr::int_bin("intBin1"), Expr::int(100)))
        );
    }

    #[test]
    fn test_ties_break_alphabetically() {
        let indexes = vec![numeric("intBin2", 5), numeric("intBin1", 5)];
        let selection = IndexSelector::new("test", &indexes).select(&two_bins(), None);
        assert_eq!(selection.filter.unwrap().bin, "intBin1");
    }

    #[test]
    fn test_first_candidate_per_bin() {
        let expr = Expr::and(vec![
            Expr::gt(Expr::int_bin("a"), Expr::int(1)),
            Expr::lt(Expr::int_bin("a"), Expr::int(10)),
        ]);
        let indexes = vec![numeric("a", 1)];
        let selection = IndexSelector::new("test", &indexes).select(&expr, None);
        assert_eq!(
            selection.filter.unwrap().operation,
            FilterOperation::Range {
                begin: 2,
                end: RANGE_MAX
            }
        );
        assert_eq!(
            selection.residual,
            Some(Expr::lt(Expr::int_bin("a"), Expr::int(10)))
        );
    }

    #[test]
    fn test_index_name_hint_overrides_cardinality() {
        let indexes = vec![named("intBin1", "idx1", 0), named("intBin2", "idx2", 9)];
        let hint = IndexHint::IndexName("idx1".into());
        let selection = IndexSelector::new("test", &indexes).select(&two_bins(), Some(&hint));
        let filter = selection.filter.unwrap();
        assert_eq!(filter.bin, "intBin1");
        assert_eq!(filter.index_name.as_deref(), Some("idx1"));
    }

    #[test]
    fn test_bin_name_hint_overrides_cardinality() {
        let indexes = vec![numeric("intBin1", 0), numeric("intBin2", 9)];
        let hint = IndexHint::BinName("intBin1".into());
        let selection = IndexSelector::new("test", &indexes).select(&two_bins(), Some(&hint));
        assert_eq!(selection.filter.unwrap().bin, "intBin1");
    }

    #[test]
    fn test_bin_hint_with_several_indexes_picks_best() {
        let indexes = vec![named("intBin1", "low", 1), named("intBin1", "high", 7)];
        let hint = IndexHint::BinName("intBin1".into());
        let selector = IndexSelector::new("test", &indexes);
        let selection = selector.select(&two_bins(), Some(&hint));
        assert_eq!(selection.filter.unwrap().index_name.as_deref(), Some("high"));

        let explain = selector.explain(&two_bins(), Some(&hint));
        assert_eq!(explain.reason, Some(SelectionReason::BinNameHint));
        assert!(!explain.hint_fallback);
    }

    #[test]
    fn test_hint_miss_matches_unhinted() {
        let indexes = vec![named("intBin1", "idx1", 0), named("intBin2", "idx2", 1)];
        let selector = IndexSelector::new("test", &indexes);
        let unhinted = selector.select(&two_bins(), None);

        for hint in [
            IndexHint::IndexName("missing".into()),
            IndexHint::BinName("missing".into()),
        ] {
            assert_eq!(selector.select(&two_bins(), Some(&hint)), unhinted);
        }
    }

    #[test]
    fn test_hint_without_candidate_falls_back() {
        let indexes = vec![numeric("intBin1", 0), numeric("intBin2", 1), numeric("other", 9)];
        let hint = IndexHint::BinName("other".into());
        let selector = IndexSelector::new("test", &indexes);
        let explain = selector.explain(&two_bins(), Some(&hint));
        assert!(explain.hint_fallback);
        assert_eq!(explain.selected_bin.as_deref(), Some("intBin2"));
        assert_eq!(explain.reason, Some(SelectionReason::Cardinality));
    }

    #[test]
    fn test_index_type_must_match() {
        let indexes = vec![Index::builder("test", "name")
            .index_type(IndexType::Numeric)
            .build()
            .unwrap()];
        let expr = Expr::eq(Expr::string_bin("name"), Expr::string("bob"));
        let selection = IndexSelector::new("test", &indexes).select(&expr, None);
        assert!(selection.filter.is_none());
        assert_eq!(selection.residual, Some(expr));
    }

    #[test]
    fn test_string_equality_filter() {
        let indexes = vec![Index::builder("test", "name")
            .index_type(IndexType::String)
            .build()
            .unwrap()];
        let expr = Expr::eq(Expr::string_bin("name"), Expr::string("bob"));
        let selection = IndexSelector::new("test", &indexes).select(&expr, None);
        assert_eq!(
            selection.filter.unwrap().operation,
            FilterOperation::Equal {
                value: FilterValue::String("bob".into())
            }
        );
        assert_eq!(selection.residual, None);
    }

    #[test]
    fn test_cdt_indexes_never_match() {
        let indexes = vec![
            Index::builder("test", "a")
                .index_type(IndexType::Numeric)
                .collection_type(IndexCollectionType::List)
                .build()
                .unwrap(),
            Index::builder("test", "a")
                .index_type(IndexType::Numeric)
                .context(vec![ContextFrame::MapKey(MapKey::String("k".into()))])
                .build()
                .unwrap(),
        ];
        let expr = Expr::eq(Expr::int_bin("a"), Expr::int(1));
        assert!(IndexSelector::new("test", &indexes)
            .select(&expr, None)
            .filter
            .is_none());
    }

    #[test]
    fn test_other_namespace_ignored() {
        let indexes = vec![Index::builder("other", "a")
            .index_type(IndexType::Numeric)
            .build()
            .unwrap()];
        let expr = Expr::eq(Expr::int_bin("a"), Expr::int(1));
        assert!(IndexSelector::new("test", &indexes)
            .select(&expr, None)
            .filter
            .is_none());
    }

    #[test]
    fn test_selection_deterministic() {
        let indexes = vec![numeric("intBin1", 3), numeric("intBin2", 3)];
        let selector = IndexSelector::new("test", &indexes);
        let first = selector.select(&two_bins(), None);
        for _ in 0..10 {
            assert_eq!(selector.select(&two_bins(), None), first);
        }
    }
}
