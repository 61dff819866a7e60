//! Explain output for index selection
//!
//! Deterministic, human-readable rendering of one selection pass, plus a JSON
//! form for the CLI.

use std::fmt;

use serde::Serialize;

use super::selector::SelectionReason;

/// One candidate as seen by the selector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateExplain {
    /// Rendered leaf
    pub leaf: String,
    pub bin: String,
    /// Comparison after moving the literal to the right
    pub op: String,
    /// Solved bounds or equality value
    pub bounds: String,
    /// Best serving index in the namespace, if any
    pub index: Option<String>,
    pub cardinality: Option<i64>,
}

/// Explain output for one selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionExplain {
    pub namespace: String,
    pub hint: Option<String>,
    /// Eligible leaves in source order
    pub leaves: Vec<String>,
    pub candidates: Vec<CandidateExplain>,
    pub selected_index: Option<String>,
    pub selected_bin: Option<String>,
    pub filter: Option<String>,
    pub reason: Option<SelectionReason>,
    /// Set when a hint was given but did not decide the selection
    pub hint_fallback: bool,
    pub residual: Option<String>,
}

impl SelectionExplain {
    pub fn is_selected(&self) -> bool {
        self.filter.is_some()
    }
}

impl fmt::Display for SelectionExplain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== INDEX SELECTION ===")?;
        writeln!(f, "Namespace: {}", self.namespace)?;
        if let Some(hint) = &self.hint {
            writeln!(f, "Hint: {}", hint)?;
        }

        if !self.leaves.is_empty() {
            writeln!(f, "Eligible Leaves:")?;
            for leaf in &self.leaves {
                writeln!(f, "  - {}", leaf)?;
            }
        }

        if !self.candidates.is_empty() {
            writeln!(f, "Candidates:")?;
            for c in &self.candidates {
                match (&c.index, c.cardinality) {
                    (Some(index), Some(cardinality)) => writeln!(
                        f,
                        "  - {} {} {} via {} (cardinality {})",
                        c.bin, c.op, c.bounds, index, cardinality
                    )?,
                    _ => writeln!(f, "  - {} {} {} (no index)", c.bin, c.op, c.bounds)?,
                }
            }
        }

        if self.is_selected() {
            writeln!(f, "Status: SELECTED")?;
            if let Some(index) = &self.selected_index {
                writeln!(f, "Index: {}", index)?;
            }
            if let Some(filter) = &self.filter {
                writeln!(f, "Filter: {}", filter)?;
            }
            if let Some(reason) = self.reason {
                writeln!(f, "Reason: {}", reason.as_str())?;
            }
        } else {
            writeln!(f, "Status: NO FILTER")?;
        }

        if self.hint_fallback {
            writeln!(f, "Hint Fallback: yes")?;
        }

        match &self.residual {
            Some(residual) => writeln!(f, "Residual: {}", residual)?,
            None => writeln!(f, "Residual: none")?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::IndexSelector;
    use crate::model::{Expr, Index, IndexHint, IndexType};

    fn indexes() -> Vec<Index> {
        vec![
            Index::builder("test", "intBin1")
                .name("idx1")
                .index_type(IndexType::Numeric)
                .build()
                .unwrap(),
            Index::builder("test", "intBin2")
                .name("idx2")
                .index_type(IndexType::Numeric)
                .cardinality_hint(1)
                .build()
                .unwrap(),
        ]
    }

    fn expr() -> Expr {
        Expr::and(vec![
            Expr::gt(Expr::int_bin("intBin1"), Expr::int(100)),
            Expr::gt(Expr::int_bin("intBin2"), Expr::int(100)),
        ])
    }

    #[test]
    fn test_explain_selected() {
        let indexes = indexes();
        let explain = IndexSelector::new("test", &indexes).explain(&expr(), None);

        assert!(explain.is_selected());
        assert_eq!(explain.selected_index.as_deref(), Some("idx2"));
        assert_eq!(explain.candidates.len(), 2);
        assert_eq!(explain.candidates[0].cardinality, Some(0));

        let output = explain.to_string();
        assert!(output.starts_with("=== INDEX SELECTION ==="));
        assert!(output.contains("Status: SELECTED"));
        assert!(output.contains("Reason: CARDINALITY"));
        assert!(output.contains("Residual: gt(intBin(\"intBin1\"), 100)"));
    }

    #[test]
    fn test_explain_no_filter() {
        let indexes = indexes();
        let or = Expr::or(vec![
            Expr::gt(Expr::int_bin("intBin1"), Expr::int(100)),
            Expr::gt(Expr::int_bin("intBin2"), Expr::int(100)),
        ]);
        let explain = IndexSelector::new("test", &indexes).explain(&or, None);

        assert!(!explain.is_selected());
        assert!(explain.leaves.is_empty());
        let output = explain.to_string();
        assert!(output.contains("Status: NO FILTER"));
    }

    #[test]
    fn test_explain_hint_fallback() {
        let indexes = indexes();
        let hint = IndexHint::IndexName("nope".into());
        let explain = IndexSelector::new("test", &indexes).explain(&expr(), Some(&hint));

        assert!(explain.hint_fallback);
        assert_eq!(explain.hint.as_deref(), Some("index_name=nope"));
        assert!(explain.to_string().contains("Hint Fallback: yes"));
    }

    #[test]
    fn test_explain_json() {
        let indexes = indexes();
        let explain = IndexSelector::new("test", &indexes).explain(&expr(), None);
        let json = serde_json::to_value(&explain).unwrap();
        assert_eq!(json["reason"], "CARDINALITY");
        assert_eq!(json["selected_bin"], "intBin2");
    }

    #[test]
    fn test_explain_deterministic() {
        let indexes = indexes();
        let selector = IndexSelector::new("test", &indexes);
        assert_eq!(
            selector.explain(&expr(), None).to_string(),
            selector.explain(&expr(), None).to_string()
        );
    }
}
