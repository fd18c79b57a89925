//! Cumulative selection expressions.
//!
//! Stage `k` is the conjunction of the first `k` predicates. Stages are
//! computed on demand from the set and never cached.

use super::SelectionSet;

/// The AND of a prefix of a [`SelectionSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeExpression {
    /// Number of predicates combined, after clamping to the set size.
    pub stage: usize,
    pub expression: String,
}

impl SelectionSet {
    /// Expression selecting rows that pass the first `stage` predicates.
    ///
    /// Stage 0 is the empty expression, which selects everything. A single
    /// predicate is returned as written. Longer prefixes parenthesize each
    /// predicate and join them with `&&`. Stages past the end are clamped.
    pub fn expression(&self, stage: usize) -> String {
        let stage = stage.min(self.len());
        match stage {
            0 => String::new(),
            1 => self.selections[0].expression.clone(),
            _ => self.selections[..stage]
                .iter()
                .map(|s| format!("({})", s.expression))
                .collect::<Vec<_>>()
                .join("&&"),
        }
    }

    /// Expression for every predicate.
    pub fn full_expression(&self) -> String {
        self.expression(self.len())
    }

    pub fn cumulative(&self, stage: usize) -> CumulativeExpression {
        let stage = stage.min(self.len());
        CumulativeExpression {
            stage,
            expression: self.expression(stage),
        }
    }

    /// Stages `1..=len` paired with the name of the predicate each adds.
    pub fn stages(&self) -> impl Iterator<Item = (&str, CumulativeExpression)> + '_ {
        self.selections
            .iter()
            .enumerate()
            .map(move |(index, selection)| (selection.name.as_str(), self.cumulative(index + 1)))
    }
}
