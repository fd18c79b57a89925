//! Per-stage survival counts for a selection.
//!
//! A report starts with the optional sum of generator weights and the
//! unconditional row count, followed by one count per cumulative stage.

use std::fmt;

use tracing::info;

use crate::selection::SelectionSet;
use crate::store::{EventStore, Histogram, StoreError};

/// Label of the generator weight sum, present only for simulated samples.
pub const SUM_GEN_WEIGHTS: &str = "Sum of Gen Weights";

/// Label of the unconditional row count.
pub const NO_CUTS: &str = "No Cuts";

#[derive(Debug, Clone, PartialEq)]
pub struct CutflowEntry {
    pub label: String,
    pub value: f64,
}

/// Ordered (label, value) entries. Counts never increase after "No Cuts".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutflowReport {
    entries: Vec<CutflowEntry>,
}

impl CutflowReport {
    pub fn entries(&self) -> &[CutflowEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the report carries a generator weight sum.
    pub fn is_weighted(&self) -> bool {
        self.entries
            .first()
            .is_some_and(|entry| entry.label == SUM_GEN_WEIGHTS)
    }

    pub fn value(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.value)
    }

    /// Count after the last stage, or the total when there are no stages.
    pub fn final_count(&self) -> Option<f64> {
        self.entries
            .last()
            .filter(|entry| entry.label != SUM_GEN_WEIGHTS)
            .map(|entry| entry.value)
    }

    pub fn to_histogram(&self) -> Histogram {
        let mut histogram = Histogram::default();
        for entry in &self.entries {
            histogram.push(entry.label.clone(), entry.value);
        }
        histogram
    }

    /// Rebuild a report from a histogram written by [`Self::to_histogram`].
    pub fn from_histogram(histogram: &Histogram) -> Self {
        Self {
            entries: histogram
                .bins
                .iter()
                .map(|bin| CutflowEntry {
                    label: bin.label.clone(),
                    value: bin.content,
                })
                .collect(),
        }
    }

    fn push(&mut self, label: impl Into<String>, value: f64) {
        self.entries.push(CutflowEntry {
            label: label.into(),
            value,
        });
    }
}

impl fmt::Display for CutflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.value(NO_CUTS);
        let weighted = self.is_weighted();

        let rows: Vec<(&str, String, String)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                if weighted && index == 0 {
                    let sum = format!("{:.3}", entry.value);
                    return (entry.label.as_str(), sum, String::new());
                }
                let efficiency = match total {
                    Some(total) if total > 0.0 => format!("{:.2}%", 100.0 * entry.value / total),
                    _ => "-".to_string(),
                };
                (entry.label.as_str(), format!("{:.0}", entry.value), efficiency)
            })
            .collect();

        let label_width = rows.iter().map(|row| row.0.len()).max().unwrap_or(0).max(3);
        let value_width = rows.iter().map(|row| row.1.len()).max().unwrap_or(0).max(6);
        let efficiency_width = rows.iter().map(|row| row.2.len()).max().unwrap_or(0).max(10);

        write!(
            f,
            "{:<lw$}  {:>vw$}  {:>ew$}",
            "Cut",
            "Events",
            "Efficiency",
            lw = label_width,
            vw = value_width,
            ew = efficiency_width
        )?;
        for (label, value, efficiency) in &rows {
            let line = format!(
                "{:<lw$}  {:>vw$}  {:>ew$}",
                label,
                value,
                efficiency,
                lw = label_width,
                vw = value_width,
                ew = efficiency_width
            );
            write!(f, "\n{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// Computes a [`CutflowReport`] by counting each cumulative stage.
#[derive(Debug, Clone)]
pub struct CutflowReporter {
    weight_field: String,
}

impl CutflowReporter {
    pub fn new(weight_field: impl Into<String>) -> Self {
        Self {
            weight_field: weight_field.into(),
        }
    }

    /// Count `store` rows through every stage of `selection`.
    ///
    /// A missing weight field means the sample is not simulated and yields
    /// the unweighted shape. Every other store error is returned.
    pub fn report<S>(
        &self,
        selection: &SelectionSet,
        store: &S,
    ) -> Result<CutflowReport, StoreError>
    where
        S: EventStore + ?Sized,
    {
        let mut report = CutflowReport::default();

        match store.scalars(&self.weight_field) {
            Ok(weights) => report.push(SUM_GEN_WEIGHTS, weights.iter().sum()),
            Err(StoreError::MissingField(_)) => {
                info!(
                    field = %self.weight_field,
                    "Generator weight not available, perhaps this is data"
                );
            }
            Err(err) => return Err(err),
        }

        report.push(NO_CUTS, store.entries() as f64);

        for (name, stage) in selection.stages() {
            info!(stage = stage.stage, cut = name, "Counting {}", stage.expression);
            let passing = store.count(&stage.expression)?;
            report.push(name, passing as f64);
        }

        Ok(report)
    }
}
