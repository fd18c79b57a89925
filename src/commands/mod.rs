//! Subcommand handlers.

pub mod batch;
pub mod completions;
pub mod config;
pub mod inspect;
pub mod skim;

use nanoskim::cutflow::NO_CUTS;
use nanoskim::SkimOutcome;

/// One-line description of a written output.
pub fn describe(outcome: &SkimOutcome) -> String {
    let total = outcome.cutflow.value(NO_CUTS).unwrap_or_default();
    format!(
        "Wrote {} of {} events to {} ({}) from {} via {}",
        outcome.rows_written,
        total as u64,
        outcome.destination.display(),
        humansize::format_size(outcome.bytes, humansize::BINARY),
        outcome.source,
        outcome.strategy
    )
}
