//! nanoskim: skim columnar event files down to the rows passing a sequence
//! of named cuts, with a per-stage cutflow report.

pub mod batch;
pub mod cli;
pub mod config;
pub mod cutflow;
pub mod error;
pub mod fields;
pub mod files;
pub mod selection;
pub mod skim;
pub mod store;

pub use batch::{BatchRunner, BatchSummary, DatasetCatalog};
pub use config::{OnError, SkimConfig};
pub use cutflow::{CutflowReport, CutflowReporter};
pub use error::{ConfigError, SkimError};
pub use fields::FieldExclusionSet;
pub use selection::SelectionSet;
pub use skim::{SkimOutcome, SkimPipeline};
pub use store::{EventStore, StoreError};
