//! Event storage: the columnar file format, its selection formula engine,
//! and opening sources through a chain of access strategies.
//!
//! Everything above this module talks to data through [`EventStore`] and
//! treats selection expressions as opaque strings.

pub mod file;
pub mod formula;
pub mod open;

use std::path::PathBuf;

pub use file::{Bin, Branch, Destination, EventFile, Histogram, Tree};
pub use formula::{Formula, FormulaError};
pub use open::{
    mirror_rewrites, Attempt, DirectOpen, FederatedOpen, OpenFailure, OpenStrategy, OpenedSource,
    SourceOpener, SourceUnavailable,
};

/// Capabilities the skim needs from a table of events.
///
/// Selections are boolean expression strings; an empty string selects
/// every row.
pub trait EventStore {
    /// Total number of rows.
    fn entries(&self) -> u64;

    /// Names of all fields, enabled or not, in schema order.
    fn field_names(&self) -> Vec<String>;

    /// Per-row values of a scalar field.
    fn scalars(&self, field: &str) -> Result<&[f64], StoreError>;

    /// Number of rows for which `selection` holds.
    fn count(&self, selection: &str) -> Result<u64, StoreError>;

    /// Enable or disable a field for copying. Disabled fields can still be
    /// used in selections.
    fn set_field_enabled(&mut self, field: &str, enabled: bool) -> Result<(), StoreError>;

    /// A new table holding the rows matching `selection`, with enabled
    /// fields only.
    fn copy_rows(&self, selection: &str) -> Result<Tree, StoreError>;
}

/// Errors from reading, querying, or writing event data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse event file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Tree '{0}' not found")]
    MissingTree(String),

    #[error("Field '{0}' not found")]
    MissingField(String),

    #[error("Field '{0}' holds arrays, expected one value per row")]
    NotScalar(String),

    #[error("Branch '{branch}' of tree '{tree}' has {found} entries, expected {expected}")]
    BranchLength {
        tree: String,
        branch: String,
        found: usize,
        expected: usize,
    },

    #[error("Cannot evaluate '{expression}': {source}")]
    Formula {
        expression: String,
        source: FormulaError,
    },

    #[error("No endpoint configured for '{0}'")]
    EndpointUnavailable(String),

    #[error("'{0}' is a remote location, not a local path")]
    NotLocal(String),
}
