//! Configuration and pipeline errors.

use std::path::PathBuf;

use crate::store::{SourceUnavailable, StoreError};

/// Process exit statuses for each failure class.
pub mod exit {
    pub const FAILURE: u8 = 1;
    pub const SOURCE_UNAVAILABLE: u8 = 3;
    pub const CONFIG: u8 = 4;
    pub const QUERY: u8 = 5;
}

/// Problems with a configuration document. Always raised before any output
/// is created.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to render configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Selection '{0}' is defined more than once")]
    DuplicateSelection(String),

    #[error("{what} must be a JSON object")]
    NotAnObject { what: &'static str },

    #[error("Exclusion '{key}' must be a string pattern")]
    NotAPattern { key: String },

    #[error("Exclusion '{key}' has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        key: String,
        pattern: String,
        source: regex::Error,
    },

    #[error("Dataset '{key}' not found (available: {})", available.join(", "))]
    UnknownDataset { key: String, available: Vec<String> },

    #[error("Dataset '{0}' lists no files")]
    EmptyDataset(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a skim run.
#[derive(Debug, thiserror::Error)]
pub enum SkimError {
    #[error(transparent)]
    SourceUnavailable(#[from] SourceUnavailable),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Query failed while {during}: {source}")]
    Query { during: String, source: StoreError },

    #[error("Failed to write {path}: {source}")]
    Output { path: PathBuf, source: StoreError },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SkimError {
    /// Wrap a store error raised while counting or copying.
    ///
    /// Expression errors keep their class; anything else raised mid-query is
    /// a plain store failure.
    pub fn query(during: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::Formula { .. } | StoreError::NotScalar(_) => SkimError::Query {
                during: during.into(),
                source,
            },
            other => SkimError::Store(other),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SkimError::SourceUnavailable(_) => exit::SOURCE_UNAVAILABLE,
            SkimError::Config(_) => exit::CONFIG,
            SkimError::Query { .. } => exit::QUERY,
            SkimError::Output { .. } | SkimError::Store(_) => exit::FAILURE,
        }
    }
}
