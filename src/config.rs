//! Skim configuration.
//!
//! Loaded from an optional TOML file passed with `--config`. Every field has
//! a default, so an empty file (or no file) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Mirrored endpoints of the CMS data federation.
const GLOBAL_REDIRECTOR: &str = "root://cms-xrd-global.cern.ch//";
const WISCONSIN_CACHE: &str = "root://cmsxcache.hep.wisc.edu//";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkimConfig {
    pub trees: TreesConfig,
    pub cutflow: CutflowConfig,
    pub source: SourceConfig,
    pub batch: BatchConfig,
}

/// Names of the trees read from sources and written to outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreesConfig {
    /// Per-event tree, filtered by the selection
    pub events: String,
    /// Per-run bookkeeping tree, copied in full
    pub metadata: String,
}

impl Default for TreesConfig {
    fn default() -> Self {
        Self {
            events: "Events".to_string(),
            metadata: "Runs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutflowConfig {
    /// Histogram name in the output
    pub name: String,
    /// Per-event generator weight; summed when present
    pub weight_field: String,
}

impl Default for CutflowConfig {
    fn default() -> Self {
        Self {
            name: "cutflow".to_string(),
            weight_field: "genWeight".to_string(),
        }
    }
}

/// An endpoint prefix served through a local mount point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub prefix: String,
    pub mount: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Upper bound on open attempts per source
    pub max_attempts: usize,
    /// Groups of equivalent endpoint prefixes
    pub mirrors: Vec<Vec<String>>,
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            mirrors: vec![vec![
                GLOBAL_REDIRECTOR.to_string(),
                WISCONSIN_CACHE.to_string(),
            ]],
            endpoints: Vec::new(),
        }
    }
}

/// What a batch does when one file fails.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Stop the batch at the first failure
    #[default]
    Abort,
    /// Record the failure and move on to the next file
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub on_error: OnError,
    /// Files processed at once; 1 keeps the batch sequential
    pub jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            on_error: OnError::Abort,
            jobs: 1,
        }
    }
}

impl SkimConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SkimConfig = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trees.events.is_empty() || self.trees.metadata.is_empty() {
            return Err(ConfigError::Invalid("tree names must not be empty".into()));
        }
        if self.trees.events == self.trees.metadata {
            return Err(ConfigError::Invalid(format!(
                "events and metadata trees must differ (both are '{}')",
                self.trees.events
            )));
        }
        if self.cutflow.name.is_empty() {
            return Err(ConfigError::Invalid("cutflow name must not be empty".into()));
        }
        if self.source.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "source.max_attempts must be at least 1".into(),
            ));
        }
        if self.batch.jobs == 0 {
            return Err(ConfigError::Invalid("batch.jobs must be at least 1".into()));
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
