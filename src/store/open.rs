//! Opening event sources through an ordered chain of access strategies.
//!
//! Shared storage federations often expose the same file through several
//! endpoints, any of which may be down. [`SourceOpener`] tries:
//!
//! 1. every strategy on the location as given,
//! 2. the remote-capable strategies on each mirror rewrite of the location,
//!
//! stopping at the first attempt that yields a file containing all required
//! trees. The plan is bounded by `max_attempts`.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::file::EventFile;
use super::StoreError;
use crate::config::{EndpointConfig, SkimConfig};

/// A way of turning a location string into an event file.
pub trait OpenStrategy: Send + Sync {
    /// Name for logs and summaries.
    fn name(&self) -> &'static str;

    /// Whether the strategy understands endpoint URLs, and so is worth
    /// trying on mirror rewrites.
    fn remote(&self) -> bool {
        false
    }

    fn open(&self, location: &str) -> Result<EventFile, StoreError>;
}

/// Treat the location as a filesystem path.
#[derive(Debug, Clone, Default)]
pub struct DirectOpen;

impl DirectOpen {
    pub fn new() -> Self {
        Self
    }
}

impl OpenStrategy for DirectOpen {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn open(&self, location: &str) -> Result<EventFile, StoreError> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        if path.contains("://") {
            return Err(StoreError::NotLocal(location.to_string()));
        }
        EventFile::read(path)
    }
}

/// Resolve endpoint URLs through the directories they are mounted at.
///
/// `root://host//store/a.json` with an endpoint
/// `{ prefix = "root://host//", mount = "/hdfs/" }` reads `/hdfs/store/a.json`.
#[derive(Debug, Clone, Default)]
pub struct FederatedOpen {
    endpoints: Vec<EndpointConfig>,
}

impl FederatedOpen {
    pub fn new(endpoints: Vec<EndpointConfig>) -> Self {
        Self { endpoints }
    }

    /// Local path for `location`, if some endpoint serves it.
    pub fn resolve(&self, location: &str) -> Option<PathBuf> {
        self.endpoints.iter().find_map(|endpoint| {
            location
                .strip_prefix(endpoint.prefix.as_str())
                .map(|rest| endpoint.mount.join(rest.trim_start_matches('/')))
        })
    }
}

impl OpenStrategy for FederatedOpen {
    fn name(&self) -> &'static str {
        "federated"
    }

    fn remote(&self) -> bool {
        true
    }

    fn open(&self, location: &str) -> Result<EventFile, StoreError> {
        let path = self
            .resolve(location)
            .ok_or_else(|| StoreError::EndpointUnavailable(location.to_string()))?;
        debug!(location, path = %path.display(), "Resolved endpoint location");
        EventFile::read(path)
    }
}

/// Alternative spellings of `location` through mirrored endpoint prefixes.
///
/// Each group lists prefixes serving the same namespace. A location starting
/// with one prefix of a group is rewritten to every other prefix of it.
pub fn mirror_rewrites(location: &str, mirrors: &[Vec<String>]) -> Vec<String> {
    let mut rewrites: Vec<String> = Vec::new();
    for group in mirrors {
        let Some(prefix) = group.iter().find(|p| location.starts_with(p.as_str())) else {
            continue;
        };
        let rest = &location[prefix.len()..];
        for other in group.iter().filter(|p| *p != prefix) {
            let candidate = format!("{}{}", other, rest);
            if candidate != location && !rewrites.contains(&candidate) {
                rewrites.push(candidate);
            }
        }
    }
    rewrites
}

/// One planned open attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: &'static str,
    pub location: String,
}

/// Why one attempt failed.
#[derive(Debug)]
pub struct OpenFailure {
    pub strategy: &'static str,
    pub location: String,
    pub error: StoreError,
}

/// Every attempt to open a source failed.
#[derive(Debug)]
pub struct SourceUnavailable {
    pub location: String,
    pub failures: Vec<OpenFailure>,
}

impl fmt::Display for SourceUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not open '{}' after {} attempt(s)",
            self.location,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(
                f,
                "\n  {} {}: {}",
                failure.strategy, failure.location, failure.error
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for SourceUnavailable {}

/// A successfully opened source and how it was reached.
#[derive(Debug)]
pub struct OpenedSource {
    pub location: String,
    pub strategy: &'static str,
    pub file: EventFile,
}

/// Tries strategies in order until one produces a usable file.
pub struct SourceOpener {
    strategies: Vec<Box<dyn OpenStrategy>>,
    mirrors: Vec<Vec<String>>,
    required_trees: Vec<String>,
    max_attempts: usize,
}

impl SourceOpener {
    /// Direct then federated access, configured from `config`.
    pub fn from_config(config: &SkimConfig) -> Self {
        Self {
            strategies: vec![
                Box::new(DirectOpen::new()),
                Box::new(FederatedOpen::new(config.source.endpoints.clone())),
            ],
            mirrors: config.source.mirrors.clone(),
            required_trees: vec![
                config.trees.events.clone(),
                config.trees.metadata.clone(),
            ],
            max_attempts: config.source.max_attempts,
        }
    }

    /// Create with specific strategies (for testing).
    pub fn with_strategies(strategies: Vec<Box<dyn OpenStrategy>>) -> Self {
        Self {
            strategies,
            mirrors: Vec::new(),
            required_trees: Vec::new(),
            max_attempts: usize::MAX,
        }
    }

    pub fn mirrors(mut self, mirrors: Vec<Vec<String>>) -> Self {
        self.mirrors = mirrors;
        self
    }

    pub fn required_trees(mut self, trees: Vec<String>) -> Self {
        self.required_trees = trees;
        self
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// The ordered, bounded list of attempts for `location`.
    pub fn plan(&self, location: &str) -> Vec<Attempt> {
        self.planned(location)
            .into_iter()
            .map(|(index, location)| Attempt {
                strategy: self.strategies[index].name(),
                location,
            })
            .collect()
    }

    /// Open `location`, falling back through the plan.
    pub fn open(&self, location: &str) -> Result<OpenedSource, SourceUnavailable> {
        let mut failures = Vec::new();

        for (index, candidate) in self.planned(location) {
            let strategy = self.strategies[index].as_ref();
            match self.try_open(strategy, &candidate) {
                Ok(file) => {
                    if !failures.is_empty() {
                        info!(
                            location = %candidate,
                            strategy = strategy.name(),
                            "Opened source after {} failed attempt(s)",
                            failures.len()
                        );
                    }
                    return Ok(OpenedSource {
                        location: candidate,
                        strategy: strategy.name(),
                        file,
                    });
                }
                Err(error) => {
                    warn!(
                        location = %candidate,
                        strategy = strategy.name(),
                        "Failed to open source: {}",
                        error
                    );
                    failures.push(OpenFailure {
                        strategy: strategy.name(),
                        location: candidate,
                        error,
                    });
                }
            }
        }

        Err(SourceUnavailable {
            location: location.to_string(),
            failures,
        })
    }

    /// (strategy index, location) pairs in attempt order.
    fn planned(&self, location: &str) -> Vec<(usize, String)> {
        let mut plan: Vec<(usize, String)> = (0..self.strategies.len())
            .map(|index| (index, location.to_string()))
            .collect();

        for rewrite in mirror_rewrites(location, &self.mirrors) {
            for (index, strategy) in self.strategies.iter().enumerate() {
                if strategy.remote() {
                    plan.push((index, rewrite.clone()));
                }
            }
        }

        plan.truncate(self.max_attempts);
        plan
    }

    /// An attempt only counts if every required tree is present.
    fn try_open(
        &self,
        strategy: &dyn OpenStrategy,
        location: &str,
    ) -> Result<EventFile, StoreError> {
        let file = strategy.open(location)?;
        for tree in &self.required_trees {
            file.tree(tree)?;
        }
        Ok(file)
    }
}
