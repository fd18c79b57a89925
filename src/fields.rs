//! Regex-driven field exclusion.
//!
//! The exclusion document is a JSON object whose values are patterns. Keys
//! only label the patterns in error messages:
//!
//! ```json
//! { "raw": "_raw$", "trigger": "^HLT_" }
//! ```
//!
//! A field is excluded when any pattern matches anywhere in its name.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde_json::Value;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
struct Exclusion {
    key: String,
    pattern: Regex,
}

/// Compiled exclusion patterns. Empty means nothing is excluded.
#[derive(Debug, Clone, Default)]
pub struct FieldExclusionSet {
    exclusions: Vec<Exclusion>,
}

impl FieldExclusionSet {
    /// Compile (key, pattern) pairs.
    pub fn from_patterns<I, K, P>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let mut exclusions = Vec::new();
        for (key, pattern) in patterns {
            let key = key.into();
            let pattern = pattern.as_ref();
            let compiled = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                key: key.clone(),
                pattern: pattern.to_string(),
                source,
            })?;
            exclusions.push(Exclusion {
                key,
                pattern: compiled,
            });
        }
        Ok(Self { exclusions })
    }

    /// Compile the patterns of a parsed exclusion document.
    pub fn from_document(document: &Value) -> Result<Self, ConfigError> {
        let object = document.as_object().ok_or(ConfigError::NotAnObject {
            what: "Exclusion document",
        })?;
        let mut patterns = Vec::with_capacity(object.len());
        for (key, value) in object {
            let pattern = value
                .as_str()
                .ok_or_else(|| ConfigError::NotAPattern { key: key.clone() })?;
            patterns.push((key.clone(), pattern));
        }
        Self::from_patterns(patterns)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_document(&document)
    }

    /// Load `path` if given; no document excludes nothing.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.exclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exclusions.is_empty()
    }

    /// Keys of the configured patterns, in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.exclusions.iter().map(|e| e.key.as_str())
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.exclusions.iter().any(|e| e.pattern.is_match(field))
    }

    /// The subset of `fields` to exclude.
    pub fn exclusions<S: AsRef<str>>(&self, fields: &[S]) -> BTreeSet<String> {
        fields
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|field| self.is_excluded(field))
            .map(str::to_string)
            .collect()
    }
}
