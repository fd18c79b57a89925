//! Named selection predicates in cut order.
//!
//! Loaded from a JSON object mapping cut names to boolean expressions:
//!
//! ```json
//! { "ptCut": "pt > 50", "etaCut": "abs(eta) < 2.4" }
//! ```
//!
//! Key order is the cut order. Expressions are opaque here; they are only
//! combined and handed to the event store.

mod expression;

pub use expression::CumulativeExpression;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// One named predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub expression: String,
}

/// Ordered, uniquely named predicates. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selections: Vec<Selection>,
}

impl SelectionSet {
    /// Build from (name, expression) pairs, rejecting repeated names.
    pub fn new<I, N, E>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (N, E)>,
        N: Into<String>,
        E: Into<String>,
    {
        let mut selections: Vec<Selection> = Vec::new();
        for (name, expression) in pairs {
            let name = name.into();
            if selections.iter().any(|s| s.name == name) {
                return Err(ConfigError::DuplicateSelection(name));
            }
            selections.push(Selection {
                name,
                expression: expression.into(),
            });
        }
        Ok(Self { selections })
    }

    /// Load a selection document from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content).map_err(|err| match err {
            ConfigError::Json { source, .. } => ConfigError::Json {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse a selection document.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let document: SelectionDocument =
            serde_json::from_str(content).map_err(|source| ConfigError::Json {
                path: "<string>".into(),
                source,
            })?;
        Self::new(document.0)
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Selection> {
        self.selections.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Selection> {
        self.selections.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.selections.iter().map(|s| s.name.as_str())
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a Selection;
    type IntoIter = std::slice::Iter<'a, Selection>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Raw document entries in file order, duplicates included.
///
/// A plain map would silently keep the last of two equal keys.
struct SelectionDocument(Vec<(String, String)>);

impl<'de> Deserialize<'de> for SelectionDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = SelectionDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping cut names to expression strings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, expression)) = map.next_entry::<String, String>()? {
                    entries.push((name, expression));
                }
                Ok(SelectionDocument(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
