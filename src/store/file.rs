//! Event file format: named trees of columnar branches plus labeled histograms.
//!
//! ```json
//! {
//!   "trees": {
//!     "Events": { "branches": {
//!       "pt": { "scalar": [61.2, 48.0] },
//!       "Jet_pt": { "array": [[45.1], []] }
//!     } },
//!     "Runs": { "branches": { "run": { "scalar": [1] } } }
//!   },
//!   "histograms": {
//!     "cutflow": { "bins": [{ "label": "No Cuts", "content": 2.0 }] }
//!   }
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::formula::Formula;
use super::{EventStore, StoreError};

/// One column of a tree: a number per row, or a variable-length array per row.
///
/// The kind is stored with the values, so a branch with no rows keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Scalar(Vec<f64>),
    Array(Vec<Vec<f64>>),
}

impl Branch {
    /// Number of rows in the branch.
    pub fn len(&self) -> usize {
        match self {
            Branch::Scalar(values) => values.len(),
            Branch::Array(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Branch::Array(_))
    }

    /// Whether every value is a finite number.
    pub fn is_finite(&self) -> bool {
        match self {
            Branch::Scalar(values) => values.iter().all(|v| v.is_finite()),
            Branch::Array(values) => values.iter().flatten().all(|v| v.is_finite()),
        }
    }

    /// A new branch holding only `rows`, in the given order.
    pub fn take(&self, rows: &[usize]) -> Branch {
        match self {
            Branch::Scalar(values) => Branch::Scalar(rows.iter().map(|&r| values[r]).collect()),
            Branch::Array(values) => {
                Branch::Array(rows.iter().map(|&r| values[r].clone()).collect())
            }
        }
    }
}

/// A table of equally long branches. Branch order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTree")]
pub struct Tree {
    #[serde(default)]
    branches: IndexMap<String, Branch>,
    #[serde(skip)]
    disabled: HashSet<String>,
}

/// Tree as read from disk, before each branch is checked on its own.
#[derive(Deserialize)]
struct RawTree {
    #[serde(default)]
    branches: IndexMap<String, serde_json::Value>,
}

impl TryFrom<RawTree> for Tree {
    type Error = String;

    fn try_from(raw: RawTree) -> Result<Self, Self::Error> {
        let mut tree = Tree::new();
        for (name, value) in raw.branches {
            let branch: Branch = serde_json::from_value(value)
                .map_err(|err| format!("branch '{name}' is malformed: {err}"))?;
            tree.insert(name, branch);
        }
        Ok(tree)
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with_branch(mut self, name: impl Into<String>, branch: Branch) -> Self {
        self.insert(name, branch);
        self
    }

    /// Insert or replace a branch.
    pub fn insert(&mut self, name: impl Into<String>, branch: Branch) {
        self.branches.insert(name.into(), branch);
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, &Branch)> {
        self.branches.iter().map(|(name, branch)| (name.as_str(), branch))
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.branches.contains_key(name) && !self.disabled.contains(name)
    }

    /// Check that every branch has the same number of rows.
    pub fn validate(&self, tree: &str) -> Result<(), StoreError> {
        let mut branches = self.branches.iter();
        let Some((_, first)) = branches.next() else {
            return Ok(());
        };
        let expected = first.len();
        for (name, branch) in branches {
            if branch.len() != expected {
                return Err(StoreError::BranchLength {
                    tree: tree.to_string(),
                    branch: name.clone(),
                    found: branch.len(),
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Compile a selection against this tree's columns.
    pub fn compile(&self, selection: &str) -> Result<Formula<'_>, StoreError> {
        Formula::compile(selection, |name| self.branches.get(name)).map_err(|source| {
            StoreError::Formula {
                expression: selection.to_string(),
                source,
            }
        })
    }

    fn passing_rows(&self, selection: &str) -> Result<Vec<usize>, StoreError> {
        let formula = self.compile(selection)?;
        Ok((0..self.row_count()).filter(|&row| formula.matches(row)).collect())
    }

    fn row_count(&self) -> usize {
        self.branches.values().next().map_or(0, Branch::len)
    }
}

impl EventStore for Tree {
    fn entries(&self) -> u64 {
        self.row_count() as u64
    }

    fn field_names(&self) -> Vec<String> {
        self.branches.keys().cloned().collect()
    }

    fn scalars(&self, field: &str) -> Result<&[f64], StoreError> {
        match self.branches.get(field) {
            Some(Branch::Scalar(values)) => Ok(values.as_slice()),
            Some(Branch::Array(_)) => Err(StoreError::NotScalar(field.to_string())),
            None => Err(StoreError::MissingField(field.to_string())),
        }
    }

    fn count(&self, selection: &str) -> Result<u64, StoreError> {
        if selection.trim().is_empty() {
            return Ok(self.entries());
        }
        let formula = self.compile(selection)?;
        let passing = (0..self.row_count()).filter(|&row| formula.matches(row)).count();
        Ok(passing as u64)
    }

    fn set_field_enabled(&mut self, field: &str, enabled: bool) -> Result<(), StoreError> {
        if !self.branches.contains_key(field) {
            return Err(StoreError::MissingField(field.to_string()));
        }
        if enabled {
            self.disabled.remove(field);
        } else {
            self.disabled.insert(field.to_string());
        }
        Ok(())
    }

    fn copy_rows(&self, selection: &str) -> Result<Tree, StoreError> {
        let rows = self.passing_rows(selection)?;
        let mut copy = Tree::new();
        for (name, branch) in &self.branches {
            if self.disabled.contains(name) {
                continue;
            }
            copy.insert(name.clone(), branch.take(&rows));
        }
        debug!(
            rows = rows.len(),
            branches = copy.branches.len(),
            "Copied rows matching selection"
        );
        Ok(copy)
    }
}

/// One labeled bin of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub label: String,
    pub content: f64,
}

/// An ordered list of labeled bins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    #[serde(default)]
    pub bins: Vec<Bin>,
}

impl Histogram {
    pub fn push(&mut self, label: impl Into<String>, content: f64) {
        self.bins.push(Bin {
            label: label.into(),
            content,
        });
    }
}

/// Complete event file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFile {
    #[serde(default)]
    pub trees: IndexMap<String, Tree>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub histograms: IndexMap<String, Histogram>,
}

impl EventFile {
    /// Read and validate an event file from disk.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: EventFile =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                StoreError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Parse from a string (tests and fixtures).
    pub fn parse_str(content: &str) -> Result<Self, StoreError> {
        let parsed: EventFile =
            serde_json::from_str(content).map_err(|source| StoreError::Parse {
                path: PathBuf::from("<string>"),
                source,
            })?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        for (name, tree) in &self.trees {
            tree.validate(name)?;
        }
        Ok(())
    }

    pub fn tree(&self, name: &str) -> Result<&Tree, StoreError> {
        self.trees
            .get(name)
            .ok_or_else(|| StoreError::MissingTree(name.to_string()))
    }

    /// Remove a tree from the file and hand over ownership.
    pub fn take_tree(&mut self, name: &str) -> Result<Tree, StoreError> {
        self.trees
            .shift_remove(name)
            .ok_or_else(|| StoreError::MissingTree(name.to_string()))
    }

    pub fn histogram(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    /// The first branch or bin holding NaN or an infinity, as
    /// `tree/branch` or `histogram/label`. JSON has no spelling for those.
    pub fn first_non_finite(&self) -> Option<String> {
        let branches = self.trees.iter().flat_map(|(tree, contents)| {
            contents
                .branches
                .iter()
                .filter(|(_, branch)| !branch.is_finite())
                .map(move |(name, _)| format!("{tree}/{name}"))
        });
        let bins = self.histograms.iter().flat_map(|(histogram, contents)| {
            contents
                .bins
                .iter()
                .filter(|bin| !bin.content.is_finite())
                .map(move |bin| format!("{histogram}/{}", bin.label))
        });
        branches.chain(bins).next()
    }

    /// Serialize to a writer.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer(writer, self)
    }
}

/// An output artifact under construction.
///
/// Content is staged in a temporary file next to the final path and only
/// moved into place by [`Destination::finalize`]. Dropping an unfinished
/// destination removes the staged file, so a failed run never leaves an
/// artifact behind. Finalizing replaces any existing file at the path.
#[derive(Debug)]
pub struct Destination {
    path: PathBuf,
    staged: NamedTempFile,
    contents: EventFile,
}

impl Destination {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&parent).map_err(write_err)?;
        let staged = NamedTempFile::new_in(&parent).map_err(write_err)?;
        debug!(path = %path.display(), staged = %staged.path().display(), "Created destination");
        Ok(Self {
            path,
            staged,
            contents: EventFile::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a histogram, replacing any previous one with the same name.
    pub fn write_histogram(&mut self, name: &str, histogram: Histogram) {
        self.contents.histograms.insert(name.to_string(), histogram);
    }

    /// Store a tree, replacing any previous one with the same name.
    pub fn write_tree(&mut self, name: &str, tree: Tree) {
        self.contents.trees.insert(name.to_string(), tree);
    }

    /// Flush everything and move the artifact into place.
    ///
    /// Returns the number of bytes written.
    pub fn finalize(mut self) -> Result<u64, StoreError> {
        let path = self.path.clone();
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };

        if let Some(location) = self.contents.first_non_finite() {
            return Err(write_err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("'{location}' holds a value that is not a finite number"),
            )));
        }

        {
            let mut writer = BufWriter::new(self.staged.as_file_mut());
            self.contents
                .write_to(&mut writer)
                .map_err(|err| write_err(err.into()))?;
            writer.flush().map_err(write_err)?;
        }
        self.staged.as_file().sync_all().map_err(write_err)?;
        let bytes = self
            .staged
            .as_file()
            .metadata()
            .map_err(write_err)?
            .len();

        self.staged
            .persist(&self.path)
            .map_err(|err| write_err(err.error))?;
        info!(
            path = %self.path.display(),
            size = %humansize::format_size(bytes, humansize::BINARY),
            "Wrote output"
        );
        Ok(bytes)
    }
}
