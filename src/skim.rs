//! The skim pipeline: open a source, drop unwanted fields, report the
//! cutflow, and write the rows passing every cut.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::SkimConfig;
use crate::cutflow::{CutflowReport, CutflowReporter};
use crate::error::{ConfigError, SkimError};
use crate::fields::FieldExclusionSet;
use crate::selection::SelectionSet;
use crate::store::{Destination, EventStore, SourceOpener, Tree};

/// The trees of an opened source and how it was reached.
#[derive(Debug)]
pub struct SourceTrees {
    pub location: String,
    pub strategy: &'static str,
    pub events: Tree,
    pub metadata: Tree,
}

/// Summary of a written artifact.
#[derive(Debug, Clone)]
pub struct SkimOutcome {
    pub destination: PathBuf,
    /// Location the source was actually opened from
    pub source: String,
    pub strategy: &'static str,
    pub cutflow: CutflowReport,
    /// Full selection applied to the events
    pub selection: String,
    pub rows_written: u64,
    pub metadata_rows: u64,
    pub excluded: BTreeSet<String>,
    pub bytes: u64,
}

/// Skims sources with one fixed configuration.
///
/// Configuration, selection and exclusions are loaded once and shared by
/// every run, so a single pipeline can serve a whole batch.
pub struct SkimPipeline {
    config: SkimConfig,
    selection: SelectionSet,
    exclusions: FieldExclusionSet,
    opener: SourceOpener,
}

impl SkimPipeline {
    pub fn new(config: SkimConfig, selection: SelectionSet, exclusions: FieldExclusionSet) -> Self {
        let opener = SourceOpener::from_config(&config);
        Self {
            config,
            selection,
            exclusions,
            opener,
        }
    }

    /// Load the selection document and the optional exclusion document.
    pub fn from_paths(
        config: SkimConfig,
        selection_path: &Path,
        exclusion_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let selection = SelectionSet::load(selection_path)?;
        let exclusions = FieldExclusionSet::load_optional(exclusion_path)?;
        info!(
            cuts = selection.len(),
            exclusions = exclusions.len(),
            "Loaded selection from {}",
            selection_path.display()
        );
        Ok(Self::new(config, selection, exclusions))
    }

    /// Replace the source opener (for testing).
    pub fn with_opener(mut self, opener: SourceOpener) -> Self {
        self.opener = opener;
        self
    }

    pub fn config(&self) -> &SkimConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn exclusions(&self) -> &FieldExclusionSet {
        &self.exclusions
    }

    /// Open `location` with fallback and take out the events and metadata trees.
    pub fn open(&self, location: &str) -> Result<SourceTrees, SkimError> {
        let mut opened = self.opener.open(location)?;
        let events = opened.file.take_tree(&self.config.trees.events)?;
        let metadata = opened.file.take_tree(&self.config.trees.metadata)?;
        info!(
            location = %opened.location,
            strategy = opened.strategy,
            entries = events.entries(),
            "Opened source"
        );
        Ok(SourceTrees {
            location: opened.location,
            strategy: opened.strategy,
            events,
            metadata,
        })
    }

    /// Cutflow of `location` without writing anything.
    pub fn cutflow(&self, location: &str) -> Result<CutflowReport, SkimError> {
        let (source, _) = self.prepare(location)?;
        self.report(&source)
    }

    /// Skim `location` into `destination`.
    ///
    /// Only opening the source is retried. Any later failure removes the
    /// partially written destination.
    pub fn run(&self, location: &str, destination: &Path) -> Result<SkimOutcome, SkimError> {
        let (source, excluded) = self.prepare(location)?;
        let cutflow = self.report(&source)?;

        let output_err = |source| SkimError::Output {
            path: destination.to_path_buf(),
            source,
        };
        let mut output = Destination::create(destination).map_err(output_err)?;
        output.write_histogram(&self.config.cutflow.name, cutflow.to_histogram());

        let selection = self.selection.full_expression();
        info!(selection = %selection, "Copying {}", self.config.trees.events);
        let events = source
            .events
            .copy_rows(&selection)
            .map_err(|err| SkimError::query("copying events", err))?;
        let rows_written = events.entries();
        output.write_tree(&self.config.trees.events, events);

        let metadata = source
            .metadata
            .copy_rows("")
            .map_err(|err| SkimError::query("copying metadata", err))?;
        let metadata_rows = metadata.entries();
        output.write_tree(&self.config.trees.metadata, metadata);

        let bytes = output.finalize().map_err(output_err)?;
        info!(
            rows = rows_written,
            of = source.events.entries(),
            "Skimmed {} into {}",
            source.location,
            destination.display()
        );

        Ok(SkimOutcome {
            destination: destination.to_path_buf(),
            source: source.location,
            strategy: source.strategy,
            cutflow,
            selection,
            rows_written,
            metadata_rows,
            excluded,
            bytes,
        })
    }

    /// Open the source and disable excluded fields.
    fn prepare(&self, location: &str) -> Result<(SourceTrees, BTreeSet<String>), SkimError> {
        let mut source = self.open(location)?;
        let excluded = self.exclusions.exclusions(&source.events.field_names());
        for field in &excluded {
            source.events.set_field_enabled(field, false)?;
        }
        if !excluded.is_empty() {
            info!("Excluding {} field(s)", excluded.len());
            debug!(fields = ?excluded, "Excluded fields");
        }
        Ok((source, excluded))
    }

    fn report(&self, source: &SourceTrees) -> Result<CutflowReport, SkimError> {
        CutflowReporter::new(&self.config.cutflow.weight_field)
            .report(&self.selection, &source.events)
            .map_err(|err| SkimError::query("computing the cutflow", err))
    }
}
