//! Skimming every file of a dataset.
//!
//! Datasets come from a JSON document keyed by dataset name:
//!
//! ```json
//! {
//!   "/DYJetsToLL_M-50/RunIISummer20UL18NanoAODv9/NANOAODSIM": {
//!     "short_name": "DYJetsToLL",
//!     "files": ["root://cmsxcache.hep.wisc.edu//store/mc/.../1.json"]
//!   }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::{BatchConfig, OnError};
use crate::error::{ConfigError, SkimError};
use crate::files::naming;
use crate::skim::{SkimOutcome, SkimPipeline};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dataset {
    pub short_name: String,
    pub files: Vec<String>,
}

/// Datasets in document order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DatasetCatalog {
    datasets: IndexMap<String, Dataset>,
}

impl DatasetCatalog {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Look up a dataset and its position in the document.
    pub fn select(&self, key: &str) -> Result<(usize, &Dataset), ConfigError> {
        let (index, _, dataset) = self.datasets.get_full(key).ok_or_else(|| {
            ConfigError::UnknownDataset {
                key: key.to_string(),
                available: self.datasets.keys().cloned().collect(),
            }
        })?;
        if dataset.files.is_empty() {
            return Err(ConfigError::EmptyDataset(key.to_string()));
        }
        Ok((index, dataset))
    }
}

/// One source and where its skim goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub index: usize,
    pub source: String,
    pub destination: PathBuf,
}

/// Pair each file with its numbered output in `directory`.
pub fn plan_jobs(short_name: &str, files: &[String], directory: &Path) -> Vec<BatchJob> {
    files
        .iter()
        .enumerate()
        .map(|(index, source)| BatchJob {
            index,
            source: source.clone(),
            destination: directory.join(naming::output_file_name(short_name, index, files.len())),
        })
        .collect()
}

#[derive(Debug)]
pub struct FailedFile {
    pub job: BatchJob,
    pub error: SkimError,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<SkimOutcome>,
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Runs a pipeline over many files.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    on_error: OnError,
    jobs: usize,
}

impl BatchRunner {
    pub fn new(on_error: OnError, jobs: usize) -> Self {
        Self {
            on_error,
            jobs: jobs.max(1),
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.on_error, config.jobs)
    }

    /// Skim every job.
    ///
    /// With [`OnError::Abort`] the first failure, in job order, is returned.
    /// With [`OnError::Continue`] failures are collected in the summary.
    pub fn run(
        &self,
        pipeline: &SkimPipeline,
        jobs: &[BatchJob],
    ) -> Result<BatchSummary, SkimError> {
        info!(files = jobs.len(), jobs = self.jobs, "Starting batch");
        if self.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build();
            match pool {
                Ok(pool) => return self.run_parallel(&pool, pipeline, jobs),
                Err(err) => warn!(
                    "Could not start {} workers, running sequentially: {}",
                    self.jobs, err
                ),
            }
        }
        self.run_sequential(pipeline, jobs)
    }

    fn run_sequential(
        &self,
        pipeline: &SkimPipeline,
        jobs: &[BatchJob],
    ) -> Result<BatchSummary, SkimError> {
        let mut summary = BatchSummary::default();
        for job in jobs {
            let result = run_job(pipeline, job, jobs.len());
            self.record(&mut summary, job, result)?;
        }
        Ok(summary)
    }

    fn run_parallel(
        &self,
        pool: &rayon::ThreadPool,
        pipeline: &SkimPipeline,
        jobs: &[BatchJob],
    ) -> Result<BatchSummary, SkimError> {
        let results: Vec<Result<SkimOutcome, SkimError>> = pool.install(|| {
            jobs.par_iter()
                .map(|job| run_job(pipeline, job, jobs.len()))
                .collect()
        });

        let mut summary = BatchSummary::default();
        for (job, result) in jobs.iter().zip(results) {
            self.record(&mut summary, job, result)?;
        }
        Ok(summary)
    }

    fn record(
        &self,
        summary: &mut BatchSummary,
        job: &BatchJob,
        result: Result<SkimOutcome, SkimError>,
    ) -> Result<(), SkimError> {
        match result {
            Ok(outcome) => summary.succeeded.push(outcome),
            Err(err) if self.on_error == OnError::Abort => return Err(err),
            Err(err) => summary.failed.push(FailedFile {
                job: job.clone(),
                error: err,
            }),
        }
        Ok(())
    }
}

fn run_job(
    pipeline: &SkimPipeline,
    job: &BatchJob,
    total: usize,
) -> Result<SkimOutcome, SkimError> {
    info!("Processing file {} of {}: {}", job.index + 1, total, job.source);
    let result = pipeline.run(&job.source, &job.destination);
    if let Err(err) = &result {
        error!(source = %job.source, "Skim failed: {}", err);
    }
    result
}
