//! Dataset batch handler

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;

use nanoskim::batch::{plan_jobs, BatchRunner, DatasetCatalog};
use nanoskim::cli::BatchArgs;
use nanoskim::files::naming;
use nanoskim::{SkimConfig, SkimPipeline};

/// Skim every file of the selected dataset.
///
/// Command-line `--on-error` and `--jobs` override the configuration.
#[cfg(not(tarpaulin_include))]
pub fn handle(config_path: Option<&Path>, args: BatchArgs) -> Result<()> {
    let mut config = SkimConfig::load_or_default(config_path)?;
    if let Some(on_error) = args.on_error {
        config.batch.on_error = on_error;
    }
    if let Some(jobs) = args.jobs {
        config.batch.jobs = jobs;
    }
    config.validate()?;

    let catalog = DatasetCatalog::load(&args.datasets)?;
    let (key_index, dataset) = catalog.select(&args.dataset_key)?;

    let directory = if args.timestamped {
        args.destination.join(naming::run_directory_name(
            &dataset.short_name,
            key_index,
            args.suffix.as_deref(),
            &Local::now(),
        ))
    } else {
        args.destination.clone()
    };

    let runner = BatchRunner::from_config(&config.batch);
    let pipeline = SkimPipeline::from_paths(config, &args.cuts, args.exclusions.as_deref())?;
    let jobs = plan_jobs(&dataset.short_name, &dataset.files, &directory);

    let summary = runner
        .run(&pipeline, &jobs)
        .with_context(|| format!("Batch for {} aborted", args.dataset_key))?;

    for outcome in &summary.succeeded {
        println!("ok    {}", super::describe(outcome));
    }
    for failed in &summary.failed {
        println!("FAIL  {}: {}", failed.job.source, failed.error);
    }
    println!(
        "Skimmed {} of {} file(s) into {}",
        summary.succeeded.len(),
        summary.total(),
        directory.display()
    );

    if !summary.is_success() {
        bail!(
            "{} of {} file(s) failed",
            summary.failed.len(),
            summary.total()
        );
    }
    Ok(())
}
