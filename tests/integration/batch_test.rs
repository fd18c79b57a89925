//! Integration tests for dataset batches (CLI)

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use nanoskim::batch::DatasetCatalog;

use crate::helpers::{fixture, path_str, write_datasets};

const KEY: &str = "/DYJetsToLL_M-50/RunIISummer20UL18NanoAODv9/NANOAODSIM";

/// Copy both samples into `dir` and list them, optionally with a missing
/// file at `gap`.
fn sources(dir: &Path, gap: Option<usize>) -> Vec<String> {
    let mut files: Vec<String> = ["mc_sample.json", "data_sample.json"]
        .iter()
        .map(|name| {
            let path = dir.join(name);
            fs::copy(fixture(name), &path).unwrap();
            path_str(&path).to_string()
        })
        .collect();
    if let Some(index) = gap {
        files.insert(index, path_str(&dir.join("missing.json")).to_string());
    }
    files
}

fn batch(datasets: &Path, destination: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nanoskim"));
    command
        .env_remove("RUST_LOG")
        .args(["batch", "--datasets", path_str(datasets)])
        .args(["--dataset-key", KEY])
        .args(["--cuts", path_str(&fixture("cuts.json"))])
        .args(["--destination", path_str(destination)]);
    command
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn catalog_keeps_document_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("datasets.json");
    fs::write(
        &path,
        r#"{
            "/ZZ/NANOAODSIM": {"short_name": "ZZ", "files": ["z.json"]},
            "/WW/NANOAODSIM": {"short_name": "WW", "files": ["w.json"]}
        }"#,
    )
    .unwrap();

    let catalog = DatasetCatalog::load(&path).unwrap();
    assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["/ZZ/NANOAODSIM", "/WW/NANOAODSIM"]);
    let (index, dataset) = catalog.select("/WW/NANOAODSIM").unwrap();
    assert_eq!(index, 1);
    assert_eq!(dataset.files, vec!["w.json"]);
}

// ============================================================================
// Batch Command Tests
// ============================================================================

#[test]
fn batch_skims_every_file() {
    let dir = TempDir::new().unwrap();
    let datasets = write_datasets(dir.path(), KEY, "DYJetsToLL", &sources(dir.path(), None));
    let out = dir.path().join("out");

    batch(&datasets, &out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skimmed 2 of 2 file(s)"));

    assert!(out.join("DYJetsToLL_0.json").exists());
    assert!(out.join("DYJetsToLL_1.json").exists());
}

#[test]
fn unknown_dataset_lists_available_keys() {
    let dir = TempDir::new().unwrap();
    let files = sources(dir.path(), None);
    let datasets = write_datasets(dir.path(), "/Other/NANOAOD", "Other", &files);

    batch(&datasets, &dir.path().join("out"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("available: /Other/NANOAOD"));
}

#[test]
fn empty_dataset_is_rejected() {
    let dir = TempDir::new().unwrap();
    let datasets = write_datasets(dir.path(), KEY, "DYJetsToLL", &[]);

    batch(&datasets, &dir.path().join("out"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("lists no files"));
}

#[test]
fn abort_stops_at_first_failure() {
    let dir = TempDir::new().unwrap();
    let datasets = write_datasets(dir.path(), KEY, "DYJetsToLL", &sources(dir.path(), Some(0)));
    let out = dir.path().join("out");

    batch(&datasets, &out)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("aborted"));

    assert!(!out.join("DYJetsToLL_1.json").exists());
    assert!(!out.join("DYJetsToLL_2.json").exists());
}

#[test]
fn continue_finishes_remaining_files() {
    let dir = TempDir::new().unwrap();
    let datasets = write_datasets(dir.path(), KEY, "DYJetsToLL", &sources(dir.path(), Some(1)));
    let out = dir.path().join("out");

    batch(&datasets, &out)
        .args(["--on-error", "continue"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("Skimmed 2 of 3 file(s)"))
        .stderr(predicate::str::contains("1 of 3 file(s) failed"));

    assert!(out.join("DYJetsToLL_0.json").exists());
    assert!(!out.join("DYJetsToLL_1.json").exists());
    assert!(out.join("DYJetsToLL_2.json").exists());
}

#[test]
fn config_file_sets_error_policy() {
    let dir = TempDir::new().unwrap();
    let datasets = write_datasets(dir.path(), KEY, "DYJetsToLL", &sources(dir.path(), Some(0)));
    let out = dir.path().join("out");

    batch(&datasets, &out)
        .args(["--config", path_str(&fixture("skim.toml"))])
        .assert()
        .code(1);

    assert!(out.join("DYJetsToLL_2.json").exists());
}

#[test]
fn parallel_batch_writes_every_output() {
    let dir = TempDir::new().unwrap();
    let datasets = write_datasets(dir.path(), KEY, "DYJetsToLL", &sources(dir.path(), None));
    let out = dir.path().join("out");

    batch(&datasets, &out).args(["--jobs", "2"]).assert().success();

    assert!(out.join("DYJetsToLL_0.json").exists());
    assert!(out.join("DYJetsToLL_1.json").exists());
}

#[test]
fn timestamped_batch_uses_run_directory() {
    let dir = TempDir::new().unwrap();
    let datasets = write_datasets(dir.path(), KEY, "DYJetsToLL", &sources(dir.path(), None));
    let out = dir.path().join("out");

    batch(&datasets, &out)
        .args(["--timestamped", "--suffix", "v2"])
        .assert()
        .success();

    let runs: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(runs.len(), 1);
    let name = runs[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("DYJetsToLL_"), "{name}");
    assert!(name.ends_with("_000_v2"), "{name}");
    assert!(runs[0].join("DYJetsToLL_0.json").exists());
}
