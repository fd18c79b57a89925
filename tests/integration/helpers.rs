//! Shared fixtures and helpers for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use nanoskim::store::{Branch, EventFile, Tree};

/// Directory holding the JSON fixtures.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn load_fixture(name: &str) -> String {
    fs::read_to_string(fixture(name)).expect("Failed to read fixture")
}

/// Copy a fixture into a fresh temporary directory.
pub fn temp_fixture(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join(name);
    fs::copy(fixture(name), &path).expect("Failed to copy fixture");
    (dir, path)
}

/// Write a 1000-event sample: 600 pass `pt > 50`, 400 of those also pass
/// `abs(eta) < 2.4`. Weighted samples carry `genWeight` summing to 123.4.
pub fn write_scenario(dir: &Path, name: &str, weighted: bool) -> PathBuf {
    let pt = (0..1000).map(|i| if i < 600 { 65.0 } else { 35.0 }).collect();
    let eta = (0..1000)
        .map(|i| if i < 400 { 0.5 } else { 2.8 })
        .collect();
    let mut events = Tree::new()
        .with_branch("pt", Branch::Scalar(pt))
        .with_branch("eta", Branch::Scalar(eta))
        .with_branch("pt_raw", Branch::Scalar(vec![1.0; 1000]));
    if weighted {
        events.insert("genWeight", Branch::Scalar(vec![0.1234; 1000]));
    }

    let mut file = EventFile::default();
    file.trees.insert("Events".to_string(), events);
    file.trees.insert(
        "Runs".to_string(),
        Tree::new().with_branch("run", Branch::Scalar(vec![1.0])),
    );

    let path = dir.join(name);
    fs::write(&path, serde_json::to_string(&file).expect("serialize")).expect("write scenario");
    path
}

/// Selection document for [`write_scenario`].
pub fn write_scenario_cuts(dir: &Path) -> PathBuf {
    let path = dir.join("cuts.json");
    fs::write(&path, r#"{"ptCut": "pt > 50", "etaCut": "abs(eta) < 2.4"}"#)
        .expect("write cuts");
    path
}

/// Dataset document with a single dataset.
pub fn write_datasets(dir: &Path, key: &str, short_name: &str, files: &[String]) -> PathBuf {
    let document = serde_json::json!({
        key: { "short_name": short_name, "files": files }
    });
    let path = dir.join("datasets.json");
    fs::write(&path, document.to_string()).expect("write datasets");
    path
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}
