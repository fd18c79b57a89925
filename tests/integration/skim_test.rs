//! Integration tests for the skim pipeline (library API)

use std::fs;

use tempfile::TempDir;

use nanoskim::config::EndpointConfig;
use nanoskim::cutflow::{NO_CUTS, SUM_GEN_WEIGHTS};
use nanoskim::store::{Branch, EventFile};
use nanoskim::{
    CutflowReport, FieldExclusionSet, SelectionSet, SkimConfig, SkimError, SkimPipeline,
};

use crate::helpers::{fixture, path_str, temp_fixture, write_scenario, write_scenario_cuts};

const GLOBAL: &str = "root://cms-xrd-global.cern.ch//";
const CACHE: &str = "root://cmsxcache.hep.wisc.edu//";

fn fixture_pipeline(config: SkimConfig) -> SkimPipeline {
    SkimPipeline::from_paths(
        config,
        &fixture("cuts.json"),
        Some(fixture("exclusions.json").as_path()),
    )
    .expect("fixture documents load")
}

fn labels(report: &CutflowReport) -> Vec<&str> {
    report.entries().iter().map(|e| e.label.as_str()).collect()
}

// ============================================================================
// Cutflow Scenario Tests
// ============================================================================

#[test]
fn scenario_cutflow_unweighted() {
    let dir = TempDir::new().unwrap();
    let source = write_scenario(dir.path(), "data.json", false);
    let cuts = write_scenario_cuts(dir.path());
    let pipeline = SkimPipeline::from_paths(SkimConfig::default(), &cuts, None).unwrap();

    let report = pipeline.cutflow(path_str(&source)).unwrap();
    assert_eq!(labels(&report), vec![NO_CUTS, "ptCut", "etaCut"]);
    let values: Vec<f64> = report.entries().iter().map(|e| e.value).collect();
    assert_eq!(values, vec![1000.0, 600.0, 400.0]);
}

#[test]
fn scenario_cutflow_weighted() {
    let dir = TempDir::new().unwrap();
    let source = write_scenario(dir.path(), "mc.json", true);
    let cuts = write_scenario_cuts(dir.path());
    let pipeline = SkimPipeline::from_paths(SkimConfig::default(), &cuts, None).unwrap();

    let report = pipeline.cutflow(path_str(&source)).unwrap();
    assert_eq!(labels(&report), vec![SUM_GEN_WEIGHTS, NO_CUTS, "ptCut", "etaCut"]);
    let sum = report.value(SUM_GEN_WEIGHTS).unwrap();
    assert!((sum - 123.4).abs() < 1e-9, "sum of weights was {sum}");
    assert_eq!(report.value("etaCut"), Some(400.0));
}

#[test]
fn scenario_skim_writes_surviving_rows() {
    let dir = TempDir::new().unwrap();
    let source = write_scenario(dir.path(), "mc.json", true);
    let cuts = write_scenario_cuts(dir.path());
    let exclusions = FieldExclusionSet::from_patterns([("raw", ".*_raw$")]).unwrap();
    let pipeline = SkimPipeline::new(
        SkimConfig::default(),
        SelectionSet::load(&cuts).unwrap(),
        exclusions,
    );

    let destination = dir.path().join("skims/mc_skim.json");
    let outcome = pipeline.run(path_str(&source), &destination).unwrap();
    assert_eq!(outcome.rows_written, 400);
    assert_eq!(outcome.excluded.len(), 1);

    let written = EventFile::read(&destination).unwrap();
    let events = written.tree("Events").unwrap();
    assert_eq!(
        events.branches().map(|(name, _)| name).collect::<Vec<_>>(),
        vec!["pt", "eta", "genWeight"]
    );
    assert!(written.histogram("cutflow").is_some());
}

// ============================================================================
// Fixture Round-Trip Tests
// ============================================================================

#[test]
fn mc_fixture_round_trip() {
    let (dir, source) = temp_fixture("mc_sample.json");
    let destination = dir.path().join("out.json");

    let outcome = fixture_pipeline(SkimConfig::default())
        .run(path_str(&source), &destination)
        .unwrap();
    assert_eq!(
        outcome.selection,
        "(pt > 50)&&(abs(eta) < 2.4)&&(len(Jet_pt) >= 1 && Jet_pt[0] > 30)"
    );

    let written = EventFile::read(&destination).unwrap();
    let events = written.tree("Events").unwrap();
    assert_eq!(events.branch("pt"), Some(&Branch::Scalar(vec![72.5, 88.1])));
    assert!(events.branch("pt_raw").is_none());
    assert!(events.branch("Jet_pt").is_none());
    let original = EventFile::read(&source).unwrap();
    assert_eq!(written.tree("Runs").unwrap(), original.tree("Runs").unwrap());

    let cutflow = CutflowReport::from_histogram(written.histogram("cutflow").unwrap());
    assert_eq!(cutflow.value(SUM_GEN_WEIGHTS), Some(8.0));
    assert_eq!(cutflow.value(NO_CUTS), Some(8.0));
    assert_eq!(cutflow.value("ptCut"), Some(5.0));
    assert_eq!(cutflow.value("etaCut"), Some(4.0));
    assert_eq!(cutflow.value("jetCut"), Some(2.0));
}

#[test]
fn data_fixture_has_unweighted_cutflow() {
    let (dir, source) = temp_fixture("data_sample.json");
    let destination = dir.path().join("out.json");

    let outcome = fixture_pipeline(SkimConfig::default())
        .run(path_str(&source), &destination)
        .unwrap();
    assert!(!outcome.cutflow.is_weighted());
    assert_eq!(outcome.cutflow.len(), 4);
    assert_eq!(outcome.rows_written, 2);
    assert_eq!(outcome.metadata_rows, 2);
}

#[test]
fn configured_tree_and_histogram_names_are_used() {
    let (dir, source) = temp_fixture("data_sample.json");
    let destination = dir.path().join("out.json");
    let config = SkimConfig::load(&fixture("skim.toml")).unwrap();

    fixture_pipeline(config)
        .run(path_str(&source), &destination)
        .unwrap();
    let written = EventFile::read(&destination).unwrap();
    assert!(written.histogram("selection").is_some());
    assert!(written.histogram("cutflow").is_none());
}

// ============================================================================
// Source Fallback Tests
// ============================================================================

#[test]
fn falls_back_to_mirrored_endpoint() {
    let mount = TempDir::new().unwrap();
    fs::create_dir_all(mount.path().join("store/mc")).unwrap();
    fs::copy(fixture("mc_sample.json"), mount.path().join("store/mc/sample.json")).unwrap();

    let mut config = SkimConfig::default();
    config.source.endpoints.push(EndpointConfig {
        prefix: CACHE.to_string(),
        mount: mount.path().to_path_buf(),
    });

    let out = TempDir::new().unwrap();
    let destination = out.path().join("out.json");
    let outcome = fixture_pipeline(config)
        .run(&format!("{GLOBAL}store/mc/sample.json"), &destination)
        .unwrap();

    assert_eq!(outcome.strategy, "federated");
    assert_eq!(outcome.source, format!("{CACHE}store/mc/sample.json"));
    assert!(destination.exists());
}

#[test]
fn exhausted_endpoints_leave_no_artifact() {
    let out = TempDir::new().unwrap();
    let destination = out.path().join("out.json");

    let err = fixture_pipeline(SkimConfig::default())
        .run(&format!("{GLOBAL}store/mc/missing.json"), &destination)
        .unwrap_err();

    let SkimError::SourceUnavailable(unavailable) = &err else {
        panic!("expected SourceUnavailable, got {err:?}");
    };
    // direct + federated on the location, federated on the cache rewrite
    assert_eq!(unavailable.failures.len(), 3);
    assert_eq!(err.exit_code(), 3);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn max_attempts_bounds_the_fallback_chain() {
    let mut config = SkimConfig::default();
    config.source.max_attempts = 1;

    let err = fixture_pipeline(config)
        .cutflow(&format!("{GLOBAL}store/mc/missing.json"))
        .unwrap_err();
    let SkimError::SourceUnavailable(unavailable) = &err else {
        panic!("expected SourceUnavailable, got {err:?}");
    };
    assert_eq!(unavailable.failures.len(), 1);
}
