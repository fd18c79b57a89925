//! Integration tests for the nanoskim CLI

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::helpers::{fixture, load_fixture, path_str, temp_fixture};

fn nanoskim() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nanoskim"));
    command.env_remove("RUST_LOG");
    command
}

// ============================================================================
// Help Output Tests
// ============================================================================

#[test]
fn help_lists_subcommands() {
    nanoskim()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("skim"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("cutflow"))
        .stdout(predicate::str::contains("expression"));
}

#[test]
fn version_names_the_package() {
    nanoskim()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("nanoskim 0.1.0"));
}

#[test]
fn skim_without_arguments_is_a_usage_error() {
    nanoskim()
        .arg("skim")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("required arguments"));
}

// ============================================================================
// Skim Command Tests
// ============================================================================

#[test]
fn skim_prints_cutflow_and_summary() {
    let (dir, source) = temp_fixture("mc_sample.json");
    let output = dir.path().join("out.json");

    nanoskim()
        .args(["skim", "--input", path_str(&source)])
        .args(["--cuts", path_str(&fixture("cuts.json"))])
        .args(["--exclusions", path_str(&fixture("exclusions.json"))])
        .args(["--output", path_str(&output)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sum of Gen Weights"))
        .stdout(predicate::str::contains("jetCut"))
        .stdout(predicate::str::contains("Excluded 2 field(s)"))
        .stdout(predicate::str::contains("Wrote 2 of 8 events"))
        .stderr(predicate::str::contains("Opened source"));

    assert!(output.exists());
}

#[test]
fn skim_quiet_suppresses_progress_logs() {
    let (dir, source) = temp_fixture("data_sample.json");
    let output = dir.path().join("out.json");

    nanoskim()
        .args(["-q", "skim", "--input", path_str(&source)])
        .args(["--cuts", path_str(&fixture("cuts.json"))])
        .args(["--output", path_str(&output)])
        .assert()
        .success()
        .stderr(predicate::str::contains("Opened source").not());
}

#[test]
fn unreachable_source_exits_3_without_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.json");

    nanoskim()
        .args(["skim", "--input", "root://cms-xrd-global.cern.ch//store/mc/missing.json"])
        .args(["--cuts", path_str(&fixture("cuts.json"))])
        .args(["--output", path_str(&output)])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Could not open"))
        .stderr(predicate::str::contains("root://cmsxcache.hep.wisc.edu//store/mc/missing.json"));

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn malformed_exclusion_pattern_exits_4() {
    let (dir, source) = temp_fixture("mc_sample.json");
    let output = dir.path().join("out.json");

    nanoskim()
        .args(["skim", "--input", path_str(&source)])
        .args(["--cuts", path_str(&fixture("cuts.json"))])
        .args(["--exclusions", path_str(&fixture("bad_exclusions.json"))])
        .args(["--output", path_str(&output)])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("pt_(raw"));

    assert!(!output.exists());
}

#[test]
fn duplicate_cut_names_exit_4() {
    let (dir, source) = temp_fixture("mc_sample.json");

    nanoskim()
        .args(["skim", "--input", path_str(&source)])
        .args(["--cuts", path_str(&fixture("duplicate_cuts.json"))])
        .args(["--output", path_str(&dir.path().join("out.json"))])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("'ptCut' is defined more than once"));
}

#[test]
fn invalid_expression_exits_5_and_shows_it() {
    let (dir, source) = temp_fixture("mc_sample.json");
    let output = dir.path().join("out.json");

    nanoskim()
        .args(["skim", "--input", path_str(&source)])
        .args(["--cuts", path_str(&fixture("bad_cuts.json"))])
        .args(["--output", path_str(&output)])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("(pt > 50)&&(abs(eta) <)"));

    assert!(!output.exists());
}

// ============================================================================
// Read-only Command Tests
// ============================================================================

#[test]
fn cutflow_command_writes_nothing() {
    let (dir, source) = temp_fixture("data_sample.json");

    nanoskim()
        .args(["cutflow", "--input", path_str(&source)])
        .args(["--cuts", path_str(&fixture("cuts.json"))])
        .assert()
        .success()
        .stdout(predicate::str::contains("No Cuts"))
        .stdout(predicate::str::contains("Sum of Gen Weights").not());

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn expression_lists_every_stage() {
    let assert = nanoskim()
        .args(["expression", "--cuts", path_str(&fixture("cuts.json"))])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("ptCut   pt > 50"));
    assert!(lines[1].ends_with("etaCut  (pt > 50)&&(abs(eta) < 2.4)"));
    assert!(lines[2].contains("&&(len(Jet_pt) >= 1 && Jet_pt[0] > 30)"));
}

#[test]
fn expression_single_stage() {
    nanoskim()
        .args(["expression", "--cuts", path_str(&fixture("cuts.json"))])
        .args(["--stage", "2"])
        .assert()
        .success()
        .stdout("(pt > 50)&&(abs(eta) < 2.4)\n");

    nanoskim()
        .args(["expression", "--cuts", path_str(&fixture("cuts.json"))])
        .args(["--stage", "0"])
        .assert()
        .success()
        .stdout("\n");
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn config_show_prints_defaults() {
    nanoskim()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[trees]"))
        .stdout(predicate::str::contains("events = \"Events\""))
        .stdout(predicate::str::contains("weight_field = \"genWeight\""));
}

#[test]
fn config_show_reflects_config_file() {
    nanoskim()
        .args(["--config", path_str(&fixture("skim.toml")), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name = \"selection\""))
        .stdout(predicate::str::contains("on_error = \"continue\""));
}

#[test]
fn invalid_config_exits_4() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("skim.toml");
    fs::write(&path, "[source]\nmax_attempts = 0\n").unwrap();

    nanoskim()
        .args(["--config", path_str(&path), "config", "show"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("max_attempts"));
}

#[test]
fn completions_are_generated() {
    nanoskim()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nanoskim"));
}

#[test]
fn fixtures_are_valid_event_files() {
    for name in ["mc_sample.json", "data_sample.json"] {
        let parsed = nanoskim::store::EventFile::parse_str(&load_fixture(name));
        assert!(parsed.is_ok(), "{name} should parse");
    }
}
