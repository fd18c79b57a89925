//! Tests for output file and run directory naming.

use chrono::{TimeZone, Utc};

use nanoskim::files::naming::{self, digit_count, output_file_name, run_directory_name};

// ============================================================================
// Sanitization Tests
// ============================================================================

#[test]
fn sanitize_keeps_typical_short_names() {
    assert_eq!(naming::sanitize("DYJetsToLL_M-50"), "DYJetsToLL_M-50");
}

#[test]
fn sanitize_replaces_whitespace_with_hyphens() {
    assert_eq!(naming::sanitize("ttbar  semi leptonic"), "ttbar-semi-leptonic");
}

#[test]
fn sanitize_removes_path_separators() {
    assert_eq!(naming::sanitize("/DYJetsToLL/NANOAODSIM"), "DYJetsToLLNANOAODSIM");
}

#[test]
fn sanitize_transliterates_unicode() {
    assert_eq!(naming::sanitize("Zürich"), "Zurich");
}

#[test]
fn sanitize_trims_edges_and_falls_back() {
    assert_eq!(naming::sanitize("..ZZ--"), "ZZ");
    assert_eq!(naming::sanitize("///"), "dataset");
}

#[test]
fn sanitize_truncates_long_names() {
    assert_eq!(naming::sanitize(&"a".repeat(300)).len(), 100);
}

// ============================================================================
// Output Name Tests
// ============================================================================

#[test]
fn digit_count_matches_decimal_width() {
    assert_eq!(digit_count(0), 1);
    assert_eq!(digit_count(9), 1);
    assert_eq!(digit_count(10), 2);
    assert_eq!(digit_count(999), 3);
    assert_eq!(digit_count(1000), 4);
}

#[test]
fn output_index_is_padded_to_file_count() {
    assert_eq!(output_file_name("DY", 3, 9), "DY_3.json");
    assert_eq!(output_file_name("DY", 3, 10), "DY_03.json");
    assert_eq!(output_file_name("DY", 42, 150), "DY_042.json");
}

#[test]
fn run_directory_follows_job_naming() {
    let at = Utc.with_ymd_and_hms(2026, 10, 18, 14, 30, 0).unwrap();
    assert_eq!(
        run_directory_name("DYJetsToLL", 2, None, &at),
        "DYJetsToLL_18Oct26_1430_002"
    );
    assert_eq!(
        run_directory_name("DYJetsToLL", 2, Some("v2"), &at),
        "DYJetsToLL_18Oct26_1430_002_v2"
    );
    assert_eq!(
        run_directory_name("DYJetsToLL", 2, Some(""), &at),
        "DYJetsToLL_18Oct26_1430_002"
    );
}
