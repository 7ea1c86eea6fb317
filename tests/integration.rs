use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

fn fdeb() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fdeb"))
}

fn csv_rows(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .skip(1)
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

#[test]
fn bundles_csv_to_stdout() {
    let output = fdeb()
        .args(["bundle", "-i", "tests/fixtures/parallel.csv", "-C", "3", "-I", "20"])
        .output()
        .expect("Failed to execute fdeb");

    assert!(output.status.success(), "fdeb exited with error");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("x,y,index,group\n"));

    // Two edges with 4 interior points each
    let rows = csv_rows(&stdout);
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0], ["0.0", "0.0", "0.0", "0"]);
    assert_eq!(rows[11], ["10.0", "0.5", "1.0", "1"]);
}

#[test]
fn writes_json_output_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("bundled.json");

    fdeb()
        .args(["bundle", "-i", "tests/fixtures/two_columns_graph.json", "-o"])
        .arg(&out)
        .assert()
        .success();

    let content = fs::read_to_string(&out).expect("Output file should exist");
    let records: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
    assert_eq!(records.len(), 6 * 34);
    assert_eq!(records[0]["group"], 0);
    assert_eq!(records[0]["x"], 0.0);
    assert_eq!(records[0]["y"], 1.0);
    assert_eq!(records[33]["index"], 1.0);
    assert_eq!(records[203]["group"], 5);
}

#[test]
fn format_flag_overrides_output_extension() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("bundled.json");

    fdeb()
        .args(["bundle", "-i", "tests/fixtures/parallel.csv", "-C", "1", "-f", "csv", "-o"])
        .arg(&out)
        .assert()
        .success();

    let content = fs::read_to_string(&out).unwrap();
    assert!(content.starts_with("x,y,index,group\n"));
}

#[test]
fn reads_weights_and_config_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("bundled.csv");

    fdeb()
        .args([
            "bundle",
            "-i",
            "tests/fixtures/weighted.csv",
            "--config",
            "tests/fixtures/quick.yaml",
            "-o",
        ])
        .arg(&out)
        .assert()
        .success();

    let rows = csv_rows(&fs::read_to_string(&out).unwrap());
    assert_eq!(rows.len(), 3 * 6);
}

#[test]
fn reference_profile_runs() {
    fdeb()
        .args([
            "bundle",
            "-i",
            "tests/fixtures/two_columns.csv",
            "--profile",
            "reference",
            "-C",
            "2",
        ])
        .assert()
        .success();
}

#[test]
fn rejects_malformed_rows() {
    let output = fdeb()
        .args(["bundle", "-i", "tests/fixtures/bad_row.csv"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("line 3: 'oops' is not a number"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn rejects_invalid_configuration_before_reading() {
    let output = fdeb()
        .args(["bundle", "-i", "tests/fixtures/missing.csv", "-C", "0"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("cycle count C must be at least 1"), "{stderr}");
}

#[test]
fn rejects_unknown_config_fields() {
    fdeb()
        .args([
            "bundle",
            "-i",
            "tests/fixtures/parallel.csv",
            "--config",
            "tests/fixtures/unknown_field.yaml",
        ])
        .assert()
        .failure();
}

#[test]
fn rejects_unsupported_formats() {
    fdeb()
        .args(["bundle", "-i", "tests/fixtures/quick.yaml"])
        .assert()
        .failure();

    fdeb()
        .args(["bundle", "-i", "tests/fixtures/parallel.csv", "-f", "svg"])
        .assert()
        .failure();
}

#[test]
fn compat_reports_two_column_statistics() {
    let output = fdeb()
        .args(["compat", "-i", "tests/fixtures/two_columns.csv", "--neighbors"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("edges: 6\n"));
    assert!(stdout.contains("pairs: 15\n"));
    assert!(stdout.contains("compatible pairs: 6\n"));
    assert!(stdout.contains("0: 1 4 5\n"));
    assert!(stdout.contains("2: \n"));
}

#[test]
fn compat_threshold_zero_never_links_zero_scores() {
    let output = fdeb()
        .args(["compat", "-i", "tests/fixtures/perpendicular.csv", "-t", "0"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("compatible pairs: 0\n"));
}

#[test]
fn compat_reads_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("loose.yaml");
    fs::write(&config, "compatibility_threshold: 0.1\n").unwrap();

    let output = fdeb()
        .args(["compat", "-i", "tests/fixtures/two_columns.csv", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("threshold: 0.1\n"), "{stdout}");
}
