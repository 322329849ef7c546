//! Binary-level tests: generate a case file, run it, check the report.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn modpipe() -> Command {
    assert_cmd::cargo::cargo_bin_cmd!("modpipe")
}

#[test]
fn generate_then_run_reports_all_matches() {
    let dir = TempDir::new().unwrap();
    let cases = dir.path().join("cases.csv");

    modpipe()
        .args(["generate", cases.to_str().unwrap(), "--count", "20", "--seed", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 20 cases"));

    let text = fs::read_to_string(&cases).unwrap();
    assert!(text.starts_with("M,ID\n"));
    assert_eq!(text.lines().count(), 21);

    modpipe()
        .args(["run", "--cases", cases.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("all 20 results match the reference"));
}

#[test]
fn run_generates_its_own_backlog_when_no_file_is_given() {
    modpipe()
        .args(["run", "--count", "5", "--seed", "11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("all 5 results match the reference"));
}

#[test]
fn run_json_reports_every_entry() {
    let output = modpipe()
        .args(["run", "--count", "8", "--seed", "3", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let body: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let report = &body["report"];
    assert_eq!(report["exponent"], 8954);
    assert_eq!(report["modulus"], 25_553);
    assert_eq!(report["mismatches"], 0);
    assert_eq!(report["entries"].as_array().unwrap().len(), 8);
    assert!(body.get("trace").is_none());
}

#[test]
fn timeline_and_estimate_extend_the_run_output() {
    modpipe()
        .args(["run", "--count", "3", "--seed", "1", "--timeline", "--estimate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pipeline progression"))
        .stdout(predicate::str::contains("stage 8"))
        .stdout(predicate::str::contains("egress"))
        .stdout(predicate::str::contains("projected latency at 150.00 MHz"));
}

#[test]
fn exp_checks_the_worked_example() {
    modpipe()
        .args(["exp", "22", "-e", "54", "-n", "123", "-w", "16", "-s", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0x79"))
        .stdout(predicate::str::contains("results match"));
}

#[test]
fn uneven_split_is_a_startup_error() {
    modpipe()
        .args(["run", "--count", "1", "-w", "16", "-s", "3"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not divide evenly"));
}

#[test]
fn bad_case_file_names_the_offending_line() {
    let dir = TempDir::new().unwrap();
    let cases = dir.path().join("cases.csv");
    fs::write(&cases, "M,ID\n140,0\nnot-a-number,1\n").unwrap();

    modpipe()
        .args(["run", "--cases", cases.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 3"));
}

#[test]
fn profile_file_sets_the_key_material_and_flags_override_it() {
    let dir = TempDir::new().unwrap();
    let profile = dir.path().join("bench.toml");
    fs::write(&profile, "exponent = 54\nmodulus = 123\nstages = 4\nwidth = 16\n").unwrap();

    let output = modpipe()
        .args(["run", "--profile", profile.to_str().unwrap()])
        .args(["--count", "4", "--seed", "9", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(body["report"]["exponent"], 54);
    assert_eq!(body["report"]["modulus"], 123);

    // An explicit flag wins over the file.
    let output = modpipe()
        .args(["run", "--profile", profile.to_str().unwrap()])
        .args(["--count", "4", "--seed", "9", "-e", "55", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(body["report"]["exponent"], 55);
}

#[test]
fn empty_backlog_still_completes() {
    let dir = TempDir::new().unwrap();
    let cases = dir.path().join("cases.csv");
    fs::write(&cases, "M,ID\n").unwrap();

    modpipe()
        .args(["run", "--cases", cases.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("no cases were admitted"));
}

#[test]
fn generated_files_are_seed_reproducible() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");

    for path in [&a, &b] {
        modpipe()
            .args(["generate", path.to_str().unwrap(), "--count", "12", "--seed", "42"])
            .assert()
            .success();
    }
    assert_eq!(fs::read_to_string(&a).unwrap(), fs::read_to_string(&b).unwrap());
}
