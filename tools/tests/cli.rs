use std::process::Command;

use maxcount::{instances::Formula, var};

fn maxcount() -> Command {
    Command::new(env!("CARGO_BIN_EXE_maxcount"))
}

#[test]
fn tautology_bounds() {
    let output = maxcount()
        .args(["--samples", "4", "--verbosity", "1", "--color", "never"])
        .args(["../data/tautology.cnf", "0"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("v "));
    assert_eq!(lines[1], "c Estimated max-count: 1 x 2^3");
    assert_eq!(
        lines[2],
        "c Max-count is <= 1 x 2^3 with probability >= 1 (trivial bound)"
    );
    assert_eq!(lines[3], "c Max-count is >= 1 x 2^3 with probability >= 1");
}

#[test]
fn verbosity_zero() {
    let output = maxcount()
        .args(["--verbosity", "0", "../data/implication.cnf", "0"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "v -1 0\nc Estimated max-count: 1.5 x 2^2\n");
}

#[test]
fn json_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let output = maxcount()
        .args(["--verbosity", "0", "--json"])
        .arg(&path)
        .args(["../data/implication.cnf", "0"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(report["witness"], serde_json::json!([-1]));
    assert_eq!(report["n_witnesses"], serde_json::json!(2));
}

#[test]
fn invalid_confidence() {
    let output = maxcount()
        .args(["--upper-bound-confidence", "1.5", "../data/tautology.cnf", "0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("strictly between 0 and 1"));
}

#[test]
fn malformed_input() {
    let output = maxcount()
        .args(["../data/malformed.cnf", "0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("line 2"));
}

#[test]
fn selfcomp_output_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("composed.cnf");
    let output = Command::new(env!("CARGO_BIN_EXE_selfcomp"))
        .args(["--projection", "counting", "2", "../data/selfcomp.cnf"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let composed = Formula::from_dimacs_path(&path).unwrap();
    assert_eq!(composed.cnf().len(), 4);
    assert!(composed.max_vars().is_empty());
    assert_eq!(
        composed.counting_vars().iter().copied().collect::<Vec<_>>(),
        vec![var![1], var![2], var![4], var![5]]
    );
}
