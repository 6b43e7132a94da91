mod common;

use common::cargo_bin;
use predicates::prelude::*;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_underflow_error() {
    cargo_bin()
    .timeout(Duration::from_secs(2)).arg("run").arg("<")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("lower bound")
        .and(predicate::str::contains("line 0, column 0 (step 0, ip=0, dp=0)")))
    .stdout(predicate::str::is_empty());
}

#[test]
fn test_unmatched_open_bracket_error() {
    cargo_bin()
    .timeout(Duration::from_secs(2)).arg("run").arg("[")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("unmatched bracket '['"));
}

#[test]
fn test_unmatched_close_bracket_only_when_reached_nonzero() {
    cargo_bin()
    .timeout(Duration::from_secs(2)).arg("run").arg("]")
    .assert()
    .success();

    cargo_bin()
    .timeout(Duration::from_secs(2)).arg("run").arg("+]")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("unmatched bracket ']'"));
}

#[test]
fn test_error_points_at_source_line() {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "+ first\n+ second\n>> <<< oops\n").unwrap();
    cargo_bin()
    .timeout(Duration::from_secs(2)).arg("run").arg("--file").arg(tf.path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("line 2, column 5")
        .and(predicate::str::contains("  >> <<< oops"))
        .and(predicate::str::contains("       ^")));
}

#[test]
fn test_step_limit_aborts() {
    cargo_bin()
    .timeout(Duration::from_secs(5)).arg("run").arg("--max-steps").arg("1000").arg("+[]")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Execution aborted: step limit exceeded (1000)"))
    .stdout(predicate::str::contains("Execution aborted").not());
}

#[test]
fn test_step_limit_from_env() {
    cargo_bin()
    .timeout(Duration::from_secs(5))
    .env("BF_MAX_STEPS", "10")
    .arg("run").arg("+[]")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("step limit exceeded (10)"));
}

#[test]
fn test_timeout_aborts_infinite_loop() {
    cargo_bin()
    .timeout(Duration::from_secs(5))
    .env("BF_TIMEOUT_MS", "100")
    .arg("run").arg("+[]")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("wall-clock timeout exceeded (100 ms)"));
}
