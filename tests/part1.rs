use assert_cmd::Command;
use predicates::prelude::predicate::str;

#[test]
fn part1_output_right_answer() {
    let mut cmd = Command::cargo_bin("part1").unwrap();
    cmd.arg("test_inputs.txt");

    cmd.assert().success().stdout(str::contains("is 102."));
}

#[test]
fn part1_draws_path() {
    let mut cmd = Command::cargo_bin("part1").unwrap();
    cmd.arg("test_inputs.txt").arg("--show-path");

    cmd.assert()
        .success()
        .stdout(str::starts_with("2"))
        .stdout(str::contains(">"))
        .stdout(str::contains("is 102."));
}

#[test]
fn part1_reports_exhausted_step_limit() {
    let mut cmd = Command::cargo_bin("part1").unwrap();
    cmd.arg("test_inputs.txt").arg("--max-steps").arg("1");

    cmd.assert()
        .failure()
        .stderr(str::contains("gave up after exploring 1 state(s)"));
}

#[test]
fn part1_reports_missing_input() {
    let mut cmd = Command::cargo_bin("part1").unwrap();
    cmd.arg("no_such_inputs.txt");

    cmd.assert()
        .failure()
        .stderr(str::contains("Failed to open given file(no_such_inputs.txt)."));
}
