use assert_cmd::Command;
use predicates::prelude::predicate::str;

#[test]
fn part2_output_right_answer() {
    let mut cmd = Command::cargo_bin("part2").unwrap();
    cmd.arg("test_inputs.txt");

    cmd.assert().success().stdout(str::contains("is 94."));
}

#[test]
fn part2_output_right_answer_for_long_corridor() {
    let mut cmd = Command::cargo_bin("part2").unwrap();
    cmd.arg("test_inputs2.txt");

    cmd.assert().success().stdout(str::contains("is 71."));
}
