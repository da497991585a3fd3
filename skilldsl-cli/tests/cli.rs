use assert_cmd::Command;
use predicates::prelude::*;

fn skilldsl() -> Command {
    Command::cargo_bin("skilldsl").expect("binary exists")
}

#[test]
fn parses_skill_from_stdin() {
    skilldsl()
        .arg("parse")
        .write_stdin("(define-skill :adder (inputs :a :b))")
        .assert()
        .success()
        .stdout(predicate::str::contains("(define-skill :adder (inputs :a :b))"))
        .stdout(predicate::str::contains("skill-id: :adder"));
}

#[test]
fn parse_keeps_string_literals_quoted() {
    skilldsl()
        .arg("parse")
        .write_stdin("(emit :msg \"(draft\")")
        .assert()
        .success()
        .stdout(predicate::str::contains("(emit :msg \"(draft\")"));
}

#[test]
fn parse_reports_errors() {
    skilldsl()
        .arg("parse")
        .write_stdin("(+ 1 2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unterminated form"));
}

#[test]
fn evaluates_with_json_state_and_inputs() {
    skilldsl()
        .args([
            "eval",
            "--state",
            r#"{"count": 5}"#,
            "--inputs",
            r#"{"step": 2}"#,
        ])
        .write_stdin("(emit :next (set :count (+ (get state :count) (get input :step))))")
        .assert()
        .success()
        .stdout(predicate::str::contains("value: 7"))
        .stdout(predicate::str::contains("state: {:count 7}"))
        .stdout(predicate::str::contains("emissions: {:next 7}"));
}

#[test]
fn eval_prints_json_and_fails_on_error() {
    skilldsl()
        .args(["eval", "--json"])
        .write_stdin("(seq (emit :out 1) (*  2))")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"out\": 1"))
        .stdout(predicate::str::contains("missing operand 2"));
}

#[test]
fn eval_rejects_non_object_state() {
    skilldsl()
        .args(["eval", "--state", "[1, 2]"])
        .write_stdin("(+ 1 2)")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--state must be a JSON object"));
}

#[test]
fn renders_single_registry_skill() {
    skilldsl()
        .args(["render", "--skill", ":buffer-calculator"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("(define-skill :buffer-calculator\n"))
        .stdout(predicate::str::contains("(state {:leave-pct 10 :dependency-pct 15 :learning-pct 20})"));

    skilldsl()
        .args(["render", "--skill", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown skill ghost"));
}

#[test]
fn renders_default_wiring() {
    skilldsl()
        .arg("wiring")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "(connect :effort-aggregator:total-days -> :buffer-calculator:base-days))",
        ));
}

#[test]
fn check_loads_bundled_library() {
    skilldsl()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("wiring.skill: 0 skills, 5 connections"));
}

#[test]
fn stats_lists_every_registry_skill() {
    skilldsl()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("project-scope"))
        .stdout(predicate::str::contains("buffer-calculator"))
        .stdout(predicate::str::contains("savings"));
}
