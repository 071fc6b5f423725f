//! Command-line tests for the dirrun binary

mod common;

use assert_cmd::Command;
use common::Project;
use predicates::prelude::*;
use std::fs;

fn dirrun(project: &Project) -> Command {
    let mut cmd = Command::cargo_bin("dirrun").unwrap();
    cmd.current_dir(project.root()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn sample_project() -> Project {
    let project = Project::new();
    project.config("name: shop\ntasks-path: tasks\n");
    project.unit(
        "greet/greet.yml",
        "usage: Say hello\ndescription: Writes a greeting file\nrun: echo \"hello ${who}\" > greeting.txt\n",
    );
    project.unit("fail/fail.yml", "run: exit 4\n");
    project.unit("lib/compile/compile.yml", "run: echo compile\n");
    project
}

#[test]
fn test_no_arguments_prints_help() {
    let project = sample_project();
    dirrun(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_list_tasks() {
    let project = sample_project();
    dirrun(&project)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("greet"))
        .stdout(predicate::str::contains("Say hello"))
        .stdout(predicate::str::contains("lib/compile"))
        .stdout(predicate::str::contains("Writes a greeting file").not());
}

#[test]
fn test_verbose_list_shows_descriptions() {
    let project = sample_project();
    dirrun(&project)
        .args(["--list", "-v"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Say hello"))
        .stdout(predicate::str::contains("Writes a greeting file"));
}

#[test]
fn test_run_task_with_input_values() {
    let project = sample_project();
    dirrun(&project)
        .args(["greet", "who=cli"])
        .assert()
        .success();

    let greeting = fs::read_to_string(project.root().join("greeting.txt")).unwrap();
    assert_eq!(greeting.trim(), "hello cli");
}

#[test]
fn test_failing_task_exits_with_error() {
    let project = sample_project();
    dirrun(&project)
        .arg("fail")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("dirrun failed"))
        .stderr(predicate::str::contains("task \"fail\" execution error"));
}

#[test]
fn test_missing_task_only_warns() {
    let project = sample_project();
    dirrun(&project)
        .arg("nope")
        .assert()
        .success()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_explicit_missing_config_file() {
    let project = sample_project();
    dirrun(&project)
        .args(["-f", "missing.yml", "greet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to find config file"));
}

#[test]
fn test_tasks_path_flag_overrides_config() {
    let project = sample_project();
    fs::create_dir_all(project.root().join("other/solo")).unwrap();
    fs::write(project.root().join("other/solo/solo.yml"), "run: echo solo\n").unwrap();

    dirrun(&project)
        .args(["--tasks-path", "other", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("solo"))
        .stdout(predicate::str::contains("greet").not());
}

#[test]
fn test_env_file_is_loaded() {
    let project = sample_project();
    fs::write(project.root().join(".env"), "DIRRUN_TEST_WHO=dotenv\n").unwrap();
    project.unit(
        "dotenv/dotenv.yml",
        "run: echo \"$DIRRUN_TEST_WHO\" > dotenv.txt\n",
    );

    dirrun(&project)
        .arg("dotenv")
        .env_remove("DIRRUN_TEST_WHO")
        .assert()
        .success();

    let written = fs::read_to_string(project.root().join("dotenv.txt")).unwrap();
    assert_eq!(written.trim(), "dotenv");
}

#[test]
fn test_completions() {
    let project = sample_project();
    dirrun(&project)
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dirrun"));
}
