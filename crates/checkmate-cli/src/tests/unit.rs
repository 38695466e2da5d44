//! Unit tests for the CLI runtime entry point.

use std::fs;
use std::process::ExitCode;

use checkmate_config::Config;

use super::{ScriptRunner, StaticConfigLoader, args};
use crate::config::OrthoConfigLoader;
use crate::run_with;

struct Outcome {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn run_static(arguments: &[&str], config: Config) -> (Outcome, StaticConfigLoader) {
    let loader = StaticConfigLoader::new(config);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with(
        args(arguments),
        &mut stdout,
        &mut stderr,
        &loader,
        &ScriptRunner::empty(),
    );
    let outcome = Outcome {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    };
    (outcome, loader)
}

fn builtin() -> Config {
    Config {
        pychecker: Some(String::from("builtin")),
        ..Config::default()
    }
}

#[test]
fn help_goes_to_stdout() {
    let (outcome, _) = run_static(&["pycheckmate", "--help"], Config::default());
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage"));
    assert!(outcome.stdout.contains("TM_PYCHECKER"));
    assert!(outcome.stderr.is_empty());
}

#[test]
fn version_goes_to_stdout() {
    let (outcome, _) = run_static(&["pycheckmate", "--version"], Config::default());
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_file_argument_prints_usage() {
    let (outcome, _) = run_static(&["pycheckmate"], Config::default());
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stdout.is_empty());
    assert!(outcome.stderr.contains("Usage"));
}

#[test]
fn extra_arguments_are_rejected() {
    let (outcome, _) = run_static(&["pycheckmate", "a.py", "b.py"], Config::default());
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stdout.is_empty());
}

#[test]
fn config_flags_reach_the_loader() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("ok.py");
    fs::write(&target, "x = 1\n").expect("write source");
    let target_arg = target.to_string_lossy().into_owned();

    let (outcome, loader) = run_static(
        &["pycheckmate", "--pychecker", "builtin", "--wrap-width=100", &target_arg],
        builtin(),
    );
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(
        loader.seen(),
        args(&["pycheckmate", "--pychecker", "builtin", "--wrap-width=100"])
    );
}

#[test]
fn builtin_check_reports_clean_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("ok.py");
    fs::write(&target, "def f():\n    return 1\n").expect("write source");
    let target_arg = target.to_string_lossy().into_owned();

    let (outcome, _) = run_static(&["pycheckmate", &target_arg], builtin());
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.starts_with("<html>"));
    assert!(outcome.stdout.contains("Syntax check only"));
    assert!(outcome.stdout.contains("None<br>"));
    assert!(outcome.stdout.ends_with("</html>\n"));
}

#[test]
fn unreadable_target_fails_with_a_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("absent.py");
    let target_arg = target.to_string_lossy().into_owned();

    let (outcome, _) = run_static(&["pycheckmate", &target_arg], builtin());
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stdout.contains("cannot read"));
    assert!(outcome.stdout.ends_with("</html>\n"));
}

#[test]
fn invalid_configuration_fails_before_reporting() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with(
        args(&["pycheckmate", "--wrap-width", "wide", "foo.py"]),
        &mut stdout,
        &mut stderr,
        &OrthoConfigLoader,
        &ScriptRunner::empty(),
    );
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    let message = String::from_utf8(stderr).expect("stderr utf8");
    assert!(message.contains("failed to load configuration"), "{message}");
}
