//! Behavioural tests for report generation against scripted checkers.
//!
//! Each scenario writes a target file and, where needed, a shell script
//! posing as `flake8` into a scratch directory, then runs the full CLI.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use checkmate_config::Config;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use super::{ScriptRunner, StaticConfigLoader, args, shell_quote, write_checker_script};
use crate::html::quote_path;
use crate::run_with;

const CHECKER_NAME: &str = "flake8";

struct TestWorld {
    dir: TempDir,
    config: Config,
    checker: Option<PathBuf>,
    stdout: String,
    exit: Option<ExitCode>,
}

impl TestWorld {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            config: Config::default(),
            checker: None,
            stdout: String::new(),
            exit: None,
        }
    }

    fn install_checker(&mut self, body: &str) {
        let path = write_checker_script(self.dir.path(), CHECKER_NAME, "7.0.0", body);
        self.checker = Some(path);
    }

    fn run(&mut self, name: &str) {
        let target = self.dir.path().join(name);
        let target_arg = target.to_string_lossy().into_owned();
        let runner = self
            .checker
            .as_deref()
            .map_or_else(ScriptRunner::empty, |path| ScriptRunner::new(CHECKER_NAME, path));
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(
            args(&["pycheckmate", &target_arg]),
            &mut stdout,
            &mut stderr,
            &loader,
            &runner,
        );
        self.stdout = String::from_utf8(stdout).expect("stdout utf8");
        self.exit = Some(exit);
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

fn unquote(value: &str) -> String {
    value.trim_matches('"').replace("\\n", "\n")
}

#[given("a Python file {name} containing {source}")]
fn given_python_file(world: &RefCell<TestWorld>, name: String, source: String) {
    let w = world.borrow();
    fs::write(w.dir.path().join(unquote(&name)), unquote(&source)).expect("write source");
}

#[given("a flake8 checker reporting {message} on line {line}")]
fn given_flake8_report(world: &RefCell<TestWorld>, message: String, line: u32) {
    let body = format!(
        "printf '%s\\n' \"$1:{line}:1: \"{}",
        shell_quote(&unquote(&message))
    );
    world.borrow_mut().install_checker(&body);
}

#[given("a checker that prints {text}")]
fn given_checker_prints(world: &RefCell<TestWorld>, text: String) {
    let body = format!("printf '%s\\n' {}", shell_quote(&unquote(&text)));
    world.borrow_mut().install_checker(&body);
}

#[given("a checker that writes {text} to stderr")]
fn given_checker_stderr(world: &RefCell<TestWorld>, text: String) {
    let body = format!("printf '%s\\n' {} >&2", shell_quote(&unquote(&text)));
    world.borrow_mut().install_checker(&body);
}

#[given("a checker that exits with status {status}")]
fn given_checker_status(world: &RefCell<TestWorld>, status: u8) {
    world.borrow_mut().install_checker(&format!("exit {status}"));
}

#[given("the project directory is the file's directory")]
fn given_project_directory(world: &RefCell<TestWorld>) {
    let mut w = world.borrow_mut();
    let dir = Utf8PathBuf::from_path_buf(w.dir.path().to_path_buf()).expect("utf8 tempdir");
    w.config.project_directory = Some(dir);
}

#[given("the checker override {value}")]
fn given_override(world: &RefCell<TestWorld>, value: String) {
    world.borrow_mut().config.pychecker = Some(unquote(&value));
}

#[when("pycheckmate checks {name}")]
fn when_checks(world: &RefCell<TestWorld>, name: String) {
    world.borrow_mut().run(&unquote(&name));
}

#[then("pycheckmate succeeds")]
fn then_succeeds(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().exit, Some(ExitCode::SUCCESS));
}

#[then("the report links line {line} of {name}")]
fn then_links_line(world: &RefCell<TestWorld>, line: u32, name: String) {
    let w = world.borrow();
    let path = w.dir.path().join(unquote(&name));
    let href = format!("txmt://open?url=file://{}&line={line}", quote_path(&path));
    assert!(w.stdout.contains(&href), "no link {href} in {}", w.stdout);
}

#[then("the report shows {text}")]
fn then_shows(world: &RefCell<TestWorld>, text: String) {
    let w = world.borrow();
    let expected = unquote(&text);
    assert!(w.stdout.contains(&expected), "missing {expected:?} in {}", w.stdout);
}

#[then("the report does not contain {text}")]
fn then_lacks(world: &RefCell<TestWorld>, text: String) {
    let w = world.borrow();
    let unexpected = unquote(&text);
    assert!(!w.stdout.contains(&unexpected), "unexpected {unexpected:?} in {}", w.stdout);
}

#[then("the exit status line reads {status}")]
fn then_exit_status(world: &RefCell<TestWorld>, status: String) {
    let expected = format!("<br>Exit status: {}\n", unquote(&status));
    assert!(world.borrow().stdout.contains(&expected));
}

#[scenario(
    path = "tests/features/formatter.feature",
    name = "A recognised checker message becomes an editor link"
)]
fn recognised_message_is_linked(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/formatter.feature",
    name = "Unrecognised output is shown as escaped text"
)]
fn unrecognised_output_is_escaped(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/formatter.feature",
    name = "The project directory shortens displayed paths"
)]
fn project_directory_shortens_paths(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/formatter.feature",
    name = "Checker stderr keeps its indentation"
)]
fn stderr_keeps_indentation(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/formatter.feature",
    name = "A failing checker status is reported, not propagated"
)]
fn checker_status_is_reported(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/formatter.feature",
    name = "The builtin override ignores installed checkers"
)]
fn builtin_override_ignores_checkers(world: RefCell<TestWorld>) {
    drop(world);
}
