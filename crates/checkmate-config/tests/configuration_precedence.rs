//! Behaviour tests for configuration layering.

use std::cell::RefCell;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use checkmate_config::{CheckerOverride, Config, default_log_filter, default_log_format};

/// Environment variables the scenarios touch. They are cleared before each
/// scenario so ambient editor settings cannot leak in.
const MANAGED_KEYS: &[&str] = &["TM_PYCHECKER", "TM_PYCHECKER_OPTIONS", "TM_PROJECT_DIRECTORY"];

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    cli_args: RefCell<Vec<OsString>>,
    previous: Vec<(&'static str, Option<OsString>)>,
    loaded: RefCell<Option<Result<Config, String>>>,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = MANAGED_KEYS
            .iter()
            .map(|key| (*key, std::env::var_os(key)))
            .collect();
        for key in MANAGED_KEYS {
            // Environment mutation is `unsafe` in edition 2024; the mutex
            // serialises access and `Drop` restores the prior values.
            unsafe { std::env::remove_var(key) };
        }
        Self {
            cli_args: RefCell::new(vec![OsString::from("pycheckmate")]),
            previous,
            loaded: RefCell::new(None),
            _guard: guard,
        }
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() {
            return;
        }
        let args = self.cli_args.borrow().clone();
        let result = Config::load_from_iter(args).map_err(|error| error.to_string());
        *self.loaded.borrow_mut() = Some(result);
    }

    fn config(&self) -> Config {
        self.load();
        match self.loaded.borrow().as_ref() {
            Some(Ok(config)) => config.clone(),
            Some(Err(error)) => panic!("configuration failed to load: {error}"),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            match value {
                Some(os_value) => unsafe { std::env::set_var(key, os_value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("the environment sets {key} to {value}")]
fn given_environment(key: String, value: String) {
    unsafe { std::env::set_var(strip_quotes(&key), strip_quotes(&value)) };
}

#[when("the CLI sets {flag} to {value}")]
fn when_cli_flag(harness: &Harness, flag: String, value: String) {
    let mut args = harness.cli_args.borrow_mut();
    args.push(OsString::from(strip_quotes(&flag)));
    args.push(OsString::from(strip_quotes(&value)));
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.config();
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.wrap_width(), 80);
    assert!(config.checker_override().is_none());
    assert!(config.checker_options().is_empty());
}

#[then("loading the configuration resolves the checker override to {name}")]
fn then_checker_override(harness: &Harness, name: String) {
    let config = harness.config();
    assert_eq!(
        config.checker_override(),
        Some(CheckerOverride::Program(strip_quotes(&name).to_owned()))
    );
}

#[then("loading the configuration selects the built-in check")]
fn then_builtin(harness: &Harness) {
    assert_eq!(harness.config().checker_override(), Some(CheckerOverride::Builtin));
}

#[then("loading the configuration resolves the project directory to {path}")]
fn then_project_directory(harness: &Harness, path: String) {
    let config = harness.config();
    assert_eq!(
        config.project_directory().map(|dir| dir.as_str()),
        Some(strip_quotes(&path))
    );
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Built-in defaults apply without overrides"
)]
fn defaults_without_overrides(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "The environment selects the checker"
)]
fn environment_selects_checker(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "The environment can force the built-in syntax check"
)]
fn environment_forces_builtin(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line flags override the environment"
)]
fn cli_overrides_environment(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "The environment supplies the project directory"
)]
fn environment_supplies_project_directory(#[from(harness)] harness: Harness) {
    drop(harness);
}
