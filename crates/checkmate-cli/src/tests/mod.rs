//! Test harness for the CLI runtime.

use std::cell::RefCell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use checkmate_config::Config;

use crate::config::ConfigLoader;
use crate::discovery::{CommandRunner, CommandOutput, SystemRunner};
use crate::errors::AppError;

#[cfg(unix)]
mod behaviour;
mod unit;

/// Hands out a fixed configuration and remembers the flags it was given.
#[derive(Default)]
pub(super) struct StaticConfigLoader {
    config: Config,
    seen: RefCell<Vec<OsString>>,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self {
            config,
            seen: RefCell::new(Vec::new()),
        }
    }

    pub(super) fn seen(&self) -> Vec<OsString> {
        self.seen.borrow().clone()
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        self.seen.replace(args.to_vec());
        Ok(self.config.clone())
    }
}

/// Resolves one checker name to a script on disk and runs it for real.
pub(super) struct ScriptRunner {
    name: &'static str,
    path: Option<PathBuf>,
}

impl ScriptRunner {
    pub(super) const fn empty() -> Self {
        Self {
            name: "",
            path: None,
        }
    }

    pub(super) fn new(name: &'static str, path: &Path) -> Self {
        Self {
            name,
            path: Some(path.to_path_buf()),
        }
    }
}

impl CommandRunner for ScriptRunner {
    fn resolve(&self, candidate: &str) -> Option<PathBuf> {
        (candidate == self.name).then(|| self.path.clone()).flatten()
    }

    fn run(&self, program: &Path, args: &[OsString]) -> Option<CommandOutput> {
        SystemRunner.run(program, args)
    }
}

/// Writes an executable shell script that answers `--version` with
/// `version` and otherwise runs `body` with the target file in `$1`.
#[cfg(unix)]
pub(super) fn write_checker_script(dir: &Path, name: &str, version: &str, body: &str) -> PathBuf {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then\n  echo '{version}'\n  exit 0\nfi\n{body}\n"
    );
    fs::write(&path, script).expect("write checker script");
    let mut permissions = fs::metadata(&path).expect("script metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("make script executable");
    path
}

/// Quotes `text` for a single-quoted shell word.
pub(super) fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

pub(super) fn args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}
