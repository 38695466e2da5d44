//! Configuration loading helpers for the CLI.
//!
//! Configuration flags precede the file argument. They are split off here
//! and handed to `ortho_config`, while `clap` sees only the remainder.

use std::ffi::{OsStr, OsString};

use checkmate_config::Config;
use ortho_config::OrthoConfig;

use crate::errors::AppError;

/// Flags recognised by the configuration loader. Kept in step with the
/// fields of [`Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--pychecker",
    "--pychecker-options",
    "--project-directory",
    "--log-filter",
    "--log-format",
    "--wrap-width",
    "--poll-interval-ms",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the split-off flags plus the environment.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, has_inline_value) = text
        .split_once('=')
        .map_or((&*text, false), |(name, _)| (name, true));
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut pending_value = false;
    for argument in rest {
        if pending_value {
            config_arguments.push(argument.clone());
            pending_value = false;
            continue;
        }
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                pending_value = needs_value;
            }
            FlagAction::Skip => break,
        }
    }

    let command_start = config_arguments.len();
    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}

/// Program name followed by everything after the configuration flags.
pub(crate) fn command_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.get(split.command_start..).unwrap_or_default())
        .cloned()
        .collect()
}
