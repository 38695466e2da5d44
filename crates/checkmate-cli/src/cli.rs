//! Command-line arguments left over after configuration flags are removed.

use std::path::PathBuf;

use clap::Parser;

const CONFIG_HELP: &str = "\
Configuration flags must precede FILE:
  --pychecker <NAME|PATH|builtin>   checker to try first [env: TM_PYCHECKER]
  --pychecker-options <OPTIONS>     extra checker options [env: TM_PYCHECKER_OPTIONS]
  --project-directory <DIR>         shorten paths below DIR [env: TM_PROJECT_DIRECTORY]
  --wrap-width <COLUMNS>            wrap long messages [env: TM_WRAP_WIDTH]
  --poll-interval-ms <MS>           bound on each output wait [env: TM_POLL_INTERVAL_MS]
  --log-filter <FILTER>             diagnostics filter [env: TM_LOG_FILTER]
  --log-format <json|compact>       diagnostics format [env: TM_LOG_FORMAT]
  --config-path <FILE>              configuration file";

/// Formats Python checker output as an HTML report.
#[derive(Parser, Debug)]
#[command(name = "pycheckmate", version, after_help = CONFIG_HELP)]
pub(crate) struct Cli {
    /// Python source file to check.
    #[arg(value_name = "FILE")]
    pub(crate) file: PathBuf,
}
