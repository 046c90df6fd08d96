//! Demoflow CLI library
//!
//! Argument parsing, configuration layering, logging setup and terminal
//! reporting for the `demoflow` binary.

#![warn(missing_docs)]
#![allow(clippy::format_push_string)]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, LogFormatArg, RunArgs};
pub use config::{
    load_fixtures, resolve_suite_config, CliConfig, ColorChoice, LogFormat, Verbosity,
};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::ProgressReporter;
pub use runner::{select_scenarios, SuiteRunner};
