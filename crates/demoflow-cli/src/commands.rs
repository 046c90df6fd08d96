//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Demoflow: resilient end-to-end checks for a "Request a Demo" flow
#[derive(Parser, Debug)]
#[command(name = "demoflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Suite configuration file
    #[arg(
        long,
        env = "DEMOFLOW_CONFIG",
        default_value = demoflow::CONFIG_FILE,
        global = true
    )]
    pub config: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the site
    Run(RunArgs),

    /// List the scenario catalogue
    List,

    /// Show or create the suite configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Root URL of the site under test
    #[arg(long, env = "DEMOFLOW_BASE_URL")]
    pub base_url: Option<String>,

    /// Fixture file with the `valid` and `invalid` payload sets
    #[arg(long, env = "DEMOFLOW_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Scenario to run (repeatable); all scenarios when omitted
    #[arg(short, long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Extra attempts for a failed scenario
    #[arg(long, env = "DEMOFLOW_RETRIES")]
    pub retries: Option<u32>,

    /// Override every wait bound, in milliseconds
    #[arg(long, value_name = "MS", env = "DEMOFLOW_TIMEOUT_MS")]
    pub timeout: Option<u64>,

    /// Directory for the run report and screenshots
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save a screenshot when an attempt fails
    #[arg(long)]
    pub screenshots: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chromium executable
    #[arg(long, env = "DEMOFLOW_BROWSER")]
    pub browser_path: Option<String>,

    /// Launch Chromium without its sandbox
    #[arg(long)]
    pub no_sandbox: bool,

    /// Stop after the first failed scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Run against the built-in scripted site instead of a browser
    #[arg(long)]
    pub mock: bool,

    /// Accept a button labelled "Get a Demo" when no CTA is discovered
    #[arg(long)]
    pub cta_label_fallback: bool,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Print the effective configuration
    #[arg(long)]
    pub show: bool,

    /// Write a default configuration file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Always => Self::Always,
            ColorArg::Auto => Self::Auto,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_defaults() {
            let cli = Cli::parse_from(["demoflow", "run"]);
            assert_eq!(cli.verbose, 0);
            assert!(!cli.quiet);
            assert_eq!(cli.color, ColorArg::Auto);
            match cli.command {
                Commands::Run(args) => {
                    assert!(args.scenarios.is_empty());
                    assert!(!args.mock);
                    assert!(!args.fail_fast);
                }
                _ => panic!("expected run"),
            }
        }

        #[test]
        fn test_parse_global_flags() {
            let cli = Cli::parse_from([
                "demoflow",
                "-vv",
                "--color",
                "never",
                "--log-format",
                "json",
                "list",
            ]);
            assert_eq!(cli.verbose, 2);
            assert_eq!(cli.color, ColorArg::Never);
            assert_eq!(cli.log_format, LogFormatArg::Json);
            assert!(matches!(cli.command, Commands::List));
        }

        #[test]
        fn test_parse_repeated_scenarios() {
            let cli = Cli::parse_from([
                "demoflow",
                "run",
                "-s",
                "cta-visible",
                "--scenario",
                "valid-submission",
            ]);
            match cli.command {
                Commands::Run(args) => {
                    assert_eq!(args.scenarios, vec!["cta-visible", "valid-submission"]);
                }
                _ => panic!("expected run"),
            }
        }

        #[test]
        fn test_parse_run_overrides() {
            let cli = Cli::parse_from([
                "demoflow",
                "run",
                "--base-url",
                "https://staging.example.com",
                "--retries",
                "0",
                "--timeout",
                "500",
                "--output",
                "out",
                "--headed",
                "--no-sandbox",
                "--mock",
                "--cta-label-fallback",
            ]);
            match cli.command {
                Commands::Run(args) => {
                    assert_eq!(args.base_url.as_deref(), Some("https://staging.example.com"));
                    assert_eq!(args.retries, Some(0));
                    assert_eq!(args.timeout, Some(500));
                    assert_eq!(args.output, Some(PathBuf::from("out")));
                    assert!(args.headed && args.no_sandbox && args.mock);
                    assert!(args.cta_label_fallback);
                }
                _ => panic!("expected run"),
            }
        }

        #[test]
        fn test_config_force_requires_init() {
            assert!(Cli::try_parse_from(["demoflow", "config", "--force"]).is_err());
            let cli = Cli::parse_from(["demoflow", "config", "--init", "--force"]);
            match cli.command {
                Commands::Config(args) => assert!(args.init && args.force),
                _ => panic!("expected config"),
            }
        }

        #[test]
        fn test_config_path_default() {
            let cli = Cli::parse_from(["demoflow", "list"]);
            assert_eq!(cli.config, PathBuf::from("demoflow.yaml"));
        }
    }

    mod conversion_tests {
        use super::*;
        use crate::config::{ColorChoice, LogFormat};

        #[test]
        fn test_color_conversion() {
            assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
            assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
        }

        #[test]
        fn test_log_format_conversion() {
            assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
            assert_eq!(LogFormat::from(LogFormatArg::Text), LogFormat::Text);
        }
    }
}
