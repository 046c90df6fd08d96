//! CLI configuration
//!
//! Settings come from three layers: the YAML suite file, `DEMOFLOW_*`
//! environment variables (bound through clap) and flags. Later layers win.

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use demoflow::{FixtureSet, SuiteConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - progress and summary
    #[default]
    Normal,
    /// Verbose - per-scenario detail
    Verbose,
    /// Debug - everything, including locator probes
    Debug,
}

impl Verbosity {
    /// Map `-q` and the `-v` count to a level
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Check if debug mode
    #[must_use]
    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }

    /// Default log filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// CLI presentation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

/// Load the suite file (or defaults) and apply the run flags on top
pub fn resolve_suite_config(path: &Path, args: &RunArgs) -> CliResult<SuiteConfig> {
    let mut config = SuiteConfig::load_or_default(path)?;
    if let Some(url) = &args.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(fixtures) = &args.fixtures {
        config.fixtures.clone_from(fixtures);
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(ms) = args.timeout {
        if ms == 0 {
            return Err(CliError::invalid_argument("--timeout must be positive"));
        }
        config = config.with_timeouts(ms);
    }
    if let Some(dir) = &args.output {
        config.output_dir.clone_from(dir);
    }
    if args.browser_path.is_some() {
        config.browser_path.clone_from(&args.browser_path);
    }
    config.capture_screenshots |= args.screenshots;
    config.no_sandbox |= args.no_sandbox;
    config.cta_label_fallback |= args.cta_label_fallback;
    if args.headed {
        config.headless = false;
    }
    config.validate()?;
    Ok(config)
}

/// Load the fixture set.
///
/// A missing file is only tolerated when it is the default path nobody asked
/// for; the built-in payloads stand in and a warning is logged.
pub fn load_fixtures(path: &Path, explicit: bool) -> CliResult<FixtureSet> {
    if !explicit && !path.exists() {
        warn!(path = %path.display(), "fixture file not found; using built-in payloads");
        return Ok(FixtureSet::builtin());
    }
    Ok(FixtureSet::load(path)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Debug);
        }

        #[test]
        fn test_predicates() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(Verbosity::Debug.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Debug.is_debug());
        }

        #[test]
        fn test_log_filter() {
            assert_eq!(Verbosity::Normal.log_filter(), "warn");
            assert_eq!(Verbosity::Debug.log_filter(), "debug");
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_fixed_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_defaults_without_file() {
            let dir = tempfile::tempdir().unwrap();
            let config =
                resolve_suite_config(&dir.path().join("missing.yaml"), &RunArgs::default())
                    .unwrap();
            assert_eq!(config, SuiteConfig::default());
        }

        #[test]
        fn test_flags_override_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("demoflow.yaml");
            std::fs::write(&path, "base_url: https://a.example.com\nretries: 4\n").unwrap();
            let args = RunArgs {
                base_url: Some("https://b.example.com".to_string()),
                timeout: Some(750),
                headed: true,
                cta_label_fallback: true,
                ..RunArgs::default()
            };
            let config = resolve_suite_config(&path, &args).unwrap();
            assert_eq!(config.base_url, "https://b.example.com");
            assert_eq!(config.retries, 4);
            assert_eq!(config.success_timeout_ms, 750);
            assert!(!config.headless);
            assert!(config.cta_label_fallback);
        }

        #[test]
        fn test_zero_timeout_rejected() {
            let args = RunArgs {
                timeout: Some(0),
                ..RunArgs::default()
            };
            let err = resolve_suite_config(Path::new("/nonexistent/demoflow.yaml"), &args)
                .unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument { .. }));
        }

        #[test]
        fn test_invalid_url_rejected() {
            let args = RunArgs {
                base_url: Some("ftp://example.com".to_string()),
                ..RunArgs::default()
            };
            let err = resolve_suite_config(Path::new("/nonexistent/demoflow.yaml"), &args)
                .unwrap_err();
            assert!(err.to_string().contains("http(s)"));
        }
    }

    mod fixture_tests {
        use super::*;

        #[test]
        fn test_missing_default_falls_back() {
            let set = load_fixtures(&PathBuf::from("/nonexistent/testData.json"), false).unwrap();
            assert!(set.valid().is_ok());
        }

        #[test]
        fn test_missing_explicit_fails() {
            let err =
                load_fixtures(&PathBuf::from("/nonexistent/testData.json"), true).unwrap_err();
            assert!(err.to_string().contains("cannot read"));
        }

        #[test]
        fn test_loads_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("data.json");
            std::fs::write(
                &path,
                r#"{"valid":{"email":"a@b.co"},"invalid":{"email":"nope"}}"#,
            )
            .unwrap();
            let set = load_fixtures(&path, true).unwrap();
            assert_eq!(set.valid().unwrap().len(), 1);
        }
    }
}
