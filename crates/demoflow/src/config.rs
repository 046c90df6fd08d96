//! Suite configuration.
//!
//! Execution parameters for a run: where the site lives, how long each kind
//! of wait may take, the browser viewport, retry budget and artifact
//! locations. Loaded from YAML (`demoflow.yaml`), every key optional; the
//! CLI layers flags and environment variables on top.

use crate::driver::DriverConfig;
use crate::result::{DemoflowError, DemoflowResult};
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name
pub const CONFIG_FILE: &str = "demoflow.yaml";

/// Browser viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Suite configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Root URL of the site under test
    pub base_url: String,
    /// Bound for ordinary commands (locating, loading the form)
    pub command_timeout_ms: u64,
    /// Bound for the stubbed submission to complete
    pub submission_timeout_ms: u64,
    /// Bound for the thank-you redirect and message
    pub success_timeout_ms: u64,
    /// Bound for page navigations
    pub navigation_timeout_ms: u64,
    /// Poll interval for every wait
    pub poll_interval_ms: u64,
    /// Browser viewport
    pub viewport: Viewport,
    /// Extra attempts for a failed scenario
    pub retries: u32,
    /// Save a screenshot when an attempt fails
    pub capture_screenshots: bool,
    /// Directory for the run report and screenshots
    pub output_dir: PathBuf,
    /// Fixture file with the named payload sets
    pub fixtures: PathBuf,
    /// Address the assistance link must point at
    pub assistance_email: String,
    /// With zero discovered CTAs, accept a button labelled exactly
    /// "Get a Demo" instead of failing
    pub cta_label_fallback: bool,
    /// Run the browser headless
    pub headless: bool,
    /// Chromium executable override
    pub browser_path: Option<String>,
    /// Launch Chromium without its sandbox (containers, CI)
    pub no_sandbox: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cortico.health".to_string(),
            command_timeout_ms: 10_000,
            submission_timeout_ms: 20_000,
            success_timeout_ms: 20_000,
            navigation_timeout_ms: 15_000,
            poll_interval_ms: 100,
            viewport: Viewport::default(),
            retries: 2,
            capture_screenshots: false,
            output_dir: PathBuf::from("target/demoflow"),
            fixtures: PathBuf::from("fixtures/testData.json"),
            assistance_email: "help@cortico.health".to_string(),
            cta_label_fallback: false,
            headless: true,
            browser_path: None,
            no_sandbox: false,
        }
    }
}

impl SuiteConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML; absent keys keep their defaults
    pub fn from_yaml(yaml: &str) -> DemoflowResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn load(path: &Path) -> DemoflowResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| DemoflowError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Load `path` if it exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> DemoflowResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> DemoflowResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject values no run could use
    pub fn validate(&self) -> DemoflowResult<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| DemoflowError::Config {
            message: format!("base_url '{}' is not a URL: {e}", self.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DemoflowError::Config {
                message: format!("base_url must be http(s), got '{}'", url.scheme()),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(DemoflowError::Config {
                message: "poll_interval_ms must be positive".to_string(),
            });
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(DemoflowError::Config {
                message: "viewport dimensions must be positive".to_string(),
            });
        }
        if !self.assistance_email.contains('@') {
            return Err(DemoflowError::Config {
                message: format!("assistance_email '{}' has no '@'", self.assistance_email),
            });
        }
        Ok(())
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the retry budget
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set every timeout at once (tests use short bounds)
    #[must_use]
    pub const fn with_timeouts(mut self, ms: u64) -> Self {
        self.command_timeout_ms = ms;
        self.submission_timeout_ms = ms;
        self.success_timeout_ms = ms;
        self.navigation_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Enable screenshots of failed attempts
    #[must_use]
    pub const fn with_screenshots(mut self, enabled: bool) -> Self {
        self.capture_screenshots = enabled;
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the fixture file
    #[must_use]
    pub fn with_fixtures(mut self, path: impl Into<PathBuf>) -> Self {
        self.fixtures = path.into();
        self
    }

    /// Opt into the zero-CTA label fallback
    #[must_use]
    pub const fn with_cta_label_fallback(mut self, enabled: bool) -> Self {
        self.cta_label_fallback = enabled;
        self
    }

    fn wait(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }

    /// Wait bound for ordinary commands
    #[must_use]
    pub fn command_wait(&self) -> WaitOptions {
        self.wait(self.command_timeout_ms)
    }

    /// Wait bound for the stubbed submission
    #[must_use]
    pub fn submission_wait(&self) -> WaitOptions {
        self.wait(self.submission_timeout_ms)
    }

    /// Wait bound for the success state
    #[must_use]
    pub fn success_wait(&self) -> WaitOptions {
        self.wait(self.success_timeout_ms)
    }

    /// Wait bound for navigations
    #[must_use]
    pub fn navigation_wait(&self) -> WaitOptions {
        self.wait(self.navigation_timeout_ms)
    }

    /// Browser launch settings
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        let mut driver = DriverConfig::new()
            .headless(self.headless)
            .viewport(self.viewport.width, self.viewport.height)
            .navigation_timeout(Duration::from_millis(self.navigation_timeout_ms));
        if let Some(path) = &self.browser_path {
            driver = driver.executable_path(path.clone());
        }
        if self.no_sandbox {
            driver = driver.no_sandbox();
        }
        driver
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = SuiteConfig::default();
            assert_eq!(config.base_url, "https://cortico.health");
            assert_eq!(config.command_timeout_ms, 10_000);
            assert_eq!(config.submission_timeout_ms, 20_000);
            assert_eq!(config.success_timeout_ms, 20_000);
            assert_eq!(config.navigation_timeout_ms, 15_000);
            assert_eq!(config.viewport, Viewport { width: 1280, height: 800 });
            assert_eq!(config.retries, 2);
            assert!(!config.capture_screenshots);
            assert!(!config.cta_label_fallback);
            assert!(config.headless);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_wait_options_follow_config() {
            let config = SuiteConfig::default().with_poll_interval(25);
            let wait = config.submission_wait();
            assert_eq!(wait.timeout_ms, 20_000);
            assert_eq!(wait.poll_interval_ms, 25);
        }

        #[test]
        fn test_driver_config() {
            let mut config = SuiteConfig::default();
            config.no_sandbox = true;
            config.browser_path = Some("/opt/chrome".to_string());
            let driver = config.driver_config();
            assert!(!driver.sandbox);
            assert_eq!(driver.viewport_width, 1280);
            assert_eq!(driver.navigation_timeout, Duration::from_millis(15_000));
            assert_eq!(driver.executable_path.as_deref(), Some("/opt/chrome"));
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = SuiteConfig::from_yaml(
                "base_url: http://localhost:8080\nretries: 0\nviewport:\n  width: 800\n  height: 600\n",
            )
            .unwrap();
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.retries, 0);
            assert_eq!(config.viewport.width, 800);
            assert_eq!(config.success_timeout_ms, 20_000);
        }

        #[test]
        fn test_round_trip() {
            let config = SuiteConfig::default().with_cta_label_fallback(true);
            let parsed = SuiteConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
            assert_eq!(parsed, config);
        }

        #[test]
        fn test_invalid_values_rejected() {
            assert!(SuiteConfig::from_yaml("base_url: not a url").is_err());
            assert!(SuiteConfig::from_yaml("base_url: ftp://x.test").is_err());
            assert!(SuiteConfig::from_yaml("poll_interval_ms: 0").is_err());
            assert!(SuiteConfig::from_yaml("assistance_email: nobody").is_err());
            assert!(SuiteConfig::from_yaml("retries: many").is_err());
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(CONFIG_FILE);
            std::fs::write(&path, "capture_screenshots: true\n").unwrap();
            assert!(SuiteConfig::load(&path).unwrap().capture_screenshots);
            assert_eq!(
                SuiteConfig::load_or_default(&dir.path().join("missing.yaml")).unwrap(),
                SuiteConfig::default()
            );
        }
    }
}
