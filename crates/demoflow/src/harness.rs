//! Scenario runner and run report.
//!
//! The runner executes scenarios one after another against a single
//! driver. A failed scenario is retried up to the configured budget; every
//! attempt starts with an empty interception table and the scenario's own
//! fresh navigation. Results are collected into a [`SuiteResults`] that can
//! be written out as a JSON report.

use crate::config::SuiteConfig;
use crate::driver::PageDriver;
use crate::fixture::FixtureSet;
use crate::result::{DemoflowError, DemoflowResult};
use crate::scenario::{ScenarioContext, ScenarioId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// File name of the JSON report inside the output directory
pub const REPORT_FILE: &str = "report.json";

/// Result of running a single scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the scenario passed
    pub passed: bool,
    /// Error of the last failed attempt
    pub error: Option<String>,
    /// Attempts made
    pub attempts: u32,
    /// Wall time over all attempts
    pub duration_ms: u64,
    /// Note returned by a passing scenario
    pub note: Option<String>,
    /// Screenshots captured on failed attempts
    pub screenshots: Vec<PathBuf>,
}

impl ScenarioResult {
    /// Create a passing result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
            attempts: 1,
            duration_ms: 0,
            note: None,
            screenshots: Vec::new(),
        }
    }

    /// Create a failing result
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(error.into()),
            ..Self::pass(name)
        }
    }

    /// Set the note
    #[must_use]
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// Results from running the suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Identifier of this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Site under test
    pub base_url: String,
    /// Individual scenario results, in run order
    pub results: Vec<ScenarioResult>,
    /// Total duration
    pub duration_ms: u64,
}

impl SuiteResults {
    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Write the report as pretty JSON into `dir`, creating it if needed
    pub fn write_report(&self, dir: &Path) -> DemoflowResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(REPORT_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }
}

/// Progress notifications from a run
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'r> {
    /// A scenario is about to run
    Started(ScenarioId),
    /// An attempt failed and another follows
    Retrying {
        /// Scenario being retried
        id: ScenarioId,
        /// Attempt that failed, starting at 1
        attempt: u32,
        /// Its error
        error: &'r str,
    },
    /// A scenario finished
    Finished(&'r ScenarioResult),
}

/// Setup errors fail the same way on every attempt
fn is_retryable(error: &DemoflowError) -> bool {
    !matches!(
        error,
        DemoflowError::Config { .. } | DemoflowError::Fixture { .. } | DemoflowError::BrowserLaunch { .. }
    )
}

/// Runs scenarios against one driver
pub struct ScenarioRunner<'a> {
    ctx: ScenarioContext<'a>,
    fail_fast: bool,
}

impl std::fmt::Debug for ScenarioRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("ctx", &self.ctx)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

impl<'a> ScenarioRunner<'a> {
    /// Create a runner
    #[must_use]
    pub const fn new(
        driver: &'a dyn PageDriver,
        config: &'a SuiteConfig,
        fixtures: &'a FixtureSet,
    ) -> Self {
        Self {
            ctx: ScenarioContext::new(driver, config, fixtures),
            fail_fast: false,
        }
    }

    /// Stop after the first failing scenario
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run `scenarios` in order
    pub async fn run(&self, scenarios: &[ScenarioId]) -> SuiteResults {
        self.run_with(scenarios, |_| {}).await
    }

    /// Run `scenarios` in order, reporting progress to `observer`
    pub async fn run_with<F>(&self, scenarios: &[ScenarioId], mut observer: F) -> SuiteResults
    where
        F: FnMut(RunEvent<'_>),
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        info!(%run_id, base_url = %self.ctx.config.base_url, scenarios = scenarios.len(), "suite started");

        let mut results = Vec::with_capacity(scenarios.len());
        for &id in scenarios {
            observer(RunEvent::Started(id));
            let result = self.run_scenario(id, &mut observer).await;
            observer(RunEvent::Finished(&result));
            let stop = self.fail_fast && !result.passed;
            results.push(result);
            if stop {
                warn!(scenario = %id, "stopping after first failure");
                break;
            }
        }

        let suite = SuiteResults {
            run_id,
            started_at,
            base_url: self.ctx.config.base_url.clone(),
            results,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            passed = suite.passed_count(),
            failed = suite.failed_count(),
            duration_ms = suite.duration_ms,
            "suite finished"
        );
        suite
    }

    async fn run_scenario<F>(&self, id: ScenarioId, observer: &mut F) -> ScenarioResult
    where
        F: FnMut(RunEvent<'_>),
    {
        let start = Instant::now();
        let allowed = self.ctx.config.retries.saturating_add(1);
        let mut screenshots = Vec::new();
        let mut attempt = 0;

        let mut result = loop {
            attempt += 1;
            self.ctx.driver.network().clear();
            let (error, retryable) = match id.run(&self.ctx).await {
                Ok(note) => break ScenarioResult::pass(id.name()).with_note(note),
                Err(e) => (e.to_string(), is_retryable(&e)),
            };

            if self.ctx.config.capture_screenshots {
                if let Some(path) = self.capture(id, attempt).await {
                    screenshots.push(path);
                }
            }
            if attempt >= allowed || !retryable {
                break ScenarioResult::fail(id.name(), error);
            }
            warn!(scenario = %id, attempt, %error, "attempt failed, retrying");
            observer(RunEvent::Retrying {
                id,
                attempt,
                error: &error,
            });
        };

        result.attempts = attempt;
        result.duration_ms = start.elapsed().as_millis() as u64;
        result.screenshots = screenshots;
        if result.passed {
            info!(scenario = %id, attempts = attempt, "passed");
        } else {
            warn!(scenario = %id, attempts = attempt, error = ?result.error, "failed");
        }
        result
    }

    /// Save a screenshot of the failed attempt; failures only warn
    async fn capture(&self, id: ScenarioId, attempt: u32) -> Option<PathBuf> {
        let bytes = match self.ctx.driver.screenshot().await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return None,
            Err(e) => {
                warn!(scenario = %id, error = %e, "screenshot failed");
                return None;
            }
        };
        let dir = self.ctx.config.output_dir.join("screenshots");
        let path = dir.join(format!("{id}-attempt{attempt}.png"));
        let written = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, bytes).await
        };
        match written.await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot save screenshot");
                None
            }
        }
    }
}
