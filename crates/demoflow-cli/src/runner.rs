//! Suite execution for the `run` command

use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use demoflow::mock::MOCK_ORIGIN;
use demoflow::{
    FixtureSet, MockDriver, PageDriver, RunEvent, ScenarioId, ScenarioRunner, SuiteConfig,
    SuiteResults,
};
use tracing::info;

/// Resolve scenario names; none selects the whole catalogue
pub fn select_scenarios(names: &[String]) -> CliResult<Vec<ScenarioId>> {
    if names.is_empty() {
        return Ok(ScenarioId::ALL.to_vec());
    }
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let id = name
            .parse::<ScenarioId>()
            .map_err(|e| CliError::invalid_argument(e.to_string()))?;
        if !selected.contains(&id) {
            selected.push(id);
        }
    }
    Ok(selected)
}

/// Drives one suite run and reports it
#[derive(Debug)]
pub struct SuiteRunner {
    config: SuiteConfig,
    fixtures: FixtureSet,
    reporter: ProgressReporter,
    fail_fast: bool,
    mock: bool,
}

impl SuiteRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: SuiteConfig, fixtures: FixtureSet, reporter: ProgressReporter) -> Self {
        Self {
            config,
            fixtures,
            reporter,
            fail_fast: false,
            mock: false,
        }
    }

    /// Stop after the first failure
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Use the scripted in-memory site instead of a browser
    #[must_use]
    pub fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        if mock {
            self.config.base_url = MOCK_ORIGIN.to_string();
        }
        self
    }

    /// Effective suite configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run `scenarios`, write the report and print the summary
    pub async fn run(&mut self, scenarios: &[ScenarioId]) -> CliResult<SuiteResults> {
        let suite = if self.mock {
            let driver = MockDriver::demo_site();
            self.execute(&driver, scenarios).await
        } else {
            self.run_in_browser(scenarios).await?
        };

        let report = suite.write_report(&self.config.output_dir)?;
        self.reporter.summary(&suite);
        self.reporter.info(&format!("report: {}", report.display()));
        Ok(suite)
    }

    #[cfg(feature = "browser")]
    async fn run_in_browser(&mut self, scenarios: &[ScenarioId]) -> CliResult<SuiteResults> {
        let driver = demoflow::ChromiumDriver::launch(self.config.driver_config()).await?;
        let suite = self.execute(&driver, scenarios).await;
        if let Err(e) = driver.close().await {
            tracing::warn!(error = %e, "browser did not close cleanly");
        }
        Ok(suite)
    }

    #[cfg(not(feature = "browser"))]
    async fn run_in_browser(&mut self, _scenarios: &[ScenarioId]) -> CliResult<SuiteResults> {
        Err(CliError::config(
            "browser support not compiled in; rebuild with --features browser or use --mock",
        ))
    }

    async fn execute(&mut self, driver: &dyn PageDriver, scenarios: &[ScenarioId]) -> SuiteResults {
        info!(
            base_url = %self.config.base_url,
            mock = self.mock,
            scenarios = scenarios.len(),
            "running suite"
        );
        self.reporter.header(&format!("Demo flow: {}", self.config.base_url));
        self.reporter.start_progress(scenarios.len() as u64, "starting");

        let reporter = &self.reporter;
        let suite = ScenarioRunner::new(driver, &self.config, &self.fixtures)
            .with_fail_fast(self.fail_fast)
            .run_with(scenarios, |event| match event {
                RunEvent::Started(id) => reporter.set_message(id.name()),
                RunEvent::Retrying { id, attempt, error } => {
                    reporter.warning(&format!("{id} attempt {attempt} failed: {error}"));
                }
                RunEvent::Finished(result) => {
                    reporter.scenario(result);
                    reporter.increment(1);
                }
            })
            .await;
        self.reporter.finish();
        suite
    }
}
