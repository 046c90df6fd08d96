//! Scenario catalogue.
//!
//! Each scenario is an independent walk through the demo-request flow that
//! starts from a fresh navigation to the site root. A scenario either
//! succeeds, optionally with a short note for the report, or fails with the
//! first error it hits.

use crate::assertion::Assertion;
use crate::config::SuiteConfig;
use crate::driver::{join_url, PageDriver};
use crate::fixture::FixtureSet;
use crate::pages::{FormAgent, NavigationAgent};
use crate::result::{DemoflowError, DemoflowResult};
use crate::wait::poll_until;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Alias of the stubbed submission in every submitting scenario
pub const SUBMISSION_ALIAS: &str = "submitCTA";

/// Named scenarios, in catalogue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioId {
    /// Every "Get a Demo" CTA is visible
    CtaVisible,
    /// Every CTA leads to the form, by navigation or by scrolling
    CtaIteration,
    /// The first CTA leads to a loaded form
    CtaOpensForm,
    /// A valid payload reaches the thank-you page
    ValidSubmission,
    /// An empty form is rejected
    EmptyRequiredFields,
    /// A malformed email and phone are rejected
    InvalidInputs,
    /// Malformed emails produce the browser's email hints
    InvalidEmailMessages,
    /// The phone field keeps at most ten digits
    PhoneMasking,
    /// The assistance address is offered
    AssistanceLink,
    /// The patient portal link, if present, opens the portal
    PatientPortalLink,
}

impl ScenarioId {
    /// Every scenario, in catalogue order
    pub const ALL: [Self; 10] = [
        Self::CtaVisible,
        Self::CtaIteration,
        Self::CtaOpensForm,
        Self::ValidSubmission,
        Self::EmptyRequiredFields,
        Self::InvalidInputs,
        Self::InvalidEmailMessages,
        Self::PhoneMasking,
        Self::AssistanceLink,
        Self::PatientPortalLink,
    ];

    /// Kebab-case name used on the command line and in reports
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CtaVisible => "cta-visible",
            Self::CtaIteration => "cta-iteration",
            Self::CtaOpensForm => "cta-opens-form",
            Self::ValidSubmission => "valid-submission",
            Self::EmptyRequiredFields => "empty-required-fields",
            Self::InvalidInputs => "invalid-inputs",
            Self::InvalidEmailMessages => "invalid-email-messages",
            Self::PhoneMasking => "phone-masking",
            Self::AssistanceLink => "assistance-link",
            Self::PatientPortalLink => "patient-portal-link",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::CtaVisible => "all 'Get a Demo' CTAs are visible",
            Self::CtaIteration => "every CTA navigates or scrolls to the form",
            Self::CtaOpensForm => "the first CTA opens the demo form",
            Self::ValidSubmission => "a valid request reaches the thank-you page",
            Self::EmptyRequiredFields => "an empty form is rejected",
            Self::InvalidInputs => "an invalid email and phone are rejected",
            Self::InvalidEmailMessages => "malformed emails show the browser's hints",
            Self::PhoneMasking => "the phone field keeps digits only, at most ten",
            Self::AssistanceLink => "the assistance email is offered",
            Self::PatientPortalLink => "the patient link opens the portal",
        }
    }

    /// Run the scenario once
    pub async fn run(self, ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
        debug!(scenario = self.name(), "running");
        match self {
            Self::CtaVisible => cta_visible(ctx).await,
            Self::CtaIteration => cta_iteration(ctx).await,
            Self::CtaOpensForm => cta_opens_form(ctx).await,
            Self::ValidSubmission => valid_submission(ctx).await,
            Self::EmptyRequiredFields => empty_required_fields(ctx).await,
            Self::InvalidInputs => invalid_inputs(ctx).await,
            Self::InvalidEmailMessages => invalid_email_messages(ctx).await,
            Self::PhoneMasking => phone_masking(ctx).await,
            Self::AssistanceLink => assistance_link(ctx).await,
            Self::PatientPortalLink => patient_portal_link(ctx).await,
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioId {
    type Err = DemoflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| DemoflowError::Config {
                message: format!("unknown scenario '{s}'"),
            })
    }
}

/// What every scenario runs against
#[derive(Clone, Copy)]
pub struct ScenarioContext<'a> {
    /// Browser document
    pub driver: &'a dyn PageDriver,
    /// Suite configuration
    pub config: &'a SuiteConfig,
    /// Payload sets
    pub fixtures: &'a FixtureSet,
}

impl fmt::Debug for ScenarioContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("config", self.config)
            .field("fixtures", self.fixtures)
            .finish_non_exhaustive()
    }
}

impl<'a> ScenarioContext<'a> {
    /// Bundle a driver, configuration and fixtures
    #[must_use]
    pub const fn new(
        driver: &'a dyn PageDriver,
        config: &'a SuiteConfig,
        fixtures: &'a FixtureSet,
    ) -> Self {
        Self {
            driver,
            config,
            fixtures,
        }
    }

    fn home(&self) -> DemoflowResult<NavigationAgent<'a>> {
        NavigationAgent::new(self.driver, self.config)
    }

    /// Open the site, follow the first CTA and wait for the form
    async fn open_form(&self) -> DemoflowResult<FormAgent<'a>> {
        let home = self.home()?;
        home.open().await?;
        home.activate_first_call_to_action().await?;
        let mut form = FormAgent::new(self.driver, self.config)?;
        form.assert_loaded().await?;
        Ok(form)
    }
}

async fn cta_visible(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let home = ctx.home()?;
    home.open().await?;
    let count = home.assert_call_to_actions_visible().await?;
    Ok(Some(format!("{count} CTA(s) visible")))
}

async fn cta_iteration(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let home = ctx.home()?;
    home.open().await?;
    let total = home.discover_call_to_actions().await?.len();
    Assertion::is_true(total > 0, "at least one 'Get a Demo' CTA", "none").into_result()?;

    let mut scrolled = 0;
    for index in 0..total {
        home.open().await?;
        let path_before = ctx.driver.current_path().await?;
        let offset_before = home.scroll_offset().await?;
        home.activate_call_to_action(index).await?;

        if ctx.driver.current_path().await? == path_before {
            let condition = format!("CTA #{index} to scroll past {offset_before}");
            let home = &home;
            poll_until(&condition, ctx.config.command_wait(), move || async move {
                let offset = home.scroll_offset().await?;
                Ok((offset > offset_before).then_some(offset))
            })
            .await?;
            scrolled += 1;
        }

        FormAgent::new(ctx.driver, ctx.config)?.assert_loaded().await?;
        debug!(index, "CTA leads to the form");
    }
    Ok(Some(format!(
        "{total} CTA(s) lead to the form, {scrolled} by scrolling"
    )))
}

async fn cta_opens_form(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    ctx.open_form().await?;
    Ok(Some(format!("form at {}", ctx.driver.current_path().await?)))
}

async fn valid_submission(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let mut form = ctx.open_form().await?;
    form.fill_form(ctx.fixtures.valid()?).await?;
    let alias = form.stub_submission(SUBMISSION_ALIAS).await?;
    form.submit().await?;
    let exchange = form.await_submission(&alias).await?;
    form.assert_success().await?;
    info!(status = exchange.status, "valid request accepted");
    Ok(None)
}

async fn empty_required_fields(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let mut form = ctx.open_form().await?;
    form.submit().await?;
    let reasons = form.assert_validation_errors().await?;
    form.assert_not_thank_you().await?;
    Ok(Some(reasons.join("; ")))
}

async fn invalid_inputs(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let mut form = ctx.open_form().await?;
    form.fill_form(ctx.fixtures.invalid()?).await?;
    form.submit().await?;
    let reasons = form.assert_validation_errors().await?;
    form.assert_not_thank_you().await?;
    Ok(Some(reasons.join("; ")))
}

async fn invalid_email_messages(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let mut form = ctx.open_form().await?;
    form.fill_form(&ctx.fixtures.valid()?.clone().without("email"))
        .await?;

    form.clear_field("email").await?;
    form.type_into("email", "tester").await?;
    form.submit().await?;
    let missing_at = form.validation_message("email").await?.to_lowercase();
    Assertion::contains(&missing_at, "'tester'").into_result()?;
    Assertion::contains(&missing_at, "include an '@'").into_result()?;
    form.assert_not_thank_you().await?;
    form.assert_validation_errors().await?;

    form.clear_field("email").await?;
    form.type_into("email", "tester@").await?;
    form.submit().await?;
    let incomplete = form.validation_message("email").await?.to_lowercase();
    Assertion::contains(&incomplete, "'tester@'").into_result()?;
    Assertion::contains(&incomplete, "part following '@'").into_result()?;
    Assertion::contains(&incomplete, "incomplete").into_result()?;
    form.assert_not_thank_you().await?;
    form.assert_validation_errors().await?;
    Ok(None)
}

fn digit_count(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}

async fn phone_masking(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let mut form = ctx.open_form().await?;
    form.fill_form(&ctx.fixtures.valid()?.clone().without("phone"))
        .await?;

    for (typed, expected) in [("abc!@#", 0), ("1234567890", 10), ("123abc", 10)] {
        form.type_into("phone", typed).await?;
        let value = form.field_value("phone").await?;
        Assertion::equals(&expected, &digit_count(&value)).into_result()?;
    }

    let alias = form.stub_submission(SUBMISSION_ALIAS).await?;
    form.submit().await?;
    form.await_submission(&alias).await?;
    form.assert_success().await?;
    Ok(None)
}

async fn assistance_link(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let form = ctx.open_form().await?;
    let email = &ctx.config.assistance_email;
    if let Some(href) = form.assistance_link().await? {
        Assertion::contains(&href, email).into_result()?;
        return Ok(Some(href));
    }
    let text = ctx.driver.page_text().await?;
    Assertion::contains(&text, email).into_result()?;
    Ok(Some(format!("no mailto link; '{email}' shown as text")))
}

async fn patient_portal_link(ctx: &ScenarioContext<'_>) -> DemoflowResult<Option<String>> {
    let form = ctx.open_form().await?;
    let Some(href) = form.patient_portal_link().await? else {
        return Ok(Some("no patient link; skipped".to_string()));
    };
    let target = join_url(&ctx.driver.current_url().await?, &href)?;
    ctx.driver.navigate(&target).await?;
    let driver = ctx.driver;
    let path = poll_until(
        "patient portal to open",
        ctx.config.navigation_wait(),
        move || async move {
            let path = driver.current_path().await?;
            Ok(path.contains("/patients").then_some(path))
        },
    )
    .await?
    .into_value();
    Ok(Some(path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::ALL {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
            assert!(!id.description().is_empty());
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "cta-everything".parse::<ScenarioId>().unwrap_err();
        assert!(err.to_string().contains("unknown scenario 'cta-everything'"));
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ScenarioId::InvalidEmailMessages).unwrap();
        assert_eq!(json, "\"invalid-email-messages\"");
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count("(555) 123-4567"), 10);
        assert_eq!(digit_count("abc"), 0);
    }

    #[tokio::test]
    async fn test_every_scenario_passes_on_demo_site() {
        let driver = MockDriver::demo_site();
        let config = SuiteConfig::default().with_timeouts(200).with_poll_interval(5);
        let fixtures = FixtureSet::builtin();
        let ctx = ScenarioContext::new(&driver, &config, &fixtures);
        for id in ScenarioId::ALL {
            driver.network().clear();
            if let Err(e) = id.run(&ctx).await {
                panic!("{id} failed: {e}");
            }
        }
    }
}
