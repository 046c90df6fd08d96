//! Demo-request form: field catalogue, filling, submission and outcome.
//!
//! Every logical field resolves through a [`ResilientLocator`] built from
//! the catalogue below, so the agent never holds element handles across
//! calls. The agent tracks the [`FlowState`] of the form and refuses
//! operations the state machine does not allow.

use crate::assertion::Assertion;
use crate::config::SuiteConfig;
use crate::driver::{ElementHandle, PageDriver};
use crate::fixture::Payload;
use crate::flow::{FlowEvent, FlowState, SubmissionOutcome};
use crate::locator::{FieldDescriptor, ResilientLocator, TextPattern};
use crate::network::{CapturedExchange, HttpMethod, MockResponse, UrlPattern};
use crate::page_object::PageObject;
use crate::result::{DemoflowError, DemoflowResult};
use crate::wait::{poll_until, WaitOptions};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

/// Endpoint the form posts to
pub const SUBMISSION_PATTERN: &str = "**/api/cta*";

/// Path of the thank-you page
pub const THANK_YOU_PATH: &str = r"/thank-you(/.*)?$";

/// Confirmation shown after a successful request, with an optional brand
pub const SUCCESS_PHRASE: &str = r"thanks\s*for\s*requesting\s*(a\s*(\w+\s*)?)?demo";

/// Generic wording of a validation failure
pub const ERROR_PHRASE: &str = r"required|enter a valid|invalid|please";

/// Visible label of the submit button
pub const SUBMIT_LABEL: &str = "book a demo";

/// Logical fields and their candidates, in fill order
pub const FIELD_CATALOGUE: &[(&str, &[&str])] = &[
    ("clinicName", &["#clinicName"]),
    ("numberOfProviders", &["#numberOfProviders"]),
    ("fullName", &["#fullName"]),
    ("email", &["#email"]),
    ("clinicSoftware", &["#clinicSoftware"]),
    ("phone", &["#mobilePhone"]),
    ("role", &[r#"select[name*="role"]"#, r#"input[name*="role"]"#]),
    ("heardAboutUs", &["#heardAboutUs"]),
    (
        "message",
        &[
            r#"textarea[name*="message"]"#,
            r#"textarea[placeholder*="Message"]"#,
            r#"textarea[id*="message"]"#,
        ],
    ),
];

/// Descriptor for a logical field; unknown names get no candidates
#[must_use]
pub fn descriptor(name: &str) -> FieldDescriptor {
    FIELD_CATALOGUE
        .iter()
        .find(|(field, _)| *field == name)
        .map_or_else(
            || FieldDescriptor::css(name, &[]),
            |(field, selectors)| FieldDescriptor::css(field, selectors),
        )
}

/// Keep ASCII digits only
#[must_use]
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn is_phone_like(name: &str, element: &ElementHandle) -> bool {
    name == "phone" || element.input_type.as_deref() == Some("tel")
}

fn pattern(source: &str) -> DemoflowResult<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(|e| DemoflowError::Config {
            message: format!("invalid pattern '{source}': {e}"),
        })
}

/// Demo form page object
pub struct FormAgent<'a> {
    driver: &'a dyn PageDriver,
    config: &'a SuiteConfig,
    email: ResilientLocator,
    submit: ResilientLocator,
    thank_you: Regex,
    success: Regex,
    error_phrase: Regex,
    state: FlowState,
}

impl std::fmt::Debug for FormAgent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormAgent")
            .field("state", &self.state)
            .field("submit", &self.submit)
            .finish_non_exhaustive()
    }
}

impl<'a> FormAgent<'a> {
    /// Form page object over `driver`, in the `Unloaded` state
    pub fn new(driver: &'a dyn PageDriver, config: &'a SuiteConfig) -> DemoflowResult<Self> {
        let submit = ResilientLocator::new("submit")
            .css(r#"button[type="submit"]"#)
            .css(r#"input[type="submit"]"#)
            .css_with_text("button", TextPattern::phrase(SUBMIT_LABEL)?);
        Ok(Self {
            driver,
            config,
            email: descriptor("email").locator(),
            submit,
            thank_you: Regex::new(THANK_YOU_PATH).map_err(|e| DemoflowError::Config {
                message: e.to_string(),
            })?,
            success: pattern(SUCCESS_PHRASE)?,
            error_phrase: pattern(ERROR_PHRASE)?,
            state: FlowState::Unloaded,
        })
    }

    /// Current flow state
    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    fn transition(&mut self, event: FlowEvent) -> DemoflowResult<()> {
        let next = self.state.on(event)?;
        debug!(from = %self.state, to = %next, ?event, "flow transition");
        self.state = next;
        Ok(())
    }

    /// Resolve a logical field against the live document
    pub async fn resolve_field(&self, name: &str) -> DemoflowResult<ElementHandle> {
        descriptor(name).locator().resolve(self.driver).await
    }

    /// Wait for the email field and the submit control. A form that never
    /// shows up fails with the locator error of the missing control.
    pub async fn assert_loaded(&mut self) -> DemoflowResult<()> {
        match self.wait_until_loaded().await {
            Ok(()) => {}
            Err(DemoflowError::Timeout { .. }) => {
                self.email.resolve(self.driver).await?;
                self.submit.resolve(self.driver).await?;
            }
            Err(e) => return Err(e),
        }
        self.transition(FlowEvent::Load)
    }

    /// Set one field. Selects choose the matching option; other controls
    /// are cleared and typed into, phone-like fields with digits only.
    pub async fn fill_field(&mut self, name: &str, value: &str) -> DemoflowResult<()> {
        let element = self.resolve_field(name).await?;
        if element.is_select() {
            self.driver.select_option(&element, value).await?;
        } else {
            let text = if is_phone_like(name, &element) {
                digits_only(value)
            } else {
                value.to_string()
            };
            self.driver.clear(&element).await?;
            self.driver.type_text(&element, &text).await?;
        }
        debug!(field = name, "filled");
        self.transition(FlowEvent::Fill)
    }

    /// Fill every catalogued field the payload defines, in catalogue order.
    /// Returns the number of fields filled.
    pub async fn fill_form(&mut self, payload: &Payload) -> DemoflowResult<usize> {
        let mut filled = 0;
        for (name, _) in FIELD_CATALOGUE {
            if let Some(value) = payload.value_for(name) {
                self.fill_field(name, &value.to_string()).await?;
                filled += 1;
            }
        }
        info!(filled, "form filled");
        Ok(filled)
    }

    /// Type into a field without clearing or normalising it
    pub async fn type_into(&mut self, name: &str, text: &str) -> DemoflowResult<()> {
        let element = self.resolve_field(name).await?;
        self.driver.type_text(&element, text).await?;
        self.transition(FlowEvent::Fill)
    }

    /// Empty a field
    pub async fn clear_field(&mut self, name: &str) -> DemoflowResult<()> {
        let element = self.resolve_field(name).await?;
        self.driver.clear(&element).await?;
        self.transition(FlowEvent::Fill)
    }

    /// Current value of a field
    pub async fn field_value(&self, name: &str) -> DemoflowResult<String> {
        let element = self.resolve_field(name).await?;
        self.driver.value(&element).await
    }

    /// Browser validation message of a field; empty when valid
    pub async fn validation_message(&self, name: &str) -> DemoflowResult<String> {
        let element = self.resolve_field(name).await?;
        self.driver.validation_message(&element).await
    }

    /// Click the submit control
    pub async fn submit(&mut self) -> DemoflowResult<()> {
        let button = self.submit.resolve(self.driver).await?;
        self.driver.click(&button).await?;
        info!(id = %button.id, "form submitted");
        self.transition(FlowEvent::Submit)
    }

    /// Stub the submission endpoint: POST under `alias`, GET under
    /// `{alias}-get`, both answering `200 {"ok":true}`.
    pub async fn stub_submission(&self, alias: &str) -> DemoflowResult<String> {
        let network = self.driver.network();
        let endpoint = UrlPattern::Glob(SUBMISSION_PATTERN.to_string());
        network.stub(
            alias,
            HttpMethod::Post,
            endpoint.clone(),
            MockResponse::acknowledgement(),
        );
        network.stub(
            format!("{alias}-get"),
            HttpMethod::Get,
            endpoint,
            MockResponse::acknowledgement(),
        );
        self.driver.enable_interception().await?;
        info!(alias, pattern = SUBMISSION_PATTERN, "submission stubbed");
        Ok(alias.to_string())
    }

    /// Wait for the aliased exchange and check it succeeded
    pub async fn await_submission(&self, alias: &str) -> DemoflowResult<CapturedExchange> {
        let network = self.driver.network();
        let condition = format!("request '{alias}' to complete");
        let exchange = poll_until(&condition, self.config.submission_wait(), || {
            let found = network.exchange_for(alias);
            async move { Ok(found) }
        })
        .await?
        .into_value();
        Assertion::status_in(exchange.status, 200..=299).into_result()?;
        debug!(alias, status = exchange.status, url = %exchange.url, "submission completed");
        Ok(exchange)
    }

    async fn has_succeeded(&self) -> DemoflowResult<bool> {
        let path = self.driver.current_path().await?;
        if !self.thank_you.is_match(&path) {
            return Ok(false);
        }
        Ok(self.success.is_match(&self.driver.page_text().await?))
    }

    async fn rejection_reasons(&self) -> DemoflowResult<Vec<String>> {
        let mut reasons = self.driver.form_validity().await?.reasons();
        if reasons.is_empty() {
            let text = self.driver.page_text().await?;
            if let Some(hit) = self.error_phrase.find(&text) {
                reasons.push(format!("page mentions '{}'", hit.as_str()));
            }
        }
        Ok(reasons)
    }

    /// Wait for the thank-you path and the success message
    pub async fn assert_success(&mut self) -> DemoflowResult<()> {
        let agent = &*self;
        poll_until(
            "thank-you page with success message",
            self.config.success_wait(),
            || async move { Ok(agent.has_succeeded().await?.then_some(())) },
        )
        .await?;
        info!("success state reached");
        self.transition(FlowEvent::Succeed)
    }

    /// The browser is not on the thank-you page
    pub async fn assert_not_thank_you(&self) -> DemoflowResult<()> {
        let path = self.driver.current_path().await?;
        Assertion::not_matches(&path, &self.thank_you).into_result()
    }

    /// Wait for the form to show it rejected the submission. Returns the
    /// signals that fired.
    pub async fn assert_validation_errors(&mut self) -> DemoflowResult<Vec<String>> {
        let agent = &*self;
        let polled = poll_until("validation errors", self.config.command_wait(), || async move {
            let reasons = agent.rejection_reasons().await?;
            Ok((!reasons.is_empty()).then_some(reasons))
        })
        .await;
        let reasons = match polled {
            Ok(result) => result.into_value(),
            Err(DemoflowError::Timeout { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        Assertion::not_empty(&reasons, "validation errors").into_result()?;
        debug!(?reasons, "submission rejected");
        self.transition(FlowEvent::Reject)?;
        Ok(reasons)
    }

    /// Poll until the submission either succeeds or is rejected.
    /// `Undetermined` when neither shows up within `options`.
    pub async fn classify_outcome(
        &mut self,
        options: WaitOptions,
    ) -> DemoflowResult<SubmissionOutcome> {
        let agent = &*self;
        let polled = poll_until("submission outcome", options, || async move {
            if agent.has_succeeded().await? {
                return Ok(Some(SubmissionOutcome::Success));
            }
            let reasons = agent.rejection_reasons().await?;
            Ok((!reasons.is_empty()).then_some(SubmissionOutcome::Rejected(reasons)))
        })
        .await;

        let outcome = match polled {
            Ok(result) => result.into_value(),
            Err(DemoflowError::Timeout { .. }) => SubmissionOutcome::Undetermined,
            Err(e) => return Err(e),
        };
        match &outcome {
            SubmissionOutcome::Success => self.transition(FlowEvent::Succeed)?,
            SubmissionOutcome::Rejected(_) => self.transition(FlowEvent::Reject)?,
            SubmissionOutcome::Undetermined => {}
        }
        info!(%outcome, "submission classified");
        Ok(outcome)
    }

    /// The first form passes `checkValidity()`
    pub async fn assert_form_valid(&self) -> DemoflowResult<()> {
        let validity = self.driver.form_validity().await?;
        let reasons = validity.reasons().join("; ");
        Assertion::is_true(validity.check_validity, "form to be valid", &reasons).into_result()
    }

    async fn first_href(&self, selector: &str) -> DemoflowResult<Option<String>> {
        let links = self.driver.query_all(selector).await?;
        Ok(links.into_iter().find_map(|link| link.href))
    }

    /// `href` of the first `mailto:` link, if the page has one
    pub async fn assistance_link(&self) -> DemoflowResult<Option<String>> {
        self.first_href(r#"a[href^="mailto:"]"#).await
    }

    /// `href` of the first patient-portal link, if the page has one
    pub async fn patient_portal_link(&self) -> DemoflowResult<Option<String>> {
        self.first_href(r#"a[href*="/patients"]"#).await
    }
}

#[async_trait]
impl PageObject for FormAgent<'_> {
    fn page_name(&self) -> &'static str {
        "demo form"
    }

    async fn is_loaded(&self) -> DemoflowResult<bool> {
        Ok(self.email.probe(self.driver).await?.is_some()
            && self.submit.probe(self.driver).await?.is_some())
    }

    fn load_options(&self) -> WaitOptions {
        self.config.command_wait()
    }
}
