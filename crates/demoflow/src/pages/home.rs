//! Home page: consent overlays and "Get a Demo" calls to action.

use crate::assertion::Assertion;
use crate::config::SuiteConfig;
use crate::driver::{join_url, ElementHandle, PageDriver};
use crate::locator::{Candidate, ResilientLocator, TextPattern};
use crate::page_object::PageObject;
use crate::result::{DemoflowError, DemoflowResult};
use crate::wait::{poll_until, WaitOptions};
use async_trait::async_trait;
use tracing::{debug, info};

/// Interactive elements that may carry a CTA label
pub const CTA_SELECTOR: &str = r#"button, [role="button"]"#;

/// Whitespace-bounded "get a demo", never part of a longer word
pub const CTA_PATTERN: &str = r"(^|\s)get\s*a\s*demo(\s|$)";

/// Exact label accepted by the zero-CTA fallback
pub const CTA_LABEL: &str = "Get a Demo";

/// A consent overlay control that was clicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissedOverlay {
    /// Description of the candidate that matched
    pub candidate: String,
    /// The control that was clicked
    pub element: ElementHandle,
}

/// The discovered CTAs of one document.
///
/// The label filter runs lazily as the sequence is walked, and
/// [`CallToActions::iter`] can be called any number of times.
#[derive(Debug, Clone)]
pub struct CallToActions {
    candidates: Vec<ElementHandle>,
    label: TextPattern,
}

impl CallToActions {
    /// Walk the CTAs in document order
    pub fn iter(&self) -> impl Iterator<Item = &ElementHandle> + Clone + '_ {
        self.candidates
            .iter()
            .filter(move |e| self.label.matches_element(e))
    }

    /// Number of CTAs
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether there are none
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// The `index`-th CTA
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ElementHandle> {
        self.iter().nth(index)
    }
}

/// Home page object
pub struct NavigationAgent<'a> {
    driver: &'a dyn PageDriver,
    config: &'a SuiteConfig,
    overlays: ResilientLocator,
    cta_label: TextPattern,
}

impl std::fmt::Debug for NavigationAgent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationAgent")
            .field("base_url", &self.config.base_url)
            .field("overlays", &self.overlays)
            .field("cta_label", &self.cta_label)
            .finish_non_exhaustive()
    }
}

impl<'a> NavigationAgent<'a> {
    /// Home page object over `driver`
    pub fn new(driver: &'a dyn PageDriver, config: &'a SuiteConfig) -> DemoflowResult<Self> {
        let overlays = ResilientLocator::new("consent overlay")
            .css(r#"button[aria-label*="Accept"]"#)
            .css(r#"button[aria-label*="agree"]"#)
            .css_with_text("button", TextPattern::contains("Accept")?)
            .css_with_text("button", TextPattern::contains("I Agree")?)
            .css(r#"[id*="cookie"] button"#)
            .css(".cookie button");
        Ok(Self {
            driver,
            config,
            overlays,
            cta_label: TextPattern::new(CTA_PATTERN)?,
        })
    }

    /// Load the site root and dismiss a consent overlay if one is showing
    pub async fn open(&self) -> DemoflowResult<Option<DismissedOverlay>> {
        let url = join_url(&self.config.base_url, "/")?;
        self.driver.navigate(&url).await?;
        self.wait_until_loaded().await?;
        self.dismiss_overlays().await
    }

    /// Click the first consent control found, trying candidates in priority
    /// order. No overlay is not an error.
    pub async fn dismiss_overlays(&self) -> DemoflowResult<Option<DismissedOverlay>> {
        for candidate in self.overlays.candidates() {
            if let Some(element) = candidate.find_all(self.driver).await?.into_iter().next() {
                self.driver.click(&element).await?;
                info!(candidate = %candidate, "dismissed overlay");
                return Ok(Some(DismissedOverlay {
                    candidate: candidate.to_string(),
                    element,
                }));
            }
        }
        debug!("no overlay to dismiss");
        Ok(None)
    }

    /// Every "Get a Demo" control in the current document
    pub async fn discover_call_to_actions(&self) -> DemoflowResult<CallToActions> {
        let candidates = self.driver.query_all(CTA_SELECTOR).await?;
        Ok(CallToActions {
            candidates,
            label: self.cta_label.clone(),
        })
    }

    /// Every discovered CTA must be visible. Returns how many were checked.
    pub async fn assert_call_to_actions_visible(&self) -> DemoflowResult<usize> {
        let ctas = self.discover_call_to_actions().await?;
        if ctas.is_empty() {
            return self.assert_label_fallback().await.map(|()| 0);
        }
        let driver = self.driver;
        for (index, cta) in ctas.iter().enumerate() {
            let condition = format!("CTA #{index} to be visible");
            poll_until(&condition, self.config.command_wait(), move || async move {
                Ok(driver.refresh(cta).await?.is_visible().then_some(()))
            })
            .await?;
        }
        let count = ctas.len();
        debug!(count, "all CTAs visible");
        Ok(count)
    }

    async fn assert_label_fallback(&self) -> DemoflowResult<()> {
        if !self.config.cta_label_fallback {
            return Assertion::is_true(false, "at least one 'Get a Demo' CTA", "none").into_result();
        }
        let exact = TextPattern::contains(CTA_LABEL)?;
        let buttons = Candidate::css_with_text("button", exact)
            .find_all(self.driver)
            .await?;
        Assertion::not_empty(&buttons, &format!("button labelled '{CTA_LABEL}'")).into_result()
    }

    /// Click the first CTA
    pub async fn activate_first_call_to_action(&self) -> DemoflowResult<ElementHandle> {
        self.activate_call_to_action(0).await
    }

    /// Click the `index`-th CTA
    pub async fn activate_call_to_action(&self, index: usize) -> DemoflowResult<ElementHandle> {
        let ctas = self.discover_call_to_actions().await?;
        let Some(cta) = ctas.get(index).cloned() else {
            if ctas.is_empty() {
                return Err(DemoflowError::LocatorExhausted {
                    field: "Get a Demo CTA".to_string(),
                    candidates: vec![format!("{CTA_SELECTOR} with text {}", self.cta_label)],
                });
            }
            return Err(DemoflowError::assertion(
                format!("CTA #{index}"),
                format!("only {} CTA(s)", ctas.len()),
            ));
        };
        self.driver.click(&cta).await?;
        debug!(index, id = %cta.id, "activated CTA");
        Ok(cta)
    }

    /// Vertical scroll position of the window
    pub async fn scroll_offset(&self) -> DemoflowResult<f64> {
        self.driver.scroll_y().await
    }
}

#[async_trait]
impl PageObject for NavigationAgent<'_> {
    fn page_name(&self) -> &'static str {
        "home"
    }

    async fn is_loaded(&self) -> DemoflowResult<bool> {
        Ok(self.driver.current_url().await? != "about:blank")
    }

    fn load_options(&self) -> WaitOptions {
        self.config.navigation_wait()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{ClickAction, MockDriver, MockElement, MockPage, MockSite, MOCK_ORIGIN};
    use proptest::prelude::*;

    fn config() -> SuiteConfig {
        SuiteConfig::default().with_timeouts(200).with_poll_interval(5)
    }

    fn site_with(home: Vec<MockElement>) -> MockDriver {
        MockDriver::new(MockSite::new(MOCK_ORIGIN).page(MockPage::new("/").elements(home)))
    }

    mod overlay_tests {
        use super::*;

        #[tokio::test]
        async fn test_open_dismisses_consent_banner() {
            let driver = MockDriver::demo_site();
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            let dismissed = home.open().await.unwrap().unwrap();
            assert_eq!(dismissed.candidate, "button with text /Accept/");
            assert!(home.dismiss_overlays().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_aria_label_outranks_text() {
            let driver = site_with(vec![
                MockElement::button("Accept cookies").on_click(ClickAction::Dismiss),
                MockElement::button("OK")
                    .matches(r#"button[aria-label*="agree"]"#)
                    .aria_label("I agree")
                    .on_click(ClickAction::Dismiss),
            ]);
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            let dismissed = home.open().await.unwrap().unwrap();
            assert_eq!(dismissed.candidate, r#"button[aria-label*="agree"]"#);
        }

        #[tokio::test]
        async fn test_no_overlay_is_fine() {
            let driver = site_with(vec![MockElement::button("Get a Demo")]);
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            assert!(home.open().await.unwrap().is_none());
        }
    }

    mod discovery_tests {
        use super::*;

        #[tokio::test]
        async fn test_discovers_buttons_and_role_buttons_only() {
            let driver = MockDriver::demo_site();
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            let ctas = home.discover_call_to_actions().await.unwrap();
            assert_eq!(ctas.len(), 3);
            assert_eq!(ctas.get(2).unwrap().tag_name, "div");
            assert!(ctas.get(3).is_none());
        }

        #[tokio::test]
        async fn test_sequence_is_restartable() {
            let driver = MockDriver::demo_site();
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            let ctas = home.discover_call_to_actions().await.unwrap();
            let first: Vec<_> = ctas.iter().map(|e| e.id.clone()).collect();
            let second: Vec<_> = ctas.iter().map(|e| e.id.clone()).collect();
            assert_eq!(first, second);
        }

        #[tokio::test]
        async fn test_hidden_cta_fails_visibility() {
            let driver = site_with(vec![
                MockElement::button("Get a Demo"),
                MockElement::button("Get a Demo").hidden(),
            ]);
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            let err = home.assert_call_to_actions_visible().await.unwrap_err();
            assert!(matches!(err, DemoflowError::Timeout { .. }));
            assert!(err.to_string().contains("CTA #1 to be visible"));
        }

        #[tokio::test]
        async fn test_fading_cta_is_awaited() {
            let driver = site_with(vec![
                MockElement::button("Get a Demo").fades_in(2),
                MockElement::button("Get a Demo").fades_in(5),
            ]);
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            assert_eq!(home.assert_call_to_actions_visible().await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_all_visible() {
            let driver = MockDriver::demo_site();
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            assert_eq!(home.assert_call_to_actions_visible().await.unwrap(), 3);
        }
    }

    mod fallback_tests {
        use super::*;

        #[tokio::test]
        async fn test_zero_ctas_fail_without_fallback() {
            let driver = site_with(vec![MockElement::button("Contact us")]);
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            assert!(home.assert_call_to_actions_visible().await.is_err());
        }

        #[tokio::test]
        async fn test_label_fallback_accepts_exact_label() {
            // "Get a Demo!" fails the whitespace-bounded pattern but carries the label
            let driver = site_with(vec![MockElement::button("Get a Demo!")]);
            let config = config().with_cta_label_fallback(true);
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            assert_eq!(home.assert_call_to_actions_visible().await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_label_fallback_still_needs_a_button() {
            let driver = site_with(vec![MockElement::button("Contact us")]);
            let config = config().with_cta_label_fallback(true);
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            assert!(home.assert_call_to_actions_visible().await.is_err());
        }
    }

    mod activation_tests {
        use super::*;

        #[tokio::test]
        async fn test_first_cta_navigates() {
            let driver = MockDriver::demo_site();
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            home.activate_first_call_to_action().await.unwrap();
            assert_eq!(driver.current_path().await.unwrap(), "/demo");
        }

        #[tokio::test]
        async fn test_scrolling_cta() {
            let driver = MockDriver::demo_site();
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            assert!(home.scroll_offset().await.unwrap().abs() < f64::EPSILON);
            home.activate_call_to_action(1).await.unwrap();
            assert_eq!(driver.current_path().await.unwrap(), "/");
            assert!(home.scroll_offset().await.unwrap() > 0.0);
        }

        #[tokio::test]
        async fn test_no_cta_is_locator_exhausted() {
            let driver = site_with(vec![]);
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            let err = home.activate_first_call_to_action().await.unwrap_err();
            assert!(matches!(err, DemoflowError::LocatorExhausted { .. }));
        }

        #[tokio::test]
        async fn test_index_out_of_range() {
            let driver = MockDriver::demo_site();
            let config = config();
            let home = NavigationAgent::new(&driver, &config).unwrap();
            home.open().await.unwrap();
            let err = home.activate_call_to_action(7).await.unwrap_err();
            assert!(err.to_string().contains("only 3 CTA(s)"));
        }
    }

    mod pattern_tests {
        use super::*;

        #[test]
        fn test_known_labels() {
            let pattern = TextPattern::new(CTA_PATTERN).unwrap();
            assert!(pattern.is_match("Get a Demo"));
            assert!(pattern.is_match("GET A DEMO"));
            assert!(pattern.is_match("Get a demo today"));
            assert!(pattern.is_match("Getademo"));
            assert!(!pattern.is_match("Get a demonstration"));
            assert!(!pattern.is_match("Budget a demo"));
            assert!(!pattern.is_match("Get a Demo!"));
        }

        proptest! {
            #[test]
            fn prop_surrounding_words_still_match(
                before in "[a-z]{1,8}",
                after in "[a-z]{1,8}",
            ) {
                let pattern = TextPattern::new(CTA_PATTERN).unwrap();
                let label = format!("{before} get a demo {after}");
                prop_assert!(pattern.is_match(&label));
            }

            #[test]
            fn prop_glued_prefix_never_matches(prefix in "[a-z]{1,8}") {
                let pattern = TextPattern::new(CTA_PATTERN).unwrap();
                let label = format!("{prefix}get a demo");
                prop_assert!(!pattern.is_match(&label));
            }

            #[test]
            fn prop_glued_suffix_never_matches(suffix in "[a-z]{1,8}") {
                let pattern = TextPattern::new(CTA_PATTERN).unwrap();
                let label = format!("get a demo{suffix}");
                prop_assert!(!pattern.is_match(&label));
            }
        }
    }
}
