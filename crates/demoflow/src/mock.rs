//! In-memory scripted document.
//!
//! `MockDriver` implements [`PageDriver`] over a small site model: pages
//! keyed by path, each a list of elements in document order that carry the
//! exact selector strings they answer to. Clicks navigate, scroll, dismiss
//! overlays or submit the form; form controls apply Chromium's constraint
//! validation messages and input masks. Submissions go through the shared
//! [`NetworkInterception`] table exactly as the CDP listener would route them.
//!
//! ```
//! use demoflow::mock::MockDriver;
//! use demoflow::PageDriver;
//!
//! # tokio_test_block(async {
//! let driver = MockDriver::demo_site();
//! driver.navigate("https://cortico.health/").await.unwrap();
//! assert_eq!(driver.current_path().await.unwrap(), "/");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f);
//! # }
//! ```

use crate::driver::{ElementHandle, FormValidity, PageDriver};
use crate::network::{HttpMethod, NetworkInterception};
use crate::result::{DemoflowError, DemoflowResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Default origin of the scripted site
pub const MOCK_ORIGIN: &str = "https://cortico.health";

// =============================================================================
// SITE MODEL
// =============================================================================

/// Client-side input mask applied while typing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMask {
    /// Accept every character
    #[default]
    None,
    /// Keep digits only, up to `max`
    Digits {
        /// Maximum number of digits kept
        max: usize,
    },
}

/// Effect of clicking an element
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ClickAction {
    /// Nothing happens
    #[default]
    None,
    /// Navigate to a path or URL
    Navigate(String),
    /// Scroll the window to a vertical offset
    ScrollTo(f64),
    /// Remove every overlay element
    Dismiss,
    /// Submit the form
    Submit,
}

/// One scripted element
#[derive(Debug, Clone)]
pub struct MockElement {
    tag: String,
    selectors: Vec<String>,
    text: Option<String>,
    aria_label: Option<String>,
    input_type: Option<String>,
    href: Option<String>,
    name: Option<String>,
    visible: bool,
    hidden_refreshes: u32,
    prefilled: String,
    overlay: bool,
    required: bool,
    options: Vec<String>,
    mask: InputMask,
    on_click: ClickAction,
}

impl MockElement {
    /// Element with the given tag; it answers to the bare tag selector
    #[must_use]
    pub fn new(tag: &str) -> Self {
        let tag = tag.to_lowercase();
        Self {
            selectors: vec![tag.clone()],
            tag,
            text: None,
            aria_label: None,
            input_type: None,
            href: None,
            name: None,
            visible: true,
            hidden_refreshes: 0,
            prefilled: String::new(),
            overlay: false,
            required: false,
            options: Vec::new(),
            mask: InputMask::None,
            on_click: ClickAction::None,
        }
    }

    /// `<button>` with visible text
    #[must_use]
    pub fn button(text: &str) -> Self {
        Self::new("button").text(text)
    }

    /// `<a>` with an href; clicking follows it
    #[must_use]
    pub fn link(href: &str, text: &str) -> Self {
        let mut element = Self::new("a").text(text);
        element.href = Some(href.to_string());
        element.on_click = ClickAction::Navigate(href.to_string());
        element
    }

    /// Form control with an `id`, answering to `#id`
    #[must_use]
    pub fn control(tag: &str, id: &str) -> Self {
        let mut element = Self::new(tag).matches(&format!("#{id}"));
        element.name = Some(id.to_string());
        element
    }

    /// Add a selector this element answers to
    #[must_use]
    pub fn matches(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    /// Set visible text
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Set `aria-label`
    #[must_use]
    pub fn aria_label(mut self, label: &str) -> Self {
        self.aria_label = Some(label.to_string());
        self
    }

    /// Set `type`
    #[must_use]
    pub fn input_type(mut self, kind: &str) -> Self {
        self.input_type = Some(kind.to_lowercase());
        self
    }

    /// Set `name` (used as the key in the submitted payload)
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Hidden for the first `refreshes` observations (a refresh of this
    /// element or a read of the page text), like content behind a fade-in
    #[must_use]
    pub const fn fades_in(mut self, refreshes: u32) -> Self {
        self.hidden_refreshes = refreshes;
        self
    }

    /// Value present when the page loads, as left by browser autofill
    #[must_use]
    pub fn prefilled(mut self, value: &str) -> Self {
        self.prefilled = value.to_string();
        self
    }

    /// Part of a dismissable overlay
    #[must_use]
    pub const fn overlay(mut self) -> Self {
        self.overlay = true;
        self
    }

    /// Mark as `required`
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// `<option>` values of a select
    #[must_use]
    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| (*o).to_string()).collect();
        self
    }

    /// Digits-only mask capped at `max`
    #[must_use]
    pub const fn digits(mut self, max: usize) -> Self {
        self.mask = InputMask::Digits { max };
        self
    }

    /// Set the click effect
    #[must_use]
    pub fn on_click(mut self, action: ClickAction) -> Self {
        self.on_click = action;
        self
    }

    fn answers_to(&self, selector: &str) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }

    fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "select" | "textarea")
    }
}

/// One scripted page
#[derive(Debug, Clone)]
pub struct MockPage {
    path: String,
    text: Vec<String>,
    elements: Vec<MockElement>,
}

impl MockPage {
    /// Empty page at `path`
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            text: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Add a paragraph of static text
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text.push(text.to_string());
        self
    }

    /// Append an element
    #[must_use]
    pub fn element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Append several elements
    #[must_use]
    pub fn elements(mut self, elements: impl IntoIterator<Item = MockElement>) -> Self {
        self.elements.extend(elements);
        self
    }
}

/// A scripted site: pages keyed by path plus the submission backend
#[derive(Debug, Clone)]
pub struct MockSite {
    origin: String,
    pages: HashMap<String, MockPage>,
    submit_path: String,
    success_path: String,
    backend_status: u16,
}

impl MockSite {
    /// Empty site at `origin`
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            pages: HashMap::new(),
            submit_path: "/api/cta".to_string(),
            success_path: "/thank-you".to_string(),
            backend_status: 200,
        }
    }

    /// Add a page
    #[must_use]
    pub fn page(mut self, page: MockPage) -> Self {
        self.pages.insert(page.path.clone(), page);
        self
    }

    /// Status the live backend answers with when the submission is not stubbed
    #[must_use]
    pub const fn backend_status(mut self, status: u16) -> Self {
        self.backend_status = status;
        self
    }

    /// Origin of the site
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The demo-request form: the catalogued fields plus a submit button
    #[must_use]
    pub fn demo_form() -> Vec<MockElement> {
        vec![
            MockElement::control("input", "clinicName").required(),
            MockElement::control("input", "numberOfProviders")
                .input_type("number")
                .required(),
            MockElement::control("input", "fullName").required(),
            MockElement::control("input", "email")
                .input_type("email")
                .matches("input[type=\"email\"]")
                .required(),
            MockElement::control("select", "clinicSoftware")
                .options(&["", "OSCAR Pro", "TELUS PS Suite", "Accuro", "Other"])
                .required(),
            MockElement::control("input", "mobilePhone")
                .input_type("tel")
                .digits(10)
                .required(),
            MockElement::new("select")
                .name("role")
                .matches("select[name*=\"role\"]")
                .options(&["", "Physician", "Clinic Manager", "MOA", "Other"]),
            MockElement::control("select", "heardAboutUs").options(&[
                "",
                "Google",
                "Referral",
                "Conference",
                "Other",
            ]),
            MockElement::new("textarea")
                .name("message")
                .matches("textarea[name*=\"message\"]")
                .matches("textarea[placeholder*=\"Message\"]"),
            MockElement::button("Book a Demo")
                .input_type("submit")
                .matches("button[type=\"submit\"]")
                .on_click(ClickAction::Submit),
        ]
    }

    /// A marketing site with a consent banner, three "Get a Demo" CTAs (one
    /// navigating to `/demo`, two scrolling to the embedded form), a decoy
    /// control, the demo form, and the thank-you and patient pages.
    #[must_use]
    pub fn demo_site() -> Self {
        let cta = |action: ClickAction| MockElement::button("Get a Demo").on_click(action);
        Self::new(MOCK_ORIGIN)
            .page(
                MockPage::new("/")
                    .text("Cortico - Patient engagement for modern clinics")
                    .element(
                        MockElement::button("Accept all")
                            .matches("[id*=\"cookie\"] button")
                            .overlay()
                            .on_click(ClickAction::Dismiss),
                    )
                    .element(cta(ClickAction::Navigate("/demo".to_string())))
                    .element(cta(ClickAction::ScrollTo(1800.0)))
                    .element(MockElement::button("Get a demonstration"))
                    .element(
                        MockElement::new("div")
                            .matches("[role=\"button\"]")
                            .aria_label("Get a Demo")
                            .on_click(ClickAction::ScrollTo(2400.0)),
                    )
                    .elements(Self::demo_form()),
            )
            .page(
                MockPage::new("/demo")
                    .text("Request a demo")
                    .text("Need assistance? Email help@cortico.health")
                    .elements(Self::demo_form())
                    .element(
                        MockElement::link("mailto:help@cortico.health", "help@cortico.health")
                            .matches("a[href^=\"mailto:\"]"),
                    )
                    .element(
                        MockElement::link("/patients", "Are you a patient?")
                            .matches("a[href*=\"/patients\"]"),
                    ),
            )
            .page(MockPage::new("/thank-you").text("Thanks for requesting a Cortico demo!"))
            .page(MockPage::new("/patients").text("Find your clinic"))
    }
}

// =============================================================================
// LIVE DOCUMENT
// =============================================================================

#[derive(Debug)]
struct LiveElement {
    id: String,
    spec: MockElement,
    value: String,
    removed: bool,
    pending_reveal: u32,
}

impl LiveElement {
    fn handle(&self) -> ElementHandle {
        let mut handle = ElementHandle::new(&self.id, &self.spec.tag);
        handle.text_content = self.spec.text.clone();
        handle.aria_label = self.spec.aria_label.clone();
        handle.input_type = self.spec.input_type.clone();
        handle.href = self.spec.href.clone();
        handle.visible = self.is_visible();
        handle
    }

    const fn is_visible(&self) -> bool {
        self.spec.visible && self.pending_reveal == 0
    }

    fn validation_message(&self) -> String {
        if !self.spec.is_form_control() {
            return String::new();
        }
        if self.spec.required && self.value.is_empty() {
            return if self.spec.tag == "select" {
                "Please select an item in the list.".to_string()
            } else {
                "Please fill out this field.".to_string()
            };
        }
        if self.spec.input_type.as_deref() == Some("email") && !self.value.is_empty() {
            return email_validation_message(&self.value);
        }
        String::new()
    }

    fn is_invalid(&self) -> bool {
        !self.validation_message().is_empty()
    }
}

/// Chromium's message for a malformed `type="email"` value
fn email_validation_message(value: &str) -> String {
    match value.split_once('@') {
        None => format!("Please include an '@' in the email address. '{value}' is missing an '@'."),
        Some(("", _)) => format!("Please enter a part followed by '@'. '{value}' is incomplete."),
        Some((_, "")) => format!("Please enter a part following '@'. '{value}' is incomplete."),
        Some(_) => String::new(),
    }
}

#[derive(Debug)]
struct Document {
    url: String,
    text: Vec<String>,
    elements: Vec<LiveElement>,
    scroll_y: f64,
    attempted_submit: bool,
    error_banner: bool,
}

impl Document {
    fn live(&self) -> impl Iterator<Item = &LiveElement> {
        self.elements.iter().filter(|e| !e.removed)
    }

    fn find(&self, id: &str) -> DemoflowResult<&LiveElement> {
        self.live()
            .find(|e| e.id == id)
            .ok_or_else(|| DemoflowError::Detached { id: id.to_string() })
    }

    fn find_mut(&mut self, id: &str) -> DemoflowResult<&mut LiveElement> {
        self.elements
            .iter_mut()
            .find(|e| e.id == id && !e.removed)
            .ok_or_else(|| DemoflowError::Detached { id: id.to_string() })
    }
}

#[derive(Debug, Default)]
struct MockState {
    document: Option<Document>,
    generation: u64,
    interception: bool,
    history: Vec<String>,
}

impl MockState {
    fn document(&self) -> DemoflowResult<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| DemoflowError::script("no document loaded"))
    }

    fn document_mut(&mut self) -> DemoflowResult<&mut Document> {
        self.document
            .as_mut()
            .ok_or_else(|| DemoflowError::script("no document loaded"))
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// In-memory [`PageDriver`]
#[derive(Debug)]
pub struct MockDriver {
    site: MockSite,
    state: Mutex<MockState>,
    network: NetworkInterception,
}

impl MockDriver {
    /// Driver over `site`; nothing is loaded until the first navigation
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site,
            state: Mutex::new(MockState::default()),
            network: NetworkInterception::new(),
        }
    }

    /// Driver over [`MockSite::demo_site`]
    #[must_use]
    pub fn demo_site() -> Self {
        Self::new(MockSite::demo_site())
    }

    /// Every URL loaded so far, in order
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.lock().map(|s| s.history.clone()).unwrap_or_default()
    }

    fn lock(&self) -> DemoflowResult<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| DemoflowError::script("mock document state poisoned"))
    }

    fn load(&self, state: &mut MockState, target: &str) -> DemoflowResult<()> {
        let base = state
            .document
            .as_ref()
            .map_or_else(|| format!("{}/", self.site.origin), |d| d.url.clone());
        let url = url::Url::parse(&base)?.join(target)?;
        let page = self.site.pages.get(url.path());

        state.generation += 1;
        let generation = state.generation;
        let elements = page
            .map(|p| {
                p.elements
                    .iter()
                    .enumerate()
                    .map(|(index, spec)| LiveElement {
                        id: format!("mock-{generation}-{index}"),
                        spec: spec.clone(),
                        value: spec.prefilled.clone(),
                        removed: false,
                        pending_reveal: spec.hidden_refreshes,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let text = page.map_or_else(|| vec!["404 Not Found".to_string()], |p| p.text.clone());

        debug!(url = %url, found = page.is_some(), "mock navigation");
        state.history.push(url.to_string());
        state.document = Some(Document {
            url: url.to_string(),
            text,
            elements,
            scroll_y: 0.0,
            attempted_submit: false,
            error_banner: false,
        });
        Ok(())
    }

    fn submit(&self, state: &mut MockState) -> DemoflowResult<()> {
        let interception = state.interception;
        let document = state.document_mut()?;

        if document.live().any(LiveElement::is_invalid) {
            document.attempted_submit = true;
            debug!("mock form blocked by constraint validation");
            return Ok(());
        }

        let payload: serde_json::Map<String, serde_json::Value> = document
            .live()
            .filter(|e| e.spec.is_form_control())
            .filter_map(|e| {
                e.spec
                    .name
                    .as_ref()
                    .map(|name| (name.clone(), serde_json::Value::String(e.value.clone())))
            })
            .collect();
        let body = serde_json::to_vec(&payload)?;
        let endpoint = format!("{}{}", self.site.origin, self.site.submit_path);

        let stubbed = if interception {
            self.network
                .handle_request(&endpoint, HttpMethod::Post, Some(body))
        } else {
            None
        };
        let status = stubbed.map_or(self.site.backend_status, |r| r.status);

        if (200..=299).contains(&status) {
            let success = self.site.success_path.clone();
            self.load(state, &success)
        } else {
            document.error_banner = true;
            document
                .text
                .push("Something went wrong. Please try again.".to_string());
            Ok(())
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&self, url: &str) -> DemoflowResult<()> {
        let mut state = self.lock()?;
        self.load(&mut state, url)
    }

    async fn current_url(&self) -> DemoflowResult<String> {
        let state = self.lock()?;
        Ok(state
            .document
            .as_ref()
            .map_or_else(|| "about:blank".to_string(), |d| d.url.clone()))
    }

    async fn query_all(&self, selector: &str) -> DemoflowResult<Vec<ElementHandle>> {
        let state = self.lock()?;
        let parts: Vec<&str> = selector.split(',').map(str::trim).collect();
        Ok(state
            .document()?
            .live()
            .filter(|e| parts.iter().any(|p| e.spec.answers_to(p)))
            .map(LiveElement::handle)
            .collect())
    }

    async fn refresh(&self, element: &ElementHandle) -> DemoflowResult<ElementHandle> {
        let mut state = self.lock()?;
        let live = state.document_mut()?.find_mut(&element.id)?;
        let handle = live.handle();
        live.pending_reveal = live.pending_reveal.saturating_sub(1);
        Ok(handle)
    }

    async fn click(&self, element: &ElementHandle) -> DemoflowResult<()> {
        let mut state = self.lock()?;
        let action = state.document()?.find(&element.id)?.spec.on_click.clone();
        match action {
            ClickAction::None => Ok(()),
            ClickAction::Navigate(target) => self.load(&mut state, &target),
            ClickAction::ScrollTo(y) => {
                state.document_mut()?.scroll_y = y;
                Ok(())
            }
            ClickAction::Dismiss => {
                for e in &mut state.document_mut()?.elements {
                    if e.spec.overlay {
                        e.removed = true;
                    }
                }
                Ok(())
            }
            ClickAction::Submit => self.submit(&mut state),
        }
    }

    async fn clear(&self, element: &ElementHandle) -> DemoflowResult<()> {
        let mut state = self.lock()?;
        state.document_mut()?.find_mut(&element.id)?.value.clear();
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DemoflowResult<()> {
        let mut state = self.lock()?;
        let target = state.document_mut()?.find_mut(&element.id)?;
        if !matches!(target.spec.tag.as_str(), "input" | "textarea") {
            return Err(DemoflowError::assertion(
                "a typeable element",
                format!("<{}>", target.spec.tag),
            ));
        }
        match target.spec.mask {
            InputMask::None => target.value.push_str(text),
            InputMask::Digits { max } => {
                for c in text.chars().filter(char::is_ascii_digit) {
                    if target.value.len() < max {
                        target.value.push(c);
                    }
                }
            }
        }
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, value: &str) -> DemoflowResult<()> {
        let mut state = self.lock()?;
        let target = state.document_mut()?.find_mut(&element.id)?;
        if target.spec.tag != "select" {
            return Err(DemoflowError::assertion(
                "a <select> element",
                format!("<{}>", target.spec.tag),
            ));
        }
        if !target.spec.options.iter().any(|o| o == value) {
            return Err(DemoflowError::assertion(
                format!("an <option> matching '{value}'"),
                format!("options {:?}", target.spec.options),
            ));
        }
        target.value = value.to_string();
        Ok(())
    }

    async fn value(&self, element: &ElementHandle) -> DemoflowResult<String> {
        let state = self.lock()?;
        Ok(state.document()?.find(&element.id)?.value.clone())
    }

    async fn validation_message(&self, element: &ElementHandle) -> DemoflowResult<String> {
        let state = self.lock()?;
        Ok(state.document()?.find(&element.id)?.validation_message())
    }

    async fn form_validity(&self) -> DemoflowResult<FormValidity> {
        let state = self.lock()?;
        let document = state.document()?;
        let form_present = document.live().any(|e| e.spec.is_form_control());
        let invalid_fields = document.live().filter(|e| e.is_invalid()).count();
        Ok(FormValidity {
            form_present,
            invalid_fields,
            aria_invalid: if document.attempted_submit {
                invalid_fields
            } else {
                0
            },
            error_markers: usize::from(document.error_banner),
            check_validity: invalid_fields == 0,
        })
    }

    async fn page_text(&self) -> DemoflowResult<String> {
        let mut state = self.lock()?;
        let document = state.document_mut()?;
        let mut lines = document.text.clone();
        lines.extend(
            document
                .live()
                .filter(|e| e.is_visible())
                .filter_map(|e| e.spec.text.clone()),
        );
        for e in &mut document.elements {
            e.pending_reveal = e.pending_reveal.saturating_sub(1);
        }
        Ok(lines.join("\n"))
    }

    async fn scroll_y(&self) -> DemoflowResult<f64> {
        let state = self.lock()?;
        Ok(state.document()?.scroll_y)
    }

    fn network(&self) -> &NetworkInterception {
        &self.network
    }

    async fn enable_interception(&self) -> DemoflowResult<()> {
        self.lock()?.interception = true;
        Ok(())
    }

    async fn screenshot(&self) -> DemoflowResult<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn close(&self) -> DemoflowResult<()> {
        self.lock()?.document = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::network::{MockResponse, UrlPattern};

    async fn at(path: &str) -> MockDriver {
        let driver = MockDriver::demo_site();
        driver.navigate(&format!("{MOCK_ORIGIN}{path}")).await.unwrap();
        driver
    }

    async fn first(driver: &MockDriver, selector: &str) -> ElementHandle {
        driver
            .query_all(selector)
            .await
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test]
        async fn test_blank_before_navigation() {
            let driver = MockDriver::demo_site();
            assert_eq!(driver.current_url().await.unwrap(), "about:blank");
            assert!(driver.query_all("button").await.is_err());
        }

        #[tokio::test]
        async fn test_relative_navigation_and_history() {
            let driver = at("/").await;
            driver.navigate("/demo").await.unwrap();
            assert_eq!(driver.current_path().await.unwrap(), "/demo");
            assert_eq!(driver.history().len(), 2);
        }

        #[tokio::test]
        async fn test_unknown_path_is_not_found_page() {
            let driver = at("/nope").await;
            assert!(driver.page_text().await.unwrap().contains("404"));
            assert!(driver.query_all("button").await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_navigation_detaches_old_handles() {
            let driver = at("/demo").await;
            let email = first(&driver, "#email").await;
            driver.navigate("/demo").await.unwrap();
            let err = driver.value(&email).await.unwrap_err();
            assert!(matches!(err, DemoflowError::Detached { .. }));
        }
    }

    mod query_tests {
        use super::*;

        #[tokio::test]
        async fn test_comma_selector_keeps_document_order() {
            let driver = at("/").await;
            let found = driver.query_all("button, [role=\"button\"]").await.unwrap();
            let tags: Vec<&str> = found.iter().map(|h| h.tag_name.as_str()).collect();
            assert_eq!(tags, ["button", "button", "button", "button", "div", "button"]);
        }

        #[tokio::test]
        async fn test_same_element_same_id() {
            let driver = at("/demo").await;
            let a = first(&driver, "#email").await;
            let b = first(&driver, "input[type=\"email\"]").await;
            assert_eq!(a.id, b.id);
        }

        #[tokio::test]
        async fn test_dismiss_overlay_removes_banner() {
            let driver = at("/").await;
            let accept = first(&driver, "[id*=\"cookie\"] button").await;
            driver.click(&accept).await.unwrap();
            assert!(driver
                .query_all("[id*=\"cookie\"] button")
                .await
                .unwrap()
                .is_empty());
            assert!(driver.refresh(&accept).await.is_err());
        }
    }

    mod input_tests {
        use super::*;

        #[tokio::test]
        async fn test_phone_mask() {
            let driver = at("/demo").await;
            let phone = first(&driver, "#mobilePhone").await;
            driver.type_text(&phone, "abc!@#").await.unwrap();
            assert_eq!(driver.value(&phone).await.unwrap(), "");
            driver.type_text(&phone, "1234567890").await.unwrap();
            driver.type_text(&phone, "123abc").await.unwrap();
            assert_eq!(driver.value(&phone).await.unwrap(), "1234567890");
        }

        #[tokio::test]
        async fn test_phone_mask_keeps_short_number() {
            let driver = at("/demo").await;
            let phone = first(&driver, "#mobilePhone").await;
            driver.type_text(&phone, "12-34 56").await.unwrap();
            assert_eq!(driver.value(&phone).await.unwrap(), "123456");
            driver.type_text(&phone, "7890123").await.unwrap();
            assert_eq!(driver.value(&phone).await.unwrap(), "1234567890");
        }

        #[tokio::test]
        async fn test_email_messages() {
            let driver = at("/demo").await;
            let email = first(&driver, "#email").await;
            driver.type_text(&email, "tester").await.unwrap();
            let message = driver.validation_message(&email).await.unwrap();
            assert!(message.contains("include an '@'"));
            assert!(message.contains("'tester'"));

            driver.type_text(&email, "@").await.unwrap();
            let message = driver.validation_message(&email).await.unwrap();
            assert!(message.contains("part following '@'"));
            assert!(message.contains("'tester@' is incomplete"));

            driver.clear(&email).await.unwrap();
            driver.type_text(&email, "tester@example.com").await.unwrap();
            assert_eq!(driver.validation_message(&email).await.unwrap(), "");
        }

        #[tokio::test]
        async fn test_select_rejects_unknown_option() {
            let driver = at("/demo").await;
            let select = first(&driver, "#clinicSoftware").await;
            assert!(driver.select_option(&select, "Accuro").await.is_ok());
            assert!(driver.select_option(&select, "Nope").await.is_err());
            assert!(driver.type_text(&select, "x").await.is_err());
        }
    }

    mod submit_tests {
        use super::*;

        async fn fill_required(driver: &MockDriver) {
            for (selector, value) in [
                ("#clinicName", "Clinic"),
                ("#numberOfProviders", "3"),
                ("#fullName", "Pat Doe"),
                ("#email", "pat@example.com"),
                ("#mobilePhone", "5551234567"),
            ] {
                let el = first(driver, selector).await;
                driver.type_text(&el, value).await.unwrap();
            }
            let emr = first(driver, "#clinicSoftware").await;
            driver.select_option(&emr, "Accuro").await.unwrap();
        }

        #[tokio::test]
        async fn test_empty_submit_is_blocked() {
            let driver = at("/demo").await;
            let submit = first(&driver, "button[type=\"submit\"]").await;
            driver.click(&submit).await.unwrap();
            assert_eq!(driver.current_path().await.unwrap(), "/demo");
            let validity = driver.form_validity().await.unwrap();
            assert!(validity.is_rejected());
            assert_eq!(validity.aria_invalid, validity.invalid_fields);
        }

        #[tokio::test]
        async fn test_stubbed_submit_lands_on_thank_you() {
            let driver = at("/demo").await;
            driver.network().stub(
                "submitCTA",
                HttpMethod::Post,
                UrlPattern::Glob("**/api/cta*".to_string()),
                MockResponse::acknowledgement(),
            );
            driver.enable_interception().await.unwrap();
            fill_required(&driver).await;

            let submit = first(&driver, "button[type=\"submit\"]").await;
            driver.click(&submit).await.unwrap();

            assert_eq!(driver.current_path().await.unwrap(), "/thank-you");
            let exchange = driver.network().exchange_for("submitCTA").unwrap();
            assert!(exchange.body_string().unwrap().contains("pat@example.com"));
            assert!(driver
                .page_text()
                .await
                .unwrap()
                .contains("Thanks for requesting"));
        }

        #[tokio::test]
        async fn test_failed_backend_shows_error_marker() {
            let driver = MockDriver::new(MockSite::demo_site().backend_status(500));
            driver.navigate("https://cortico.health/demo").await.unwrap();
            fill_required(&driver).await;
            let submit = first(&driver, "button[type=\"submit\"]").await;
            driver.click(&submit).await.unwrap();

            assert_eq!(driver.current_path().await.unwrap(), "/demo");
            assert_eq!(driver.form_validity().await.unwrap().error_markers, 1);
            assert!(driver.network().exchanges().is_empty());
        }
    }
}
