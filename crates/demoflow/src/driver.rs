//! PageDriver - Abstract Browser Automation Trait
//!
//! Everything a page object needs from the browser is expressed as a small
//! set of DOM primitives against a single document. Implementations:
//!
//! - `ChromiumDriver` (feature `browser`) drives Chromium over CDP
//! - `MockDriver` is an in-memory scripted document used by the test suite
//!
//! Operations are issued one at a time by a scenario and complete in
//! issuance order; the driver never runs two of them concurrently against
//! the same document.

use crate::network::NetworkInterception;
use crate::result::{DemoflowError, DemoflowResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Element handle for DOM interactions.
///
/// The `id` is stable for the lifetime of the element in the current
/// document: resolving the same element twice yields the same id. The other
/// fields are a snapshot taken when the handle was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Stable identity of the element within the current document
    pub id: String,
    /// Lower-case tag name
    pub tag_name: String,
    /// Rendered text (`innerText`, falling back to `textContent`), trimmed
    pub text_content: Option<String>,
    /// `aria-label` attribute, trimmed
    pub aria_label: Option<String>,
    /// `type` attribute for inputs and buttons, lower-cased
    pub input_type: Option<String>,
    /// `href` attribute for links
    pub href: Option<String>,
    /// Whether the element was rendered and visible at snapshot time
    pub visible: bool,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into().to_lowercase(),
            text_content: None,
            aria_label: None,
            input_type: None,
            href: None,
            visible: true,
        }
    }

    /// Check if element is visible
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether this is a `<select>` control
    #[must_use]
    pub fn is_select(&self) -> bool {
        self.tag_name == "select"
    }

    /// Text and accessible label, in that order, for label matching
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.text_content
            .as_deref()
            .into_iter()
            .chain(self.aria_label.as_deref())
    }
}

/// Validity signals of the first `<form>` in the document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValidity {
    /// Whether a form exists at all
    pub form_present: bool,
    /// Fields matching `:invalid`
    pub invalid_fields: usize,
    /// Elements with `aria-invalid="true"`
    pub aria_invalid: usize,
    /// Elements with a recognised error marker (`.error`, `.hs-error-msg`,
    /// `[role="alert"]`, `.error-message`)
    pub error_markers: usize,
    /// Result of `form.checkValidity()`
    pub check_validity: bool,
}

impl FormValidity {
    /// Whether any signal classifies the form as rejected
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        self.form_present
            && (self.invalid_fields > 0
                || self.aria_invalid > 0
                || self.error_markers > 0
                || !self.check_validity)
    }

    /// Short description of the signals that fired
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.invalid_fields > 0 {
            reasons.push(format!("{} field(s) :invalid", self.invalid_fields));
        }
        if self.aria_invalid > 0 {
            reasons.push(format!("{} field(s) aria-invalid", self.aria_invalid));
        }
        if self.error_markers > 0 {
            reasons.push(format!("{} error marker(s)", self.error_markers));
        }
        if self.form_present && !self.check_validity {
            reasons.push("checkValidity() is false".to_string());
        }
        reasons
    }
}

/// Browser configuration for driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            navigation_timeout: Duration::from_secs(30),
            executable_path: None,
            sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the Chromium executable
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Abstract driver over one browser document.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL and wait for the document to load
    async fn navigate(&self, url: &str) -> DemoflowResult<()>;

    /// Current `location.href`
    async fn current_url(&self) -> DemoflowResult<String>;

    /// All elements matching a CSS selector, in document order
    async fn query_all(&self, selector: &str) -> DemoflowResult<Vec<ElementHandle>>;

    /// Fresh snapshot of a previously resolved element
    async fn refresh(&self, element: &ElementHandle) -> DemoflowResult<ElementHandle>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> DemoflowResult<()>;

    /// Clear an input's value
    async fn clear(&self, element: &ElementHandle) -> DemoflowResult<()>;

    /// Type text into an element, key by key, honouring the page's own
    /// input handling (masks, maxlength)
    async fn type_text(&self, element: &ElementHandle, text: &str) -> DemoflowResult<()>;

    /// Choose the `<option>` whose value or label equals `value`
    async fn select_option(&self, element: &ElementHandle, value: &str) -> DemoflowResult<()>;

    /// Current `value` of a form control
    async fn value(&self, element: &ElementHandle) -> DemoflowResult<String>;

    /// Browser-native `validationMessage` of a form control
    async fn validation_message(&self, element: &ElementHandle) -> DemoflowResult<String>;

    /// Validity signals of the first form
    async fn form_validity(&self) -> DemoflowResult<FormValidity>;

    /// Visible text of the document body
    async fn page_text(&self) -> DemoflowResult<String>;

    /// Vertical scroll offset of the window
    async fn scroll_y(&self) -> DemoflowResult<f64>;

    /// Interception table consulted for outgoing requests
    fn network(&self) -> &NetworkInterception;

    /// Start routing outgoing requests through [`PageDriver::network`]
    async fn enable_interception(&self) -> DemoflowResult<()>;

    /// PNG screenshot of the viewport; empty when capture is unsupported
    async fn screenshot(&self) -> DemoflowResult<Vec<u8>>;

    /// Close the document and release browser resources
    async fn close(&self) -> DemoflowResult<()>;

    /// Path component of the current URL
    async fn current_path(&self) -> DemoflowResult<String> {
        let href = self.current_url().await?;
        url_path(&href)
    }
}

/// Path component of an absolute URL
pub fn url_path(href: &str) -> DemoflowResult<String> {
    let parsed = url::Url::parse(href)?;
    Ok(parsed.path().to_string())
}

/// Resolve `path` (absolute or relative) against `base`
pub fn join_url(base: &str, path: &str) -> DemoflowResult<String> {
    let base = url::Url::parse(base).map_err(|e| DemoflowError::Config {
        message: format!("invalid base URL '{base}': {e}"),
    })?;
    Ok(base.join(path)?.to_string())
}
