//! Page Object Model support.
//!
//! Page objects encapsulate one page's structure and behaviour over a
//! borrowed [`PageDriver`](crate::PageDriver). The trait gives every page a
//! name for logs and reports plus a readiness probe that the shared
//! [`PageObject::wait_until_loaded`] polls.

use crate::result::DemoflowResult;
use crate::wait::{wait_until, WaitOptions};
use async_trait::async_trait;
use tracing::debug;

/// A page or component of the site under test.
///
/// # Example
///
/// ```ignore
/// struct PricingPage<'a> {
///     driver: &'a dyn PageDriver,
/// }
///
/// #[async_trait]
/// impl PageObject for PricingPage<'_> {
///     fn page_name(&self) -> &'static str {
///         "pricing"
///     }
///
///     async fn is_loaded(&self) -> DemoflowResult<bool> {
///         Ok(self.driver.current_path().await? == "/pricing")
///     }
/// }
/// ```
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page name for logging and reports
    fn page_name(&self) -> &'static str;

    /// Whether the page is ready for interaction
    async fn is_loaded(&self) -> DemoflowResult<bool>;

    /// Bound and cadence for [`PageObject::wait_until_loaded`]
    fn load_options(&self) -> WaitOptions {
        WaitOptions::default()
    }

    /// Poll [`PageObject::is_loaded`] until it holds
    async fn wait_until_loaded(&self) -> DemoflowResult<()> {
        let condition = format!("{} page to load", self.page_name());
        let result = wait_until(&condition, self.load_options(), || self.is_loaded()).await?;
        debug!(page = self.page_name(), elapsed_ms = result.elapsed.as_millis() as u64, "page loaded");
        Ok(())
    }
}
