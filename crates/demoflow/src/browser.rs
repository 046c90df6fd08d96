//! Chromium driver over the Chrome DevTools Protocol.
//!
//! DOM work runs as small scripts inside the page. Every element handed out
//! is stamped with a `data-demoflow-id` attribute so later operations find
//! the same node; a node that has gone away reports `Detached`. Typing goes
//! through `Input.insertText` one character at a time so the page's own
//! input handlers (masks, maxlength) see real input events. Interception
//! uses the Fetch domain: matching requests are paused, offered to the
//! shared [`NetworkInterception`] table, and fulfilled or continued.

use crate::driver::{DriverConfig, ElementHandle, FormValidity, PageDriver};
use crate::network::{HttpMethod, NetworkInterception};
use crate::result::{DemoflowError, DemoflowResult};
use crate::wait::{wait_until, WaitOptions};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FulfillRequestParams, HeaderEntry,
    RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Attribute used to give DOM nodes a stable identity
const ID_ATTRIBUTE: &str = "data-demoflow-id";

const SNAPSHOT_FN: &str = r"
function __demoflowSnapshot(el) {
  if (!el.hasAttribute('data-demoflow-id')) {
    window.__demoflowSeq = (window.__demoflowSeq || 0) + 1;
    el.setAttribute('data-demoflow-id', 'df-' + window.__demoflowSeq);
  }
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  return {
    id: el.getAttribute('data-demoflow-id'),
    tag: el.tagName.toLowerCase(),
    text: (el.innerText || el.textContent || '').trim(),
    aria: (el.getAttribute('aria-label') || '').trim(),
    kind: (el.getAttribute('type') || '').toLowerCase(),
    href: el.getAttribute('href'),
    visible: style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0,
  };
}";

const FORM_VALIDITY: &str = r#"(() => {
  const form = document.querySelector('form');
  if (!form) return { form_present: false, invalid_fields: 0, aria_invalid: 0, error_markers: 0, check_validity: true };
  return {
    form_present: true,
    invalid_fields: form.querySelectorAll('input:invalid, textarea:invalid, select:invalid').length,
    aria_invalid: form.querySelectorAll('[aria-invalid="true"]').length,
    error_markers: form.querySelectorAll('.error, .hs-error-msg, [role="alert"], .error-message').length,
    check_validity: form.checkValidity(),
  };
})()"#;

const SET_VALUE_FN: &str = r"
function __demoflowSetValue(el, value) {
  const proto = Object.getPrototypeOf(el);
  const setter = Object.getOwnPropertyDescriptor(proto, 'value');
  if (setter && setter.set) { setter.set.call(el, value); } else { el.value = value; }
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
}";

#[derive(Debug, Deserialize)]
struct RawElement {
    id: String,
    tag: String,
    text: String,
    aria: String,
    kind: String,
    href: Option<String>,
    visible: bool,
}

impl From<RawElement> for ElementHandle {
    fn from(raw: RawElement) -> Self {
        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        let mut handle = Self::new(raw.id, raw.tag);
        handle.text_content = non_empty(raw.text);
        handle.aria_label = non_empty(raw.aria);
        handle.input_type = non_empty(raw.kind);
        handle.href = raw.href;
        handle.visible = raw.visible;
        handle
    }
}

#[derive(Debug, Deserialize)]
struct Reply<T> {
    found: bool,
    value: Option<T>,
}

fn script_error(e: impl std::fmt::Display) -> DemoflowError {
    DemoflowError::script(e.to_string())
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Chromium-backed [`PageDriver`]
#[derive(Debug)]
pub struct ChromiumDriver {
    config: DriverConfig,
    browser: Mutex<Browser>,
    page: Arc<Page>,
    network: NetworkInterception,
    handler: JoinHandle<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: DriverConfig) -> DemoflowResult<Self> {
        let mut builder = BrowserConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| DemoflowError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| DemoflowError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DemoflowError::BrowserLaunch {
                message: e.to_string(),
            })?;

        info!(
            headless = config.headless,
            width = config.viewport_width,
            height = config.viewport_height,
            "chromium launched"
        );

        Ok(Self {
            config,
            browser: Mutex::new(browser),
            page: Arc::new(page),
            network: NetworkInterception::new(),
            handler,
            listener: Mutex::new(None),
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> DemoflowResult<T> {
        let result = self.page.evaluate(script).await.map_err(script_error)?;
        result.into_value().map_err(script_error)
    }

    /// Run `body` with `el` bound to the element behind `element`
    async fn on_element<T: DeserializeOwned>(
        &self,
        element: &ElementHandle,
        body: &str,
    ) -> DemoflowResult<T> {
        let selector = js_string(&format!("[{ID_ATTRIBUTE}=\"{}\"]", element.id));
        let script = format!(
            "(() => {{ {SET_VALUE_FN}\n const el = document.querySelector({selector}); \
             if (!el) return {{ found: false }}; \
             return {{ found: true, value: (() => {{ {body} }})() }}; }})()"
        );
        let reply: Reply<T> = self.eval(&script).await?;
        if !reply.found {
            return Err(DemoflowError::Detached {
                id: element.id.clone(),
            });
        }
        reply
            .value
            .ok_or_else(|| DemoflowError::script(format!("no value from element {}", element.id)))
    }

    async fn document_ready(&self) -> DemoflowResult<bool> {
        let state: String = self.eval("document.readyState").await?;
        Ok(state == "complete")
    }

    async fn start_listener(&self) {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            return;
        }
        let page = Arc::clone(&self.page);
        let network = self.network.clone();
        *listener = Some(tokio::spawn(async move {
            let mut events = match page.event_listener::<EventRequestPaused>().await {
                Ok(events) => events,
                Err(e) => {
                    warn!(error = %e, "cannot listen for paused requests");
                    return;
                }
            };
            while let Some(event) = events.next().await {
                let method = HttpMethod::parse(&event.request.method);
                let outcome = match network.handle_request(&event.request.url, method, None) {
                    Some(response) => {
                        let headers = vec![HeaderEntry::new("Content-Type", response.content_type.clone())];
                        match FulfillRequestParams::builder()
                            .request_id(event.request_id.clone())
                            .response_code(i64::from(response.status))
                            .response_headers(headers)
                            .body(response.body_base64())
                            .build()
                        {
                            Ok(params) => page.execute(params).await.map(|_| ()),
                            Err(message) => {
                                warn!(%message, "invalid fulfill parameters");
                                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                                    .await
                                    .map(|_| ())
                            }
                        }
                    }
                    None => page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ()),
                };
                if let Err(e) = outcome {
                    warn!(url = %event.request.url, error = %e, "paused request not resumed");
                }
            }
        }));
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> DemoflowResult<()> {
        let timeout = self.config.navigation_timeout;
        let navigation = tokio::time::timeout(timeout, self.page.goto(url)).await;
        match navigation {
            Err(_) => {
                return Err(DemoflowError::timeout(
                    format!("navigation to {url}"),
                    timeout.as_millis() as u64,
                ))
            }
            Ok(Err(e)) => {
                return Err(DemoflowError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(_)) => {}
        }
        let options = WaitOptions::new().with_timeout(timeout.as_millis() as u64);
        wait_until(&format!("{url} to finish loading"), options, || self.document_ready()).await?;
        debug!(%url, "navigated");
        Ok(())
    }

    async fn current_url(&self) -> DemoflowResult<String> {
        self.eval("window.location.href").await
    }

    async fn query_all(&self, selector: &str) -> DemoflowResult<Vec<ElementHandle>> {
        let script = format!(
            "(() => {{ {SNAPSHOT_FN}\n return Array.from(document.querySelectorAll({})).map(__demoflowSnapshot); }})()",
            js_string(selector)
        );
        let raw: Vec<RawElement> = self.eval(&script).await?;
        Ok(raw.into_iter().map(ElementHandle::from).collect())
    }

    async fn refresh(&self, element: &ElementHandle) -> DemoflowResult<ElementHandle> {
        let body = format!("{SNAPSHOT_FN}\n return __demoflowSnapshot(el);");
        let raw: RawElement = self.on_element(element, &body).await?;
        Ok(raw.into())
    }

    async fn click(&self, element: &ElementHandle) -> DemoflowResult<()> {
        let _: bool = self
            .on_element(element, "el.scrollIntoView({ block: 'center' }); el.click(); return true;")
            .await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> DemoflowResult<()> {
        let _: bool = self
            .on_element(element, "__demoflowSetValue(el, ''); return true;")
            .await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DemoflowResult<()> {
        let _: bool = self.on_element(element, "el.focus(); return true;").await?;
        for c in text.chars() {
            self.page
                .execute(InsertTextParams::new(c.to_string()))
                .await
                .map_err(script_error)?;
        }
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, value: &str) -> DemoflowResult<()> {
        let wanted = js_string(value);
        let body = format!(
            "const v = {wanted}; \
             const opt = Array.from(el.options || []).find(o => o.value === v || (o.label || o.text || '').trim() === v); \
             if (!opt) return false; \
             __demoflowSetValue(el, opt.value); return true;"
        );
        let selected: bool = self.on_element(element, &body).await?;
        if selected {
            Ok(())
        } else {
            Err(DemoflowError::assertion(
                format!("an <option> matching '{value}'"),
                "no such option",
            ))
        }
    }

    async fn value(&self, element: &ElementHandle) -> DemoflowResult<String> {
        self.on_element(element, "return String(el.value ?? '');").await
    }

    async fn validation_message(&self, element: &ElementHandle) -> DemoflowResult<String> {
        self.on_element(element, "return String(el.validationMessage || '');")
            .await
    }

    async fn form_validity(&self) -> DemoflowResult<FormValidity> {
        self.eval(FORM_VALIDITY).await
    }

    async fn page_text(&self) -> DemoflowResult<String> {
        self.eval("document.body ? document.body.innerText : ''").await
    }

    async fn scroll_y(&self) -> DemoflowResult<f64> {
        self.eval("window.scrollY").await
    }

    fn network(&self) -> &NetworkInterception {
        &self.network
    }

    async fn enable_interception(&self) -> DemoflowResult<()> {
        let mut patterns: Vec<String> = self
            .network
            .patterns()
            .iter()
            .map(|p| p.to_cdp_pattern().unwrap_or_else(|| "*".to_string()))
            .collect();
        patterns.dedup();
        let patterns = patterns
            .into_iter()
            .map(|p| {
                RequestPattern::builder()
                    .url_pattern(p)
                    .request_stage(RequestStage::Request)
                    .build()
            })
            .collect::<Vec<_>>();
        debug!(count = patterns.len(), "enabling fetch interception");
        self.page
            .execute(EnableParams::builder().patterns(patterns).build())
            .await
            .map_err(script_error)?;
        self.start_listener().await;
        Ok(())
    }

    async fn screenshot(&self) -> DemoflowResult<Vec<u8>> {
        use base64::Engine;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self.page.execute(params).await.map_err(script_error)?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(script_error)
    }

    async fn close(&self) -> DemoflowResult<()> {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.abort();
        }
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(|e| DemoflowError::BrowserLaunch {
            message: e.to_string(),
        })?;
        self.handler.abort();
        info!("chromium closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string("button, [role=\"button\"]"), r#""button, [role=\"button\"]""#);
    }

    #[test]
    fn test_raw_element_conversion() {
        let raw = RawElement {
            id: "df-1".to_string(),
            tag: "BUTTON".to_string(),
            text: "Get a Demo".to_string(),
            aria: String::new(),
            kind: "submit".to_string(),
            href: None,
            visible: true,
        };
        let handle = ElementHandle::from(raw);
        assert_eq!(handle.tag_name, "button");
        assert_eq!(handle.text_content.as_deref(), Some("Get a Demo"));
        assert!(handle.aria_label.is_none());
        assert_eq!(handle.input_type.as_deref(), Some("submit"));
    }

    #[test]
    fn test_form_validity_reply_shape() {
        let validity: FormValidity = serde_json::from_str(
            r#"{"form_present":true,"invalid_fields":2,"aria_invalid":0,"error_markers":1,"check_validity":false}"#,
        )
        .unwrap();
        assert!(validity.is_rejected());
    }
}
