//! Network Request Interception
//!
//! Stub the demo-request submission endpoint so scenarios never depend on a
//! live backend, and record every stubbed exchange under its alias so a
//! scenario can wait for it to complete.
//!
//! The interception table is shared (`Arc<Mutex<_>>`) between the scenario
//! and the driver that actually sees the traffic: the CDP listener task in
//! the browser driver, or the in-memory form submit in the mock driver.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// Any method
    Any,
}

impl HttpMethod {
    /// Parse from a request method string (case-insensitive). Verbs no
    /// route is keyed on map to `Any`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("GET") {
            Self::Get
        } else if s.eq_ignore_ascii_case("POST") {
            Self::Post
        } else {
            Self::Any
        }
    }

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Any => "*",
        }
    }

    /// Check if this method matches another
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        *self == Self::Any || *other == Self::Any || *self == *other
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canned HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: Vec::new(),
            content_type: "application/json".to_string(),
        }
    }
}

impl MockResponse {
    /// The minimal acknowledgement returned for a stubbed submission:
    /// status 200 with `{"ok":true}`.
    #[must_use]
    pub fn acknowledgement() -> Self {
        Self {
            body: br#"{"ok":true}"#.to_vec(),
            ..Self::default()
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self {
            status,
            body: body.into_bytes(),
            ..Self::default()
        }
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Body encoded for CDP `Fetch.fulfillRequest`
    #[must_use]
    pub fn body_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.body)
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "**/api/cta*")
    Glob(String),
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => glob_matches(pattern, url),
        }
    }

    /// Wildcard pattern understood by CDP `Fetch.enable`, where `*` matches
    /// any run of characters. `None` means the pattern can only be checked
    /// on our side, so every request has to be paused.
    #[must_use]
    pub fn to_cdp_pattern(&self) -> Option<String> {
        match self {
            Self::Contains(s) => Some(format!("*{s}*")),
            Self::Glob(s) => {
                let mut collapsed = s.clone();
                while collapsed.contains("**") {
                    collapsed = collapsed.replace("**", "*");
                }
                Some(collapsed)
            }
            Self::Regex(_) => None,
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contains(s) | Self::Regex(s) | Self::Glob(s) => f.write_str(s),
        }
    }
}

/// Glob matching for URLs: `*` (and `**`) match any run of characters,
/// including `/`.
fn glob_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == url;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !url.starts_with(first) {
        return false;
    }

    let mut pos = first.len();
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match url[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }

    url.len() >= pos + last.len() && url[pos..].ends_with(last)
}

/// A completed, stubbed network exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedExchange {
    /// Alias of the route that answered
    pub alias: String,
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Status code of the canned response
    pub status: u16,
    /// Milliseconds since the interception table was created
    pub timestamp_ms: u64,
}

impl CapturedExchange {
    /// Request body as string
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }
}

/// A route definition for interception. The alias is the Interception
/// Record's identity; it is read-only once registered.
#[derive(Debug, Clone)]
pub struct Route {
    /// Alias used to correlate completed exchanges
    pub alias: String,
    /// URL pattern to match
    pub pattern: UrlPattern,
    /// HTTP method to match
    pub method: HttpMethod,
    /// Response to return
    pub response: MockResponse,
}

impl Route {
    /// Create a new route
    #[must_use]
    pub fn new(
        alias: impl Into<String>,
        pattern: UrlPattern,
        method: HttpMethod,
        response: MockResponse,
    ) -> Self {
        Self {
            alias: alias.into(),
            pattern,
            method,
            response,
        }
    }

    /// Check if this route matches a request
    #[must_use]
    pub fn matches(&self, url: &str, method: &HttpMethod) -> bool {
        self.pattern.matches(url) && self.method.matches(method)
    }
}

#[derive(Debug)]
struct InterceptionState {
    routes: Vec<Route>,
    captured: Vec<CapturedExchange>,
}

/// Shared interception table: registered routes plus completed exchanges.
///
/// Cloning yields another handle onto the same table.
#[derive(Debug, Clone)]
pub struct NetworkInterception {
    state: Arc<Mutex<InterceptionState>>,
    start_time: Instant,
}

impl Default for NetworkInterception {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkInterception {
    /// Create an empty interception table
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InterceptionState {
                routes: Vec::new(),
                captured: Vec::new(),
            })),
            start_time: Instant::now(),
        }
    }

    /// Register a route
    pub fn route(&self, route: Route) {
        debug!(alias = %route.alias, method = %route.method, pattern = %route.pattern, "registering stub");
        if let Ok(mut state) = self.state.lock() {
            state.routes.push(route);
        }
    }

    /// Register a stub for `method` requests matching `pattern`
    pub fn stub(
        &self,
        alias: impl Into<String>,
        method: HttpMethod,
        pattern: UrlPattern,
        response: MockResponse,
    ) {
        self.route(Route::new(alias, pattern, method, response));
    }

    /// Offer a request to the table. Returns the canned response and records
    /// the exchange when a route matches; `None` lets the request through.
    pub fn handle_request(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<Vec<u8>>,
    ) -> Option<MockResponse> {
        let timestamp_ms = self.start_time.elapsed().as_millis() as u64;
        let mut state = self.state.lock().ok()?;

        let route = state.routes.iter().find(|r| r.matches(url, &method))?;
        let alias = route.alias.clone();
        let response = route.response.clone();
        debug!(%alias, %url, %method, status = response.status, "stubbed request");

        state.captured.push(CapturedExchange {
            alias,
            url: url.to_string(),
            method,
            body,
            status: response.status,
            timestamp_ms,
        });
        Some(response)
    }

    /// Patterns of all registered routes
    #[must_use]
    pub fn patterns(&self) -> Vec<UrlPattern> {
        self.state
            .lock()
            .map(|s| s.routes.iter().map(|r| r.pattern.clone()).collect())
            .unwrap_or_default()
    }

    /// Get route count
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.state.lock().map(|s| s.routes.len()).unwrap_or(0)
    }

    /// Get all completed exchanges
    #[must_use]
    pub fn exchanges(&self) -> Vec<CapturedExchange> {
        self.state
            .lock()
            .map(|s| s.captured.clone())
            .unwrap_or_default()
    }

    /// The first completed exchange answered by the route named `alias`
    #[must_use]
    pub fn exchange_for(&self, alias: &str) -> Option<CapturedExchange> {
        self.state
            .lock()
            .ok()?
            .captured
            .iter()
            .find(|e| e.alias == alias)
            .cloned()
    }

    /// Drop all routes and captured exchanges
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.routes.clear();
            state.captured.clear();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod http_method_tests {
        use super::*;

        #[test]
        fn test_parse() {
            assert_eq!(HttpMethod::parse("GET"), HttpMethod::Get);
            assert_eq!(HttpMethod::parse("post"), HttpMethod::Post);
            assert_eq!(HttpMethod::parse("OPTIONS"), HttpMethod::Any);
            assert_eq!(HttpMethod::parse("unknown"), HttpMethod::Any);
        }

        #[test]
        fn test_matches() {
            assert!(HttpMethod::Post.matches(&HttpMethod::Post));
            assert!(HttpMethod::Any.matches(&HttpMethod::Get));
            assert!(!HttpMethod::Get.matches(&HttpMethod::Post));
        }
    }

    mod mock_response_tests {
        use super::*;

        #[test]
        fn test_acknowledgement() {
            let response = MockResponse::acknowledgement();
            assert_eq!(response.status, 200);
            assert_eq!(response.body_string(), r#"{"ok":true}"#);
            assert_eq!(response.content_type, "application/json");
        }

        #[test]
        fn test_error_response() {
            let response = MockResponse::error(503, "down");
            assert_eq!(response.status, 503);
            assert!(response.body_string().contains("down"));
        }

        #[test]
        fn test_body_base64() {
            let response = MockResponse::acknowledgement();
            assert_eq!(response.body_base64(), "eyJvayI6dHJ1ZX0=");
        }
    }

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_glob_double_star_prefix() {
            let pattern = UrlPattern::Glob("**/api/cta*".to_string());
            assert!(pattern.matches("https://cortico.health/api/cta"));
            assert!(pattern.matches("https://cortico.health/api/cta?source=home"));
            assert!(!pattern.matches("https://cortico.health/api/contact"));
        }

        #[test]
        fn test_glob_suffix_anchor() {
            let pattern = UrlPattern::Glob("*a".to_string());
            assert!(pattern.matches("aba"));
            assert!(!pattern.matches("ab"));
        }

        #[test]
        fn test_glob_without_wildcard_is_exact() {
            let pattern = UrlPattern::Glob("/api/cta".to_string());
            assert!(pattern.matches("/api/cta"));
            assert!(!pattern.matches("/api/cta/x"));
        }

        #[test]
        fn test_regex() {
            let pattern = UrlPattern::Regex(r"/api/cta\b".to_string());
            assert!(pattern.matches("https://x.test/api/cta"));
            assert!(!UrlPattern::Regex("(".to_string()).matches("anything"));
        }

        #[test]
        fn test_cdp_pattern() {
            let glob = UrlPattern::Glob("**/api/cta*".to_string());
            assert_eq!(glob.to_cdp_pattern().as_deref(), Some("*/api/cta*"));
            assert_eq!(
                UrlPattern::Contains("cta".to_string()).to_cdp_pattern().as_deref(),
                Some("*cta*")
            );
            assert!(UrlPattern::Regex("x".to_string()).to_cdp_pattern().is_none());
        }
    }

    mod interception_tests {
        use super::*;

        fn stubbed() -> NetworkInterception {
            let net = NetworkInterception::new();
            net.stub(
                "submitCTA",
                HttpMethod::Post,
                UrlPattern::Glob("**/api/cta*".to_string()),
                MockResponse::acknowledgement(),
            );
            net.stub(
                "submitCTA-get",
                HttpMethod::Get,
                UrlPattern::Glob("**/api/cta*".to_string()),
                MockResponse::acknowledgement(),
            );
            net
        }

        #[test]
        fn test_matching_request_is_recorded_under_alias() {
            let net = stubbed();
            let response = net
                .handle_request(
                    "https://cortico.health/api/cta",
                    HttpMethod::Post,
                    Some(b"{}".to_vec()),
                )
                .unwrap();
            assert_eq!(response.status, 200);

            let exchange = net.exchange_for("submitCTA").unwrap();
            assert_eq!(exchange.method, HttpMethod::Post);
            assert_eq!(exchange.body_string().as_deref(), Some("{}"));
            assert!(net.exchange_for("submitCTA-get").is_none());
        }

        #[test]
        fn test_get_uses_defensive_alias() {
            let net = stubbed();
            net.handle_request("https://cortico.health/api/cta?x=1", HttpMethod::Get, None);
            assert!(net.exchange_for("submitCTA-get").is_some());
        }

        #[test]
        fn test_unmatched_request_passes_through() {
            let net = stubbed();
            assert!(net
                .handle_request("https://cortico.health/", HttpMethod::Get, None)
                .is_none());
            assert!(net.exchanges().is_empty());
        }

        #[test]
        fn test_clones_share_state() {
            let net = stubbed();
            let listener = net.clone();
            listener.handle_request("https://x.test/api/cta", HttpMethod::Post, None);
            assert_eq!(net.exchanges().len(), 1);
            assert_eq!(net.exchange_for("submitCTA").unwrap().url, "https://x.test/api/cta");
        }

        #[test]
        fn test_clear() {
            let net = stubbed();
            assert_eq!(net.route_count(), 2);
            net.clear();
            assert_eq!(net.route_count(), 0);
            assert!(net.patterns().is_empty());
        }
    }
}
