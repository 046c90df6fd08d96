//! Result and error types for Demoflow.

use thiserror::Error;

/// Result type for Demoflow operations
pub type DemoflowResult<T> = Result<T, DemoflowError>;

/// Errors that can occur while driving the demo-request flow
#[derive(Debug, Error)]
pub enum DemoflowError {
    /// No selector candidate matched any element in the live document
    #[error("Locator exhausted for '{field}': no element matched any of [{}]", candidates.join(", "))]
    LocatorExhausted {
        /// Logical field or control being resolved
        field: String,
        /// Every candidate that was attempted, in rank order
        candidates: Vec<String>,
    },

    /// A bounded wait elapsed without its condition holding
    #[error("Timed out after {ms}ms waiting for {condition}")]
    Timeout {
        /// Description of the awaited condition
        condition: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// An expected invariant did not hold
    #[error("Assertion failed: expected {expected}, got {actual}")]
    AssertionFailed {
        /// What was expected
        expected: String,
        /// What was observed
        actual: String,
    },

    /// Browser executable could not be launched
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Script evaluation inside the page failed
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// An element handle no longer refers to a live element
    #[error("Element {id} is detached from the document")]
    Detached {
        /// Handle id
        id: String,
    },

    /// Fixture file missing or malformed
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// URL parse error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl DemoflowError {
    /// Create an assertion failure from expected/actual descriptions
    #[must_use]
    pub fn assertion(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::AssertionFailed {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(condition: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            condition: condition.into(),
            ms,
        }
    }

    /// Create a script evaluation error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Whether this error is one of the three scenario-failure kinds
    /// (locator exhausted, timeout, assertion) rather than an
    /// infrastructure problem.
    #[must_use]
    pub const fn is_scenario_failure(&self) -> bool {
        matches!(
            self,
            Self::LocatorExhausted { .. } | Self::Timeout { .. } | Self::AssertionFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_exhausted_lists_candidates() {
        let err = DemoflowError::LocatorExhausted {
            field: "email".to_string(),
            candidates: vec!["#email".to_string(), "input[type=\"email\"]".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("email"));
        assert!(msg.contains("#email, input[type=\"email\"]"));
    }

    #[test]
    fn test_timeout_names_condition() {
        let err = DemoflowError::timeout("submission 'submitCTA'", 20_000);
        assert_eq!(
            err.to_string(),
            "Timed out after 20000ms waiting for submission 'submitCTA'"
        );
    }

    #[test]
    fn test_assertion_expected_vs_actual() {
        let err = DemoflowError::assertion("status in 200..=299", "500");
        assert!(err.to_string().contains("expected status in 200..=299, got 500"));
    }

    #[test]
    fn test_scenario_failure_classification() {
        assert!(DemoflowError::timeout("x", 1).is_scenario_failure());
        assert!(DemoflowError::assertion("a", "b").is_scenario_failure());
        assert!(!DemoflowError::script("boom").is_scenario_failure());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DemoflowError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
