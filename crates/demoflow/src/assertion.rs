//! Assertions for scenario validation.
//!
//! Each helper yields an [`AssertionResult`] describing what was expected
//! and what was observed; [`AssertionResult::into_result`] turns a failure
//! into `DemoflowError::AssertionFailed`.

use crate::result::{DemoflowError, DemoflowResult};
use regex::Regex;
use std::fmt::Debug;
use std::ops::RangeInclusive;

/// Result of an assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// What was expected
    pub expected: String,
    /// What was observed
    pub actual: String,
}

impl AssertionResult {
    /// Create a passing assertion result
    #[must_use]
    pub fn pass(expected: impl Into<String>) -> Self {
        Self {
            passed: true,
            expected: expected.into(),
            actual: String::new(),
        }
    }

    /// Create a failing assertion result
    #[must_use]
    pub fn fail(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            passed: false,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// `Ok(())` if passed, otherwise an assertion error
    pub fn into_result(self) -> DemoflowResult<()> {
        if self.passed {
            Ok(())
        } else {
            Err(DemoflowError::AssertionFailed {
                expected: self.expected,
                actual: self.actual,
            })
        }
    }
}

/// Assertion helpers
#[derive(Debug)]
pub struct Assertion;

impl Assertion {
    /// Assert two values are equal
    #[must_use]
    pub fn equals<T: PartialEq + Debug>(expected: &T, actual: &T) -> AssertionResult {
        let want = format!("{expected:?}");
        if expected == actual {
            AssertionResult::pass(want)
        } else {
            AssertionResult::fail(want, format!("{actual:?}"))
        }
    }

    /// Assert a string contains a substring
    #[must_use]
    pub fn contains(haystack: &str, needle: &str) -> AssertionResult {
        let want = format!("text containing '{needle}'");
        if haystack.contains(needle) {
            AssertionResult::pass(want)
        } else {
            AssertionResult::fail(want, format!("'{haystack}'"))
        }
    }

    /// Assert a string contains a substring, ignoring ASCII case
    #[must_use]
    pub fn contains_ignore_case(haystack: &str, needle: &str) -> AssertionResult {
        let want = format!("text containing '{needle}' (any case)");
        if haystack.to_lowercase().contains(&needle.to_lowercase()) {
            AssertionResult::pass(want)
        } else {
            AssertionResult::fail(want, format!("'{haystack}'"))
        }
    }

    /// Assert a string matches a regular expression
    #[must_use]
    pub fn matches(text: &str, pattern: &Regex) -> AssertionResult {
        let want = format!("text matching /{}/", pattern.as_str());
        if pattern.is_match(text) {
            AssertionResult::pass(want)
        } else {
            AssertionResult::fail(want, format!("'{text}'"))
        }
    }

    /// Assert a string does not match a regular expression
    #[must_use]
    pub fn not_matches(text: &str, pattern: &Regex) -> AssertionResult {
        let want = format!("text not matching /{}/", pattern.as_str());
        if pattern.is_match(text) {
            AssertionResult::fail(want, format!("'{text}'"))
        } else {
            AssertionResult::pass(want)
        }
    }

    /// Assert an HTTP status lies in a range
    #[must_use]
    pub fn status_in(status: u16, range: RangeInclusive<u16>) -> AssertionResult {
        let want = format!("status in {}..={}", range.start(), range.end());
        if range.contains(&status) {
            AssertionResult::pass(want)
        } else {
            AssertionResult::fail(want, status.to_string())
        }
    }

    /// Assert `value > floor`
    #[must_use]
    pub fn greater_than(value: f64, floor: f64, what: &str) -> AssertionResult {
        let want = format!("{what} greater than {floor}");
        if value > floor {
            AssertionResult::pass(want)
        } else {
            AssertionResult::fail(want, value.to_string())
        }
    }

    /// Assert a condition is true
    #[must_use]
    pub fn is_true(condition: bool, expected: &str, actual: &str) -> AssertionResult {
        if condition {
            AssertionResult::pass(expected)
        } else {
            AssertionResult::fail(expected, actual)
        }
    }

    /// Assert a collection is non-empty
    #[must_use]
    pub fn not_empty<T>(collection: &[T], what: &str) -> AssertionResult {
        let want = format!("at least one {what}");
        if collection.is_empty() {
            AssertionResult::fail(want, "none")
        } else {
            AssertionResult::pass(want)
        }
    }
}
