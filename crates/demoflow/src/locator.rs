//! Resilient element location.
//!
//! A logical field ("email", "phone", "submit") is described by a ranked
//! list of candidates. Resolution walks the list in order against the live
//! document and returns the first element matched by the first candidate
//! that matches anything. Nothing is cached: every call re-queries, so a
//! locator stays valid across navigations.
//!
//! # Design Philosophy
//!
//! - **Ranked fallback**: new candidates are appended without touching call sites
//! - **Loud exhaustion**: a miss names every candidate that was tried
//! - **Driver agnostic**: text filtering runs on element snapshots, so the
//!   same locator works against Chromium and the in-memory driver

use crate::driver::{ElementHandle, PageDriver};
use crate::result::{DemoflowError, DemoflowResult};
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Text predicate over an element's visible text or accessible label
#[derive(Debug, Clone)]
pub struct TextPattern {
    source: String,
    regex: Regex,
    ignore_case: bool,
}

impl TextPattern {
    /// Compile a case-insensitive regular expression
    pub fn new(pattern: &str) -> DemoflowResult<Self> {
        Self::build(pattern, true)
    }

    /// Case-sensitive substring match, like jQuery's `:contains()`
    pub fn contains(text: &str) -> DemoflowResult<Self> {
        Self::build(&regex::escape(text), false)
    }

    fn build(pattern: &str, ignore_case: bool) -> DemoflowResult<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| DemoflowError::Config {
                message: format!("invalid text pattern '{pattern}': {e}"),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            ignore_case,
        })
    }

    /// Literal words separated by flexible whitespace, e.g. `book a demo`
    /// also matches `Book  a\nDemo`
    pub fn phrase(words: &str) -> DemoflowResult<Self> {
        let pattern = words
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s*");
        Self::new(&pattern)
    }

    /// Test a string
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Test an element's text, then its `aria-label`
    #[must_use]
    pub fn matches_element(&self, element: &ElementHandle) -> bool {
        element.labels().any(|label| self.is_match(label.trim()))
    }

    /// The pattern source
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.ignore_case == other.ignore_case
    }
}

impl std::fmt::Display for TextPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/", self.source)?;
        if self.ignore_case {
            f.write_str("i")?;
        }
        Ok(())
    }
}

impl Eq for TextPattern {}

/// One ranked way of finding an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// CSS selector (e.g., `#email`)
    Css(String),
    /// Structural selector filtered by a text pattern
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: TextPattern,
    },
}

impl Candidate {
    /// Create a CSS candidate
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a CSS candidate filtered by text
    #[must_use]
    pub fn css_with_text(selector: impl Into<String>, text: TextPattern) -> Self {
        Self::CssWithText {
            css: selector.into(),
            text,
        }
    }

    /// The structural selector sent to the driver
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Css(css) | Self::CssWithText { css, .. } => css,
        }
    }

    /// Whether a structurally matched element also satisfies the filter
    #[must_use]
    pub fn accepts(&self, element: &ElementHandle) -> bool {
        match self {
            Self::Css(_) => true,
            Self::CssWithText { text, .. } => text.matches_element(element),
        }
    }

    /// All elements matched by this candidate, in document order
    pub async fn find_all<D>(&self, driver: &D) -> DemoflowResult<Vec<ElementHandle>>
    where
        D: PageDriver + ?Sized,
    {
        let mut found = driver.query_all(self.selector()).await?;
        found.retain(|e| self.accepts(e));
        Ok(found)
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(css) => write!(f, "{css}"),
            Self::CssWithText { css, text } => write!(f, "{css} with text {text}"),
        }
    }
}

/// Which of several matching elements a resolution yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// First in document order
    #[default]
    First,
    /// First that is visible; a candidate whose matches are all hidden
    /// counts as a miss
    FirstVisible,
}

/// A logical field and its ranked candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Logical field name
    pub name: String,
    /// Candidates in rank order
    pub candidates: Vec<Candidate>,
}

impl FieldDescriptor {
    /// Descriptor from plain CSS selectors
    #[must_use]
    pub fn css(name: &str, selectors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            candidates: selectors.iter().map(|s| Candidate::css(*s)).collect(),
        }
    }

    /// Locator resolving this field
    #[must_use]
    pub fn locator(&self) -> ResilientLocator {
        ResilientLocator {
            field: self.name.clone(),
            candidates: self.candidates.clone(),
            policy: SelectionPolicy::First,
        }
    }
}

/// Ranked-fallback locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResilientLocator {
    field: String,
    candidates: Vec<Candidate>,
    policy: SelectionPolicy,
}

impl ResilientLocator {
    /// Locator with no candidates yet
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            candidates: Vec::new(),
            policy: SelectionPolicy::First,
        }
    }

    /// Append a candidate
    #[must_use]
    pub fn candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Append a CSS candidate
    #[must_use]
    pub fn css(self, selector: &str) -> Self {
        self.candidate(Candidate::css(selector))
    }

    /// Append a text-filtered candidate
    #[must_use]
    pub fn css_with_text(self, selector: &str, text: TextPattern) -> Self {
        self.candidate(Candidate::css_with_text(selector, text))
    }

    /// Set the selection policy
    #[must_use]
    pub const fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Logical field name
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Candidates in rank order
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Resolve against the live document, or fail naming every candidate
    pub async fn resolve<D>(&self, driver: &D) -> DemoflowResult<ElementHandle>
    where
        D: PageDriver + ?Sized,
    {
        self.probe(driver).await?.ok_or_else(|| self.exhausted())
    }

    /// Resolve without treating a miss as an error
    pub async fn probe<D>(&self, driver: &D) -> DemoflowResult<Option<ElementHandle>>
    where
        D: PageDriver + ?Sized,
    {
        for (rank, candidate) in self.candidates.iter().enumerate() {
            let found = candidate.find_all(driver).await?;
            let chosen = match self.policy {
                SelectionPolicy::First => found.into_iter().next(),
                SelectionPolicy::FirstVisible => found.into_iter().find(ElementHandle::is_visible),
            };
            if let Some(element) = chosen {
                debug!(field = %self.field, rank, candidate = %candidate, id = %element.id, "resolved");
                return Ok(Some(element));
            }
        }
        debug!(field = %self.field, tried = self.candidates.len(), "no candidate matched");
        Ok(None)
    }

    fn exhausted(&self) -> DemoflowError {
        DemoflowError::LocatorExhausted {
            field: self.field.clone(),
            candidates: self.candidates.iter().map(ToString::to_string).collect(),
        }
    }
}
