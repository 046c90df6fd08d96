//! Demoflow: resilient end-to-end checks for a "Request a Demo" flow
//!
//! Demoflow drives a marketing site's demo-request funnel the way a visitor
//! would: find the "Get a Demo" calls to action, follow one to the form,
//! fill it, submit against a stubbed endpoint and confirm the thank-you
//! page, plus the negative paths where the browser rejects bad input.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ ScenarioRunner │──►│ NavigationAgent  │──►│ ResilientLocator │
//! │ (retries,      │   │ FormAgent        │   │ (ranked selector │
//! │  report)       │   │ (page objects)   │   │  fallback)       │
//! └────────────────┘   └────────┬─────────┘   └────────┬─────────┘
//!                               ▼                      ▼
//!                      ┌──────────────────────────────────────┐
//!                      │ PageDriver: ChromiumDriver (CDP) or  │
//!                      │ MockDriver (in-memory document)      │
//!                      └──────────────────────────────────────┘
//! ```
//!
//! Every element lookup goes through a [`ResilientLocator`], which walks a
//! ranked candidate list against the live document on every call, so page
//! objects never hold stale handles.

#![warn(missing_docs)]

mod assertion;
mod page_object;
mod result;

/// Real browser control over the Chrome DevTools Protocol.
#[cfg(feature = "browser")]
pub mod browser;

/// Suite configuration loaded from `demoflow.yaml`.
pub mod config;

/// Page driver abstraction and element snapshots.
pub mod driver;

/// Named form payloads.
pub mod fixture;

/// Demo-request flow state machine.
pub mod flow;

/// Scenario runner and run reports.
pub mod harness;

/// Ranked-fallback element location.
pub mod locator;

/// In-memory driver for tests and dry runs.
pub mod mock;

/// Submission stubbing and exchange capture.
pub mod network;

/// Home page and demo form page objects.
pub mod pages;

/// The scenario catalogue.
pub mod scenario;

/// Bounded polling.
pub mod wait;

pub use assertion::{Assertion, AssertionResult};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use config::{SuiteConfig, Viewport, CONFIG_FILE};
pub use driver::{DriverConfig, ElementHandle, FormValidity, PageDriver};
pub use fixture::{FixtureSet, Payload, PayloadValue};
pub use flow::{FlowEvent, FlowState, SubmissionOutcome};
pub use harness::{RunEvent, ScenarioResult, ScenarioRunner, SuiteResults};
pub use locator::{Candidate, FieldDescriptor, ResilientLocator, SelectionPolicy, TextPattern};
pub use mock::MockDriver;
pub use network::{CapturedExchange, HttpMethod, MockResponse, NetworkInterception, UrlPattern};
pub use page_object::PageObject;
pub use pages::{FormAgent, NavigationAgent};
pub use result::{DemoflowError, DemoflowResult};
pub use scenario::{ScenarioContext, ScenarioId};
pub use wait::{poll_until, wait_until, WaitOptions, WaitResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Assertion, DemoflowError, DemoflowResult, FixtureSet, FormAgent, MockDriver,
        NavigationAgent, PageDriver, PageObject, ScenarioId, ScenarioRunner, SuiteConfig,
    };
    #[cfg(feature = "browser")]
    pub use super::ChromiumDriver;
}
