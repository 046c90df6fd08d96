//! Page objects for the site under test.

pub mod demo;
pub mod home;

pub use demo::FormAgent;
pub use home::{CallToActions, DismissedOverlay, NavigationAgent};
