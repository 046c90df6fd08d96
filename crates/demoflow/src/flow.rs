//! Demo-request flow state.
//!
//! `Unloaded → Loaded → Filled → Submitted → Success | Rejected`
//!
//! Filling may be skipped (an empty submit is a valid negative path) and a
//! rejected form may be edited and submitted again. Anything else is a
//! scenario bug and surfaces as an assertion failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{DemoflowError, DemoflowResult};

/// Where the form is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlowState {
    /// Form not yet confirmed present
    #[default]
    Unloaded,
    /// Email field and submit control resolved
    Loaded,
    /// At least one field edited
    Filled,
    /// Submit control activated
    Submitted,
    /// Thank-you page and message observed
    Success,
    /// Validation rejected the submission
    Rejected,
}

/// Something the form agent observed or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// Form confirmed present
    Load,
    /// A field was edited
    Fill,
    /// The submit control was activated
    Submit,
    /// Success state observed
    Succeed,
    /// Rejection observed
    Reject,
}

impl FlowState {
    /// Next state after `event`
    pub fn on(self, event: FlowEvent) -> DemoflowResult<Self> {
        use FlowEvent as E;
        use FlowState as S;
        let next = match (self, event) {
            (S::Unloaded | S::Loaded, E::Load) => S::Loaded,
            (S::Loaded | S::Filled | S::Rejected, E::Fill) => S::Filled,
            (S::Loaded | S::Filled | S::Rejected, E::Submit) => S::Submitted,
            (S::Submitted | S::Success, E::Succeed) => S::Success,
            (S::Submitted | S::Rejected, E::Reject) => S::Rejected,
            (state, event) => {
                return Err(DemoflowError::assertion(
                    format!("{event:?} to be allowed"),
                    format!("form in state {state}"),
                ))
            }
        };
        Ok(next)
    }

    /// Whether the flow has reached an outcome
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Rejected)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loaded => "loaded",
            Self::Filled => "filled",
            Self::Submitted => "submitted",
            Self::Success => "success",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Classification of a submitted form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// Thank-you page with the success message
    Success,
    /// Rejected, with the signals that fired
    Rejected(Vec<String>),
    /// Neither within the bound
    Undetermined,
}

impl SubmissionOutcome {
    /// Flow state this outcome settles on, if any
    #[must_use]
    pub const fn state(&self) -> Option<FlowState> {
        match self {
            Self::Success => Some(FlowState::Success),
            Self::Rejected(_) => Some(FlowState::Rejected),
            Self::Undetermined => None,
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Rejected(reasons) => write!(f, "rejected ({})", reasons.join("; ")),
            Self::Undetermined => f.write_str("undetermined"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = FlowState::default()
            .on(FlowEvent::Load)
            .and_then(|s| s.on(FlowEvent::Fill))
            .and_then(|s| s.on(FlowEvent::Fill))
            .and_then(|s| s.on(FlowEvent::Submit))
            .and_then(|s| s.on(FlowEvent::Succeed))
            .unwrap();
        assert_eq!(state, FlowState::Success);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_empty_submit_then_reject() {
        let state = FlowState::Loaded
            .on(FlowEvent::Submit)
            .and_then(|s| s.on(FlowEvent::Reject))
            .unwrap();
        assert_eq!(state, FlowState::Rejected);
    }

    #[test]
    fn test_rejected_form_can_be_edited_and_resubmitted() {
        let state = FlowState::Rejected
            .on(FlowEvent::Fill)
            .and_then(|s| s.on(FlowEvent::Submit))
            .unwrap();
        assert_eq!(state, FlowState::Submitted);
    }

    #[test]
    fn test_submit_before_load_is_rejected() {
        let err = FlowState::Unloaded.on(FlowEvent::Submit).unwrap_err();
        assert!(err.to_string().contains("form in state unloaded"));
    }

    #[test]
    fn test_success_without_submit_is_rejected() {
        assert!(FlowState::Filled.on(FlowEvent::Succeed).is_err());
    }

    #[test]
    fn test_outcome_state() {
        assert_eq!(SubmissionOutcome::Success.state(), Some(FlowState::Success));
        assert_eq!(
            SubmissionOutcome::Rejected(vec!["x".to_string()]).to_string(),
            "rejected (x)"
        );
        assert_eq!(SubmissionOutcome::Undetermined.state(), None);
    }
}
