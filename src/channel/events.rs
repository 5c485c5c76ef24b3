//! Typed inbound events from the execution backend.
//!
//! Wire format: one JSON object per event, camelCase fields, with a
//! kebab-case `kind` tag and the owning run's `instanceId`.

use crate::domain::{PhaseNumber, UserInputRequest};
use serde::Deserialize;

/// Every `kind` the adapter knows how to route.
pub const KNOWN_KINDS: &[&str] = &[
    "phase-started",
    "phase-completed",
    "phase-failed",
    "approval-required",
    "phase-event",
    "user-input-required",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendEvent {
    PhaseStarted(PhaseStarted),
    PhaseCompleted(PhaseCompleted),
    PhaseFailed(PhaseFailed),
    ApprovalRequired(ApprovalRequired),
    PhaseEvent(PhaseEvent),
    UserInputRequired(UserInputRequest),
}

impl BackendEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendEvent::PhaseStarted(_) => "phase-started",
            BackendEvent::PhaseCompleted(_) => "phase-completed",
            BackendEvent::PhaseFailed(_) => "phase-failed",
            BackendEvent::ApprovalRequired(_) => "approval-required",
            BackendEvent::PhaseEvent(_) => "phase-event",
            BackendEvent::UserInputRequired(_) => "user-input-required",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStarted {
    pub phase_number: PhaseNumber,
    pub phase_name: String,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseCompleted {
    pub phase_number: PhaseNumber,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseFailed {
    pub phase_number: PhaseNumber,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequired {
    pub phase_number: PhaseNumber,
    #[serde(default)]
    pub output: Option<String>,
}

/// Progress notification for a running phase.
///
/// `type: "output"` carries a streamed chunk in `output`; any event may also
/// carry a human-readable `message`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEvent {
    #[serde(default)]
    pub phase_number: Option<PhaseNumber>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PhaseEvent {
    pub const OUTPUT_TYPE: &'static str = "output";

    /// The streamed chunk, when this is an output event.
    pub fn output_chunk(&self) -> Option<&str> {
        if self.event_type.as_deref() == Some(Self::OUTPUT_TYPE) {
            self.output.as_deref()
        } else {
            None
        }
    }
}
