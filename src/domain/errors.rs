//! Error types for coordinator operations.

use crate::domain::types::{PhaseNumber, RequestId};
use thiserror::Error;

/// Reasons an input answer cannot be submitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputValidationError {
    #[error("a value is required")]
    Required,

    #[error("value must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("value must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("value must be a number")]
    NotANumber,

    #[error("'{value}' is not one of the offered options")]
    UnknownOption { value: String },
}

/// Errors returned by operator-facing coordinator operations.
///
/// Every variant is raised before any outbound command is issued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("no phase is currently running")]
    NoCurrentPhase,

    #[error("phase {phase} is not awaiting approval")]
    NotAwaitingApproval { phase: PhaseNumber },

    #[error("a decision was already issued for phase {phase}")]
    DecisionAlreadyIssued { phase: PhaseNumber },

    #[error("a rejection reason is required")]
    EmptyRejectionReason,

    #[error("no input request is pending")]
    NoPendingInput,

    #[error("input request {requested} is not pending (pending: {pending})")]
    RequestMismatch {
        requested: RequestId,
        pending: RequestId,
    },

    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputValidationError),

    #[error("coordinator has shut down")]
    Closed,
}
