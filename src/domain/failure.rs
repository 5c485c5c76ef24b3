//! Failure taxonomy for phase failures reported by the execution backend.
//!
//! A failure either matches one of the recoverable signatures below and
//! becomes a [`Remediation`], or it is terminal.

use crate::domain::types::{PhaseNumber, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Regex pattern identifying a missing agent CLI in a failure message.
pub const TOOL_NOT_INSTALLED_PATTERN: &str = r"(?i)(command not found|not installed|is not recognized as an internal or external command|executable (file )?not found|\bENOENT\b)";

/// Regex pattern identifying missing credentials in a failure message.
pub const NOT_AUTHENTICATED_PATTERN: &str = r"(?i)(not authenticated|not logged in|unauthori[sz]ed|please (run )?(log ?in|login|authenticate)|invalid api key|\b401\b)";

/// Recoverable failure classes that have a guided fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationKind {
    ToolNotInstalled,
    NotAuthenticated,
}

impl RemediationKind {
    pub fn display_name(self) -> &'static str {
        match self {
            RemediationKind::ToolNotInstalled => "tool not installed",
            RemediationKind::NotAuthenticated => "not authenticated",
        }
    }

    pub fn default_pattern(self) -> &'static str {
        match self {
            RemediationKind::ToolNotInstalled => TOOL_NOT_INSTALLED_PATTERN,
            RemediationKind::NotAuthenticated => NOT_AUTHENTICATED_PATTERN,
        }
    }
}

/// Guided-fix descriptor produced for a classified recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub kind: RemediationKind,
    /// The line of the error text that matched the signature.
    pub detail: String,
    /// Agent of the failed phase; the remediation status query targets it.
    pub agent: String,
    pub phase_number: PhaseNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfacedErrorKind {
    /// Unclassified terminal phase failure.
    PhaseFailed,
    /// The backend or transport refused an outbound command.
    CommandFailed,
    /// No terminal event arrived after an accepted approve/reject.
    ApprovalStalled,
}

/// A user-visible, dismissible error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfacedError {
    pub id: u64,
    pub kind: SurfacedErrorKind,
    pub message: String,
    pub phase_number: Option<PhaseNumber>,
    pub raised_at: Timestamp,
}

impl SurfacedError {
    pub fn new(
        id: u64,
        kind: SurfacedErrorKind,
        message: impl Into<String>,
        phase_number: Option<PhaseNumber>,
    ) -> Self {
        Self {
            id,
            kind,
            message: message.into(),
            phase_number,
            raised_at: Utc::now(),
        }
    }
}
