//! Outbound command port (coordinator → execution backend).
//!
//! The coordinator never awaits a command inline: [`CommandDispatcher`] sends
//! each one on its own task and reports the [`CommandOutcome`] back through
//! a channel the coordinator drains in its own loop.

mod dispatcher;
mod json_lines;

pub use dispatcher::{CommandDispatcher, CommandOutcome};
pub use json_lines::JsonLinesPort;

use crate::domain::{InputAnswer, InstanceId, PhaseNumber, RequestId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum OutboundCommand {
    #[serde(rename_all = "camelCase")]
    SendUserInput {
        request_id: RequestId,
        value: InputAnswer,
    },
    #[serde(rename_all = "camelCase")]
    ApprovePhase {
        instance_id: InstanceId,
        phase_number: PhaseNumber,
        output: String,
    },
    #[serde(rename_all = "camelCase")]
    RejectPhase {
        instance_id: InstanceId,
        phase_number: PhaseNumber,
        reason: String,
    },
}

impl OutboundCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundCommand::SendUserInput { .. } => "send-user-input",
            OutboundCommand::ApprovePhase { .. } => "approve-phase",
            OutboundCommand::RejectPhase { .. } => "reject-phase",
        }
    }

    /// Phase an approve/reject decision applies to.
    pub fn decision_phase(&self) -> Option<PhaseNumber> {
        match self {
            OutboundCommand::ApprovePhase { phase_number, .. }
            | OutboundCommand::RejectPhase { phase_number, .. } => Some(*phase_number),
            OutboundCommand::SendUserInput { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no async runtime to send the command on")]
    NoRuntime,

    #[error("backend rejected {command}: {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },
}

/// Delivery of commands to the execution backend.
#[async_trait]
pub trait CommandPort: Send + Sync {
    async fn send(&self, command: OutboundCommand) -> Result<(), CommandError>;
}

#[cfg(test)]
mod tests;
