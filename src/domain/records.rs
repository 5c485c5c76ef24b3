//! Phase records and execution log entries owned by the coordinator.

use crate::domain::types::{InstanceId, PhaseNumber, PhaseStatus, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One execution of one phase.
///
/// A record is "current" while `in_progress`; it moves into history the
/// moment it reaches `completed` or `failed` and is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    pub instance_id: InstanceId,
    pub phase_number: PhaseNumber,
    pub phase_name: String,
    pub agent: String,
    pub status: PhaseStatus,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl PhaseRecord {
    /// Creates a record that has just started running.
    pub fn started(
        instance_id: InstanceId,
        phase_number: PhaseNumber,
        phase_name: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            instance_id,
            phase_number,
            phase_name: phase_name.into(),
            agent: agent.into(),
            status: PhaseStatus::InProgress,
            output: String::new(),
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "OK",
        }
    }
}

/// A single line of the run's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_number: Option<PhaseNumber>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, phase_number: Option<PhaseNumber>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            phase_number,
        }
    }
}
