//! Shared fixtures for unit tests.

use crate::commands::{CommandError, CommandPort, OutboundCommand};
use crate::domain::{PhaseDefinition, PhaseNumber, WorkflowDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const INSTANCE: &str = "instance-1";

/// Records every command it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingPort {
    sent: Arc<Mutex<Vec<OutboundCommand>>>,
}

impl RecordingPort {
    pub fn sent(&self) -> Vec<OutboundCommand> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandPort for RecordingPort {
    async fn send(&self, command: OutboundCommand) -> Result<(), CommandError> {
        self.sent.lock().unwrap().push(command);
        Ok(())
    }
}

/// Refuses every command.
pub struct FailingPort;

#[async_trait]
impl CommandPort for FailingPort {
    async fn send(&self, command: OutboundCommand) -> Result<(), CommandError> {
        Err(CommandError::Rejected {
            command: command.name(),
            reason: "backend unavailable".to_string(),
        })
    }
}

/// Three phases; phase 3 requires approval.
pub fn definition() -> WorkflowDefinition {
    let phase = |n: u32, name: &str, agent: &str, requires_approval: bool| PhaseDefinition {
        number: PhaseNumber(n),
        name: name.to_string(),
        agent: agent.to_string(),
        requires_approval,
        skill: None,
    };
    WorkflowDefinition {
        id: "novel-draft".to_string(),
        name: "Novel Draft".to_string(),
        phases: vec![
            phase(1, "Outline", "claude", false),
            phase(2, "Draft", "claude", false),
            phase(3, "Review", "codex", true),
        ],
    }
}

pub fn started(n: u32, name: &str) -> Value {
    json!({"instanceId": INSTANCE, "kind": "phase-started", "phaseNumber": n, "phaseName": name, "agent": "claude"})
}

pub fn completed(n: u32, output: &str) -> Value {
    json!({"instanceId": INSTANCE, "kind": "phase-completed", "phaseNumber": n, "output": output})
}

pub fn failed(n: u32, error: &str) -> Value {
    json!({"instanceId": INSTANCE, "kind": "phase-failed", "phaseNumber": n, "error": error})
}

pub fn approval_required(n: u32, output: &str) -> Value {
    json!({"instanceId": INSTANCE, "kind": "approval-required", "phaseNumber": n, "output": output})
}

pub fn chunk(n: u32, output: &str) -> Value {
    json!({"instanceId": INSTANCE, "kind": "phase-event", "phaseNumber": n, "type": "output", "output": output})
}

pub fn message(n: u32, text: &str) -> Value {
    json!({"instanceId": INSTANCE, "kind": "phase-event", "phaseNumber": n, "message": text})
}

pub fn input_required(request_id: &str, extra: Value) -> Value {
    let mut raw = json!({
        "instanceId": INSTANCE, "kind": "user-input-required",
        "requestId": request_id, "nodeId": "node-1", "nodeName": "Title",
        "prompt": "Name the book", "inputType": "text", "required": true
    });
    if let (Some(base), Value::Object(extra)) = (raw.as_object_mut(), extra) {
        base.extend(extra);
    }
    raw
}
