//! Single ingress for backend events.
//!
//! Filters by instance, decodes the payload and hands back exactly one
//! typed event or a drop reason. Nothing here panics or propagates.

use crate::channel::events::{BackendEvent, KNOWN_KINDS};
use crate::domain::InstanceId;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event has no instanceId")]
    MissingInstanceId,

    #[error("event has no kind")]
    MissingKind,

    #[error("unknown event kind '{0}'")]
    UnknownKind(String),

    #[error("malformed {kind} event: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of routing one raw message.
#[derive(Debug)]
pub enum Routed {
    Event(BackendEvent),
    /// Belongs to another run; discarded without a trace in the execution log.
    Foreign(InstanceId),
    Dropped(EventError),
}

#[derive(Debug, Clone)]
pub struct EventChannelAdapter {
    instance_id: InstanceId,
}

impl EventChannelAdapter {
    pub fn new(instance_id: InstanceId) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    /// Decodes and logs. Foreign events log at debug, malformed ones at warn.
    pub fn route(&self, raw: &Value) -> Routed {
        match self.decode(raw) {
            Ok(Some(event)) => Routed::Event(event),
            Ok(None) => {
                let other = raw
                    .get("instanceId")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                tracing::debug!(
                    active = %self.instance_id,
                    other,
                    "Discarding event for another instance"
                );
                Routed::Foreign(InstanceId::from(other))
            }
            Err(err) => {
                tracing::warn!(instance = %self.instance_id, "Dropping backend event: {}", err);
                Routed::Dropped(err)
            }
        }
    }

    /// Returns `Ok(None)` for events addressed to a different instance.
    pub fn decode(&self, raw: &Value) -> Result<Option<BackendEvent>, EventError> {
        let instance = raw
            .get("instanceId")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingInstanceId)?;
        if instance != self.instance_id.as_str() {
            return Ok(None);
        }

        let kind = raw
            .get("kind")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingKind)?;
        if !KNOWN_KINDS.contains(&kind) {
            return Err(EventError::UnknownKind(kind.to_string()));
        }

        serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|source| EventError::Malformed {
                kind: kind.to_string(),
                source,
            })
    }
}
