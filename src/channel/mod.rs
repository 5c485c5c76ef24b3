//! Event Channel Adapter: the coordinator's only ingress.

pub mod adapter;
pub mod events;
pub mod subscription;

pub use adapter::{EventChannelAdapter, EventError, Routed};
pub use events::{
    ApprovalRequired, BackendEvent, PhaseCompleted, PhaseEvent, PhaseFailed, PhaseStarted,
};
pub use subscription::{json_lines, EventSubscription};
