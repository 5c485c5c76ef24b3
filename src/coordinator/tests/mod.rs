//! Coordinator tests.

mod event_tests;

use super::*;
use crate::test_support::{definition, RecordingPort, INSTANCE};

/// Coordinator wired to a recording port, with default config.
pub(super) fn coordinator() -> (WorkflowCoordinator, RecordingPort) {
    coordinator_with(CoordinatorConfig::default())
}

pub(super) fn coordinator_with(config: CoordinatorConfig) -> (WorkflowCoordinator, RecordingPort) {
    let port = RecordingPort::default();
    let (coordinator, _snapshots) = WorkflowCoordinator::new(
        InstanceId::from(INSTANCE),
        definition(),
        &config,
        Arc::new(port.clone()),
    )
    .expect("Failed to create coordinator");
    (coordinator, port)
}

pub(super) fn feed(coordinator: &mut WorkflowCoordinator, events: &[Value]) {
    for raw in events {
        coordinator.handle_raw(raw);
    }
}

pub(super) fn levels(coordinator: &WorkflowCoordinator) -> Vec<LogLevel> {
    coordinator.log().iter().map(|e| e.level).collect()
}
