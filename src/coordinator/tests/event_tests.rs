//! Phase lifecycle, streaming output and failure classification.

use super::*;
use crate::domain::{PhaseStatus, RemediationKind};
use crate::test_support::{chunk, completed, failed, message, started};
use serde_json::json;

#[test]
fn test_outline_scenario() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[
            started(1, "Outline"),
            chunk(1, "Chapter "),
            chunk(1, "One"),
            completed(1, "Chapter One"),
        ],
    );

    assert!(coordinator.current_phase().is_none());
    let history = coordinator.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].phase_number, PhaseNumber(1));
    assert_eq!(history[0].status, PhaseStatus::Completed);
    assert_eq!(history[0].output, "Chapter One");
    assert_eq!(levels(&coordinator), vec![LogLevel::Info, LogLevel::Success]);
}

#[test]
fn test_streamed_output_kept_when_completion_has_none() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[
            started(1, "Outline"),
            chunk(1, "A"),
            chunk(1, "B"),
            chunk(1, "C"),
            json!({"instanceId": INSTANCE, "kind": "phase-completed", "phaseNumber": 1}),
        ],
    );
    assert_eq!(coordinator.history()[0].output, "ABC");
}

#[test]
fn test_stale_terminal_events_are_noops() {
    let (mut coordinator, _port) = coordinator();
    feed(&mut coordinator, &[started(2, "Draft")]);
    let log_len = coordinator.log().len();

    feed(
        &mut coordinator,
        &[completed(1, "old"), failed(3, "not authenticated")],
    );

    assert_eq!(
        coordinator.current_phase().map(|r| r.phase_number),
        Some(PhaseNumber(2))
    );
    assert!(coordinator.history().is_empty());
    assert!(coordinator.remediation().is_none());
    assert_eq!(coordinator.log().len(), log_len);
}

#[test]
fn test_chunk_without_current_phase_is_dropped() {
    let (mut coordinator, _port) = coordinator();
    feed(&mut coordinator, &[chunk(1, "orphan")]);
    assert!(coordinator.current_phase().is_none());
    assert!(coordinator.log().is_empty());
}

#[test]
fn test_chunk_for_other_phase_is_dropped() {
    let (mut coordinator, _port) = coordinator();
    feed(&mut coordinator, &[started(2, "Draft"), chunk(1, "late")]);
    assert_eq!(coordinator.current_phase().unwrap().output, "");
}

#[test]
fn test_phase_event_message_goes_to_log() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[started(1, "Outline"), message(1, "Reading research notes")],
    );
    let last = coordinator.log().last().unwrap();
    assert_eq!(last.level, LogLevel::Info);
    assert_eq!(last.message, "Reading research notes");
    assert_eq!(last.phase_number, Some(PhaseNumber(1)));
}

#[test]
fn test_not_authenticated_failure_produces_remediation() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[
            started(2, "Draft"),
            failed(2, "agent exited: claude is not authenticated"),
        ],
    );

    let record = &coordinator.history()[0];
    assert_eq!(record.status, PhaseStatus::Failed);
    assert_eq!(
        record.error.as_deref(),
        Some("agent exited: claude is not authenticated")
    );

    let remediation = coordinator.remediation().expect("remediation expected");
    assert_eq!(remediation.kind, RemediationKind::NotAuthenticated);
    assert_eq!(remediation.agent, "claude");
    assert_eq!(remediation.phase_number, PhaseNumber(2));
    assert!(
        coordinator.errors().is_empty(),
        "recoverable failure must not raise a terminal banner"
    );
    assert_eq!(coordinator.log().last().unwrap().level, LogLevel::Error);
}

#[test]
fn test_unclassified_failure_is_terminal() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[started(2, "Draft"), failed(2, "context window exceeded")],
    );

    assert!(coordinator.remediation().is_none());
    assert_eq!(coordinator.errors().len(), 1);
    assert_eq!(coordinator.errors()[0].kind, SurfacedErrorKind::PhaseFailed);
    assert!(coordinator.errors()[0]
        .message
        .contains("context window exceeded"));
    assert_eq!(
        levels(&coordinator),
        vec![LogLevel::Info, LogLevel::Error]
    );

    let id = coordinator.errors()[0].id;
    assert!(coordinator.dismiss_error(id));
    assert!(!coordinator.dismiss_error(id));
    assert!(coordinator.errors().is_empty());
}

#[test]
fn test_remediation_cleared_on_next_start_or_dismiss() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[started(2, "Draft"), failed(2, "codex: command not found")],
    );
    assert!(coordinator.remediation().is_some());

    feed(&mut coordinator, &[started(2, "Draft")]);
    assert!(coordinator.remediation().is_none());

    feed(&mut coordinator, &[failed(2, "codex: command not found")]);
    assert_eq!(
        coordinator.dismiss_remediation().map(|r| r.kind),
        Some(RemediationKind::ToolNotInstalled)
    );
    assert!(coordinator.remediation().is_none());
}

#[test]
fn test_retry_is_a_new_record() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[
            started(2, "Draft"),
            failed(2, "codex: command not found"),
            started(2, "Draft"),
            completed(2, "Draft done"),
        ],
    );
    let statuses: Vec<PhaseStatus> = coordinator.history().iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![PhaseStatus::Failed, PhaseStatus::Completed]);
}

#[test]
fn test_start_over_unfinished_phase_is_logged() {
    let (mut coordinator, _port) = coordinator();
    feed(&mut coordinator, &[started(1, "Outline"), started(2, "Draft")]);
    let last = coordinator.log().last().unwrap();
    assert!(last.message.contains("replaced unfinished phase 1"));
    assert!(coordinator.history().is_empty());
}

#[test]
fn test_malformed_events_leave_state_untouched() {
    let (mut coordinator, _port) = coordinator();
    feed(
        &mut coordinator,
        &[
            json!({"kind": "phase-started", "phaseNumber": 1, "phaseName": "x", "agent": "y"}),
            json!({"instanceId": INSTANCE, "kind": "phase-exploded"}),
            json!({"instanceId": INSTANCE, "kind": "phase-started"}),
            json!(42),
        ],
    );
    assert!(coordinator.current_phase().is_none());
    assert!(coordinator.log().is_empty());
}

fn coordinator_with_snapshots() -> (WorkflowCoordinator, watch::Receiver<CoordinatorSnapshot>) {
    WorkflowCoordinator::new(
        InstanceId::from(INSTANCE),
        definition(),
        &CoordinatorConfig::default(),
        Arc::new(RecordingPort::default()),
    )
    .unwrap()
}

#[test]
fn test_snapshot_published_after_event() {
    let (mut coordinator, mut snapshots) = coordinator_with_snapshots();

    feed(&mut coordinator, &[started(1, "Outline")]);
    assert!(snapshots.has_changed().unwrap());
    assert_eq!(snapshots.borrow_and_update().log_len, 1);

    // Chunks alone are not published; the next logged change carries them.
    feed(&mut coordinator, &[chunk(1, "Hi"), chunk(1, " there")]);
    assert!(!snapshots.has_changed().unwrap());

    feed(&mut coordinator, &[message(1, "halfway")]);
    let snapshot = snapshots.borrow_and_update();
    assert_eq!(snapshot.current_phase.as_ref().unwrap().output, "Hi there");
    assert_eq!(snapshot.log_len, 2);
}

#[test]
fn test_long_stream_keeps_every_chunk_without_publishing() {
    let (mut coordinator, mut snapshots) = coordinator_with_snapshots();
    feed(&mut coordinator, &[started(1, "Outline")]);
    assert_eq!(snapshots.borrow_and_update().log_len, 1);

    let piece = "x".repeat(100);
    for _ in 0..20_000 {
        coordinator.handle_raw(&chunk(1, &piece));
    }
    assert!(!snapshots.has_changed().unwrap());
    assert_eq!(coordinator.current_phase().unwrap().output.len(), 2_000_000);

    feed(&mut coordinator, &[completed(1, "")]);
    let snapshot = snapshots.borrow_and_update();
    assert_eq!(snapshot.history[0].output.len(), 2_000_000);
}

#[test]
fn test_audit_logger_receives_log_entries_and_drops() {
    let dir = tempfile::TempDir::new().unwrap();
    let audit = Arc::new(AuditLogger::new(&InstanceId::from(INSTANCE), dir.path()).unwrap());
    let (coordinator, _port) = coordinator();
    let mut coordinator = coordinator.with_audit(Arc::clone(&audit));

    feed(
        &mut coordinator,
        &[
            started(1, "Outline"),
            json!({"instanceId": INSTANCE, "kind": "mystery"}),
        ],
    );

    let content = std::fs::read_to_string(audit.log_path()).unwrap();
    let components: Vec<String> = content
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).unwrap();
            value["component"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(components, vec!["ExecutionLog", "EventChannel"]);
}
