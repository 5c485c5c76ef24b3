use super::*;
use crate::domain::{LogLevel, PhaseNumber};
use tempfile::TempDir;

fn create_test_logger(instance: &str) -> (AuditLogger, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let logger = AuditLogger::new(&InstanceId::from(instance), temp_dir.path())
        .expect("Failed to create audit logger");
    (logger, temp_dir)
}

fn read_records(logger: &AuditLogger) -> Vec<AuditRecord> {
    let content = std::fs::read_to_string(logger.log_path()).expect("Failed to read audit file");
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Failed to parse audit record"))
        .collect()
}

#[test]
fn test_records_are_valid_json_with_instance_id() {
    let (logger, _temp) = create_test_logger("instance-1");

    logger.log("Test", serde_json::json!({"key": "value1"}));
    logger.log_entry(&LogEntry::new(
        LogLevel::Info,
        "Phase 1 started",
        Some(PhaseNumber(1)),
    ));

    let records = read_records(&logger);
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.instance_id, "instance-1");
    }
    assert_eq!(records[1].component, "ExecutionLog");
    assert_eq!(records[1].event["message"], "Phase 1 started");
}

#[test]
fn test_sequence_numbers_monotonic() {
    let (logger, _temp) = create_test_logger("instance-1");

    for i in 0..10 {
        logger.log("Test", serde_json::json!({"iteration": i}));
    }

    let mut prev_seq = 0u64;
    for record in read_records(&logger) {
        assert!(
            record.seq > prev_seq,
            "Sequence numbers should be monotonically increasing"
        );
        prev_seq = record.seq;
    }
}

#[test]
fn test_command_records_use_wire_format() {
    let (logger, _temp) = create_test_logger("instance-1");

    logger.log_command(&OutboundCommand::RejectPhase {
        instance_id: InstanceId::from("instance-1"),
        phase_number: PhaseNumber(2),
        reason: "too short".to_string(),
    });

    let records = read_records(&logger);
    assert_eq!(records[0].component, "OutboundCommand");
    assert_eq!(records[0].event["command"], "reject-phase");
    assert_eq!(records[0].event["phaseNumber"], 2);
}

#[test]
fn test_dropped_event_keeps_raw_payload() {
    let (logger, _temp) = create_test_logger("instance-1");
    let raw = serde_json::json!({"kind": "phase-started"});

    logger.log_dropped_event("missing instanceId", &raw);

    let records = read_records(&logger);
    assert_eq!(records[0].event["reason"], "missing instanceId");
    assert_eq!(records[0].event["raw"], raw);
}

#[test]
fn test_instance_id_is_sanitized_for_file_name() {
    let (logger, temp) = create_test_logger("../run/42");
    let file_name = logger.log_path().file_name().unwrap().to_string_lossy();
    assert_eq!(file_name, "___run_42.jsonl");
    assert!(logger.log_path().starts_with(temp.path()));
}
