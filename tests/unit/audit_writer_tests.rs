//! JSONL audit writer tests.

use std::fs;

use chrono::Utc;

use agent_keepintouch::audit::{AuditEntry, AuditEventType, AuditLogger, JsonlAuditWriter};

fn entry() -> AuditEntry {
    AuditEntry::new(AuditEventType::CompletionRequested)
        .with_task("task-1".to_owned())
        .with_agent("agent-a".to_owned())
        .with_outcome("granted".to_owned())
}

#[test]
fn builder_populates_only_what_it_is_given() {
    let entry = AuditEntry::new(AuditEventType::CheckIn)
        .with_session("sess-1".to_owned())
        .with_agent("agent-a".to_owned());

    assert_eq!(entry.session_id.as_deref(), Some("sess-1"));
    assert_eq!(entry.agent_id.as_deref(), Some("agent-a"));
    assert_eq!(entry.task_id, None);
    assert_eq!(entry.outcome, None);
    assert_eq!(entry.operator_id, None);
    assert_eq!(entry.reason, None);
}

#[test]
fn writes_one_json_object_per_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let writer = JsonlAuditWriter::new(dir.path().to_path_buf()).expect("create writer");

    writer.log_entry(entry()).expect("first write");
    writer
        .log_entry(
            AuditEntry::new(AuditEventType::OverrideDenied)
                .with_task("task-2".to_owned())
                .with_operator("supervisor:ops".to_owned())
                .with_reason("scope cut".to_owned()),
        )
        .expect("second write");

    let path = dir
        .path()
        .join(format!("audit-{}.jsonl", Utc::now().date_naive()));
    let contents = fs::read_to_string(&path).expect("read log file");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).expect("parse first line");
    assert_eq!(first["event_type"], "completion_requested");
    assert_eq!(first["task_id"], "task-1");
    assert_eq!(first["outcome"], "granted");

    let second: serde_json::Value = serde_json::from_str(lines[1]).expect("parse second line");
    assert_eq!(second["event_type"], "override_denied");
    assert_eq!(second["operator_id"], "supervisor:ops");
    assert_eq!(second["reason"], "scope cut");
}

#[test]
fn entries_survive_a_serde_round_trip() {
    let entry = entry();
    let json = serde_json::to_string(&entry).expect("serialize entry");
    let back: AuditEntry = serde_json::from_str(&json).expect("deserialize entry");

    assert_eq!(back.task_id, entry.task_id);
    assert_eq!(back.outcome, entry.outcome);
    assert_eq!(back.timestamp, entry.timestamp);
}

#[test]
fn creates_nested_log_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("var").join("log").join("keepintouch");

    let writer = JsonlAuditWriter::new(nested.clone()).expect("create writer");
    writer.log_entry(entry()).expect("write entry");

    assert!(nested.is_dir());
    let count = fs::read_dir(&nested).expect("read dir").count();
    assert_eq!(count, 1);
}

#[test]
fn event_types_serialize_as_snake_case() {
    let values = [
        (AuditEventType::CheckIn, "\"check_in\""),
        (AuditEventType::SessionOpened, "\"session_opened\""),
        (AuditEventType::CompletionRequested, "\"completion_requested\""),
        (AuditEventType::OverrideGranted, "\"override_granted\""),
        (AuditEventType::OverrideDenied, "\"override_denied\""),
    ];

    for (variant, expected) in values {
        let json = serde_json::to_string(&variant).expect("serialize");
        assert_eq!(json, expected, "AuditEventType::{variant:?}");
    }
}
