//! JSON contract tests for the check-in request and acknowledgement.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use agent_keepintouch::models::decision::CheckInAck;
use agent_keepintouch::models::permission::CompletionRequest;
use agent_keepintouch::models::session::CheckInRequest;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 30, 0)
        .single()
        .expect("valid instant")
}

fn keys(value: &Value) -> Vec<&str> {
    let mut keys: Vec<&str> = value
        .as_object()
        .expect("json object")
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    keys
}

#[test]
fn acknowledgement_shape() {
    let ack = CheckInAck {
        session_id: "sess-1".to_owned(),
        next_check_in_due: t0(),
        missed_check_ins: 0,
    };
    let value = serde_json::to_value(&ack).expect("serialize");

    assert_eq!(
        keys(&value),
        vec!["missed_check_ins", "next_check_in_due", "session_id"]
    );
    assert_eq!(value["session_id"], "sess-1");
    assert_eq!(value["missed_check_ins"], 0);

    let due = value["next_check_in_due"]
        .as_str()
        .expect("timestamp is a string");
    DateTime::parse_from_rfc3339(due).expect("timestamp is RFC 3339");
}

#[test]
fn check_in_request_accepts_the_minimal_payload() {
    let request: CheckInRequest =
        serde_json::from_str(r#"{"session_id": "sess-1", "agent_id": "agent-a"}"#)
            .expect("deserialize");

    assert_eq!(request.session_id, "sess-1");
    assert_eq!(request.agent_id, "agent-a");
    assert!(request.blockers.is_empty());
}

#[test]
fn check_in_request_accepts_the_full_payload() {
    let request: CheckInRequest = serde_json::from_str(
        r#"{
            "session_id": "sess-1",
            "agent_id": "agent-a",
            "current_activity": "running the migration",
            "progress_percent": 80,
            "blockers": ["db lock held", "slow CI"]
        }"#,
    )
    .expect("deserialize");

    assert_eq!(
        request.current_activity.as_deref(),
        Some("running the migration")
    );
    assert_eq!(request.progress_percent, Some(80));
    assert_eq!(request.blockers.len(), 2);
}

#[test]
fn completion_request_shape() {
    let request: CompletionRequest = serde_json::from_str(
        r#"{"task_id": "task-1", "agent_id": "agent-a", "session_id": "sess-1"}"#,
    )
    .expect("deserialize");
    assert_eq!(request.session_id.as_deref(), Some("sess-1"));

    let value = serde_json::to_value(&request).expect("serialize");
    assert_eq!(keys(&value), vec!["agent_id", "session_id", "task_id"]);
}
