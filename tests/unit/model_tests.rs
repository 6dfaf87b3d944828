//! Serialize/deserialize round-trip tests for the domain models.

use chrono::{TimeZone, Utc};

use agent_keepintouch::models::decision::{CheckInAck, Decision, RequiredAction};
use agent_keepintouch::models::permission::{
    CompletionPermission, CompletionRequest, PermissionStatus, SYSTEM_AUTO,
};
use agent_keepintouch::models::session::{
    AgentSession, CheckInRequest, LivenessState, SessionSnapshot,
};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0)
        .single()
        .expect("valid instant")
}

// ── Enums ────────────────────────────────────────────

#[test]
fn liveness_state_serialization() {
    let values = [
        (LivenessState::Active, "\"active\""),
        (LivenessState::Overdue, "\"overdue\""),
        (LivenessState::Stale, "\"stale\""),
    ];

    for (variant, expected) in values {
        let json = serde_json::to_string(&variant).expect("serialize");
        assert_eq!(json, expected, "LivenessState::{variant:?}");
        let back: LivenessState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, variant);
    }
}

#[test]
fn permission_status_serialization() {
    let values = [
        (PermissionStatus::Pending, "\"pending\""),
        (PermissionStatus::Granted, "\"granted\""),
        (PermissionStatus::Denied, "\"denied\""),
    ];

    for (variant, expected) in values {
        let json = serde_json::to_string(&variant).expect("serialize");
        assert_eq!(json, expected, "PermissionStatus::{variant:?}");
        let back: PermissionStatus = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, variant);
    }
}

#[test]
fn required_action_uses_screaming_snake_case() {
    let json = serde_json::to_string(&RequiredAction::CheckIn).expect("serialize");
    assert_eq!(json, "\"CHECK_IN\"");
}

#[test]
fn only_granted_and_denied_are_terminal() {
    assert!(!PermissionStatus::Pending.is_terminal());
    assert!(PermissionStatus::Granted.is_terminal());
    assert!(PermissionStatus::Denied.is_terminal());
}

// ── Sessions ─────────────────────────────────────────

#[test]
fn agent_session_round_trip() {
    let mut session = AgentSession::new("sess-1".into(), "agent-a".into(), 1800, t0());
    session.current_activity = Some("writing tests".into());
    session.progress_percent = Some(55);
    session.blockers = vec!["flaky CI".into()];

    let json = serde_json::to_string(&session).expect("serialize session");
    let back: AgentSession = serde_json::from_str(&json).expect("deserialize session");

    assert_eq!(back, session);
}

#[test]
fn snapshot_flattens_the_session_fields() {
    let session = AgentSession::new("sess-1".into(), "agent-a".into(), 1800, t0());
    let snapshot = SessionSnapshot::of(session);

    let value = serde_json::to_value(&snapshot).expect("serialize snapshot");
    assert_eq!(value["session_id"], "sess-1");
    assert_eq!(value["agent_id"], "agent-a");
    assert!(value["next_check_in_due"].is_string());
    assert!(value.get("session").is_none(), "no nested wrapper");
}

#[test]
fn check_in_request_defaults_optional_fields() {
    let request: CheckInRequest =
        serde_json::from_str(r#"{"session_id": "sess-1", "agent_id": "agent-a"}"#)
            .expect("deserialize request");

    assert_eq!(request.session_id, "sess-1");
    assert_eq!(request.current_activity, None);
    assert_eq!(request.progress_percent, None);
    assert!(request.blockers.is_empty());
}

// ── Permissions ──────────────────────────────────────

#[test]
fn new_pending_records_start_undecided() {
    let record = CompletionPermission::new_pending(
        "task-1".into(),
        "agent-a".into(),
        Some("sess-1".into()),
        t0(),
    );

    assert_eq!(record.status, PermissionStatus::Pending);
    assert_eq!(record.requested_at, t0());
    assert_eq!(record.decided_at, None);
    assert_eq!(record.granted_by, None);
    assert_eq!(record.retry_after_seconds, None);

    let other =
        CompletionPermission::new_pending("task-1".into(), "agent-a".into(), None, t0());
    assert_ne!(record.id, other.id, "record ids are unique");
}

#[test]
fn completion_request_defaults_the_session() {
    let request: CompletionRequest =
        serde_json::from_str(r#"{"task_id": "task-1", "agent_id": "agent-a"}"#)
            .expect("deserialize request");

    assert_eq!(request.task_id, "task-1");
    assert_eq!(request.session_id, None);
}

// ── Decisions ────────────────────────────────────────

#[test]
fn decision_round_trip() {
    let decisions = [
        Decision::Granted {
            granted_at: t0(),
            granted_by: SYSTEM_AUTO.to_owned(),
        },
        Decision::Pending {
            reason: "awaiting liveness confirmation".to_owned(),
            message: "retry in 30 seconds".to_owned(),
            retry_after_seconds: 30,
        },
        Decision::ActionRequired {
            required_action: RequiredAction::CheckIn,
            message: "check in first".to_owned(),
        },
        Decision::Denied {
            decided_at: t0(),
            decided_by: "supervisor:ops".to_owned(),
            reason: None,
        },
    ];

    for decision in decisions {
        let json = serde_json::to_string(&decision).expect("serialize decision");
        let back: Decision = serde_json::from_str(&json).expect("deserialize decision");
        assert_eq!(back, decision);
    }
}

#[test]
fn only_a_grant_permits_completion() {
    let granted = Decision::Granted {
        granted_at: t0(),
        granted_by: SYSTEM_AUTO.to_owned(),
    };
    assert!(granted.is_granted());

    let pending = Decision::Pending {
        reason: "awaiting liveness confirmation".to_owned(),
        message: "retry".to_owned(),
        retry_after_seconds: 30,
    };
    assert!(!pending.is_granted());
}

#[test]
fn check_in_ack_round_trip() {
    let ack = CheckInAck {
        session_id: "sess-1".to_owned(),
        next_check_in_due: t0(),
        missed_check_ins: 0,
    };

    let json = serde_json::to_string(&ack).expect("serialize ack");
    let back: CheckInAck = serde_json::from_str(&json).expect("deserialize ack");
    assert_eq!(back, ack);
}
