//! Completion permission model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity recorded as the grantor when liveness alone granted completion.
pub const SYSTEM_AUTO: &str = "system:auto";

/// Lifecycle status for a completion permission record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Awaiting a grantable liveness window or a supervisor decision.
    Pending,
    /// Completion allowed. Terminal.
    Granted,
    /// Completion refused by a supervisor. Terminal.
    Denied,
}

impl PermissionStatus {
    /// Whether this status can never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Granted | Self::Denied)
    }
}

/// Persisted completion decision state for one `(task_id, agent_id)` pair.
///
/// At most one record exists per pair; re-requests update the same record
/// until it reaches a terminal status, after which it is only replayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CompletionPermission {
    /// Unique record identifier.
    pub id: String,
    /// Task the agent wants to mark complete.
    pub task_id: String,
    /// Requesting agent.
    pub agent_id: String,
    /// Session offered as liveness evidence, if any.
    pub session_id: Option<String>,
    /// Current lifecycle status.
    pub status: PermissionStatus,
    /// Timestamp of the first request for this pair. Preserved across
    /// re-requests.
    pub requested_at: DateTime<Utc>,
    /// Timestamp of the terminal decision.
    pub decided_at: Option<DateTime<Utc>>,
    /// Identity that granted or denied; [`SYSTEM_AUTO`] for the automatic
    /// path.
    pub granted_by: Option<String>,
    /// Human-readable rationale for the current status.
    pub reason: Option<String>,
    /// Suggested seconds before the caller retries a pending decision.
    pub retry_after_seconds: Option<u32>,
}

impl CompletionPermission {
    /// Construct a new pending record for a pair's first request.
    #[must_use]
    pub fn new_pending(
        task_id: String,
        agent_id: String,
        session_id: Option<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_id,
            agent_id,
            session_id,
            status: PermissionStatus::Pending,
            requested_at,
            decided_at: None,
            granted_by: None,
            reason: None,
            retry_after_seconds: None,
        }
    }
}

/// Input shape for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CompletionRequest {
    /// Task the agent wants to mark complete.
    pub task_id: String,
    /// Requesting agent.
    pub agent_id: String,
    /// Session offered as liveness evidence. Absent means no evidence.
    #[serde(default)]
    pub session_id: Option<String>,
}
