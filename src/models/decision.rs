//! Decision and acknowledgement shapes returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action an agent must take before a completion request can be
/// reconsidered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequiredAction {
    /// The agent must check in to prove it is alive.
    CheckIn,
}

/// Outcome of a completion request.
///
/// `Pending` and `ActionRequired` are ordinary outcomes, not errors: the
/// request was understood and the answer is "not yet". `Granted` and
/// `Denied` are terminal for the pair and replayed verbatim on
/// re-request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// Completion is allowed.
    Granted {
        /// When the grant was recorded.
        granted_at: DateTime<Utc>,
        /// Identity that granted, automatic or supervisor.
        granted_by: String,
    },
    /// Not decidable yet; the caller should retry after the backoff.
    Pending {
        /// Why the decision is deferred.
        reason: String,
        /// Guidance for the caller.
        message: String,
        /// Suggested seconds before retrying.
        retry_after_seconds: u32,
    },
    /// The agent must act before the request can be reconsidered.
    ActionRequired {
        /// The action to take.
        required_action: RequiredAction,
        /// Guidance for the caller.
        message: String,
    },
    /// Completion is refused.
    Denied {
        /// When the denial was recorded.
        decided_at: DateTime<Utc>,
        /// Supervisor identity that denied.
        decided_by: String,
        /// Rationale, if one was given.
        reason: Option<String>,
    },
}

impl Decision {
    /// Whether this decision permits the caller to mark the task complete.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Acknowledgement returned for a recorded check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CheckInAck {
    /// Session the check-in was recorded against.
    pub session_id: String,
    /// Instant by which the next check-in is expected.
    pub next_check_in_due: DateTime<Utc>,
    /// Missed-interval counter after this check-in. Always zero, kept in
    /// the shape so callers see the reset explicitly.
    pub missed_check_ins: u32,
}
