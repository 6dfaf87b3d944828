//! Agent session model and derived liveness.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Liveness classification derived from check-in recency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LivenessState {
    /// Last check-in is within the expected interval.
    Active,
    /// Past due but still within the staleness threshold.
    Overdue,
    /// Silent beyond the staleness threshold, or never seen at all.
    Stale,
}

/// Point-in-time liveness derived from a session's timestamps.
///
/// Derivation is pure: reading liveness never creates or mutates a
/// session, and repeated reads at the same instant return equal values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Liveness {
    /// Derived state.
    pub state: LivenessState,
    /// Seconds since the last check-in; `None` when the session has never
    /// been seen.
    pub elapsed_seconds: Option<i64>,
    /// Whole check-in intervals elapsed without contact.
    pub missed_check_ins: u32,
}

impl Liveness {
    /// Liveness of a session with no check-in history. Always stale.
    #[must_use]
    pub const fn never_seen() -> Self {
        Self {
            state: LivenessState::Stale,
            elapsed_seconds: None,
            missed_check_ins: 0,
        }
    }
}

/// A tracked agent work session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentSession {
    /// Session identifier supplied by the agent.
    pub session_id: String,
    /// Owning agent identifier.
    pub agent_id: String,
    /// Expected seconds between check-ins for this session.
    pub check_in_interval_seconds: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent check-in. Initialized to `created_at`
    /// for sessions opened without a check-in.
    pub last_check_in_at: DateTime<Utc>,
    /// Stored missed-interval counter, refreshed by the periodic sweep.
    /// Liveness reads recompute this from timestamps instead.
    pub missed_check_ins: u32,
    /// Free-form description of what the agent is doing.
    pub current_activity: Option<String>,
    /// Self-reported progress, 0 through 100.
    pub progress_percent: Option<u8>,
    /// Obstacles reported by the agent.
    pub blockers: Vec<String>,
}

impl AgentSession {
    /// Construct a fresh session whose last check-in is its creation time.
    #[must_use]
    pub fn new(
        session_id: String,
        agent_id: String,
        check_in_interval_seconds: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            agent_id,
            check_in_interval_seconds,
            created_at: now,
            last_check_in_at: now,
            missed_check_ins: 0,
            current_activity: None,
            progress_percent: None,
            blockers: Vec::new(),
        }
    }

    /// Instant by which the next check-in is expected.
    #[must_use]
    pub fn next_check_in_due(&self) -> DateTime<Utc> {
        self.last_check_in_at + Duration::seconds(i64::from(self.check_in_interval_seconds))
    }

    /// Derive liveness at `now` given the configured staleness multiple.
    ///
    /// Elapsed time below zero (clock skew between writers) clamps to
    /// zero, so a check-in recorded slightly in the future still reads as
    /// active. Boundaries are inclusive on the lower side: elapsed equal
    /// to the interval is still active, elapsed equal to
    /// `threshold * interval` is still overdue.
    #[must_use]
    pub fn liveness_at(&self, missed_check_in_threshold: u32, now: DateTime<Utc>) -> Liveness {
        let elapsed = (now - self.last_check_in_at).num_seconds().max(0);
        let interval = i64::from(self.check_in_interval_seconds);
        let stale_after = interval * i64::from(missed_check_in_threshold);

        let state = if elapsed <= interval {
            LivenessState::Active
        } else if elapsed <= stale_after {
            LivenessState::Overdue
        } else {
            LivenessState::Stale
        };

        Liveness {
            state,
            elapsed_seconds: Some(elapsed),
            missed_check_ins: u32::try_from(elapsed / interval).unwrap_or(u32::MAX),
        }
    }
}

/// Session record plus its derived due time, returned by write paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionSnapshot {
    /// The persisted session record.
    #[serde(flatten)]
    pub session: AgentSession,
    /// Instant by which the next check-in is expected.
    pub next_check_in_due: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Build a snapshot from a session record.
    #[must_use]
    pub fn of(session: AgentSession) -> Self {
        let next_check_in_due = session.next_check_in_due();
        Self {
            session,
            next_check_in_due,
        }
    }
}

/// Input shape for a check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CheckInRequest {
    /// Session the agent is reporting on.
    pub session_id: String,
    /// Reporting agent.
    pub agent_id: String,
    /// What the agent is currently doing.
    #[serde(default)]
    pub current_activity: Option<String>,
    /// Self-reported progress, 0 through 100.
    #[serde(default)]
    pub progress_percent: Option<u8>,
    /// Obstacles the agent is facing.
    #[serde(default)]
    pub blockers: Vec<String>,
}
