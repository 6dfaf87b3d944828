//! Structured audit logging for supervision events.
//!
//! Provides the [`AuditLogger`] trait and associated types. The primary
//! implementation, [`JsonlAuditWriter`], appends JSONL records to
//! daily-rotating files. Audit is strictly best-effort: operations never
//! fail because a log line could not be written.

pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Event type classification for audit log entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Agent recorded a check-in.
    CheckIn,
    /// Session opened without a check-in.
    SessionOpened,
    /// Agent requested completion; `outcome` carries the decision.
    CompletionRequested,
    /// Supervisor granted completion manually.
    OverrideGranted,
    /// Supervisor denied completion manually.
    OverrideDenied,
}

/// A structured record of a supervision event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp with timezone.
    pub timestamp: DateTime<Utc>,
    /// Event classification.
    pub event_type: AuditEventType,
    /// Associated session identifier, when one is involved.
    pub session_id: Option<String>,
    /// Task identifier for completion events.
    pub task_id: Option<String>,
    /// Agent identifier.
    pub agent_id: Option<String>,
    /// Decision outcome for completion events.
    pub outcome: Option<String>,
    /// Supervisor identity for override events.
    pub operator_id: Option<String>,
    /// Rationale attached to the event.
    pub reason: Option<String>,
}

impl AuditEntry {
    /// Construct a minimal audit entry for the given event type.
    #[must_use]
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            session_id: None,
            task_id: None,
            agent_id: None,
            outcome: None,
            operator_id: None,
            reason: None,
        }
    }

    /// Set the session identifier for this entry.
    #[must_use]
    pub fn with_session(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Set the task identifier for this entry.
    #[must_use]
    pub fn with_task(mut self, task_id: String) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Set the agent identifier for this entry.
    #[must_use]
    pub fn with_agent(mut self, agent_id: String) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    /// Set the decision outcome for this entry.
    #[must_use]
    pub fn with_outcome(mut self, outcome: String) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set the supervisor identity for this entry.
    #[must_use]
    pub fn with_operator(mut self, operator_id: String) -> Self {
        self.operator_id = Some(operator_id);
        self
    }

    /// Set the rationale for this entry.
    #[must_use]
    pub fn with_reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Writes structured audit entries to a persistent store.
///
/// Implementations must be [`Send`] and [`Sync`] to allow sharing across
/// async task boundaries via [`std::sync::Arc`].
pub trait AuditLogger: Send + Sync {
    /// Record a single audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write operation fails.
    fn log_entry(&self, entry: AuditEntry) -> crate::Result<()>;
}

/// Emit an entry to an optional logger, swallowing write failures.
pub(crate) fn emit(logger: Option<&dyn AuditLogger>, entry: AuditEntry) {
    if let Some(logger) = logger {
        if let Err(err) = logger.log_entry(entry) {
            warn!(?err, "audit write failed");
        }
    }
}

pub use writer::JsonlAuditWriter;
