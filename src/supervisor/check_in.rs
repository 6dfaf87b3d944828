//! Check-in recording facade.
//!
//! Thin layer over [`SessionTracker::record_check_in`] that maps the
//! snapshot to the caller-facing acknowledgement and emits the audit
//! entry. This is the only path that writes liveness-positive state.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use crate::audit::{self, AuditEntry, AuditEventType, AuditLogger};
use crate::models::decision::CheckInAck;
use crate::models::session::CheckInRequest;
use crate::Result;

use super::session_tracker::SessionTracker;

/// Records agent check-ins and acknowledges them.
#[derive(Clone)]
pub struct CheckInRecorder {
    tracker: SessionTracker,
    audit: Option<Arc<dyn AuditLogger>>,
}

impl CheckInRecorder {
    /// Create a recorder over the given tracker.
    #[must_use]
    pub fn new(tracker: SessionTracker, audit: Option<Arc<dyn AuditLogger>>) -> Self {
        Self { tracker, audit }
    }

    /// Record a check-in and return the acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed or foreign-session
    /// requests, `AppError::Unavailable` on storage failure. No audit
    /// entry is emitted for failed check-ins.
    pub async fn check_in(&self, request: &CheckInRequest) -> Result<CheckInAck> {
        let span = info_span!(
            "check_in",
            session_id = %request.session_id,
            agent_id = %request.agent_id,
        );
        let snapshot = self
            .tracker
            .record_check_in(request)
            .instrument(span)
            .await?;

        audit::emit(
            self.audit.as_deref(),
            AuditEntry::new(AuditEventType::CheckIn)
                .with_session(snapshot.session.session_id.clone())
                .with_agent(snapshot.session.agent_id.clone()),
        );

        Ok(CheckInAck {
            session_id: snapshot.session.session_id,
            next_check_in_due: snapshot.next_check_in_due,
            missed_check_ins: snapshot.session.missed_check_ins,
        })
    }
}
