//! Supervision facade wiring the tracker, recorder, and gate together.
//!
//! A [`Supervisor`] is stateless beyond its injected handles: any number
//! of instances over the same store cooperate, because single-decision
//! atomicity lives in the store itself and in-process races are
//! serialized by the shared key locks.

pub mod check_in;
pub mod locks;
pub mod permission_gate;
pub mod session_tracker;
pub mod sweeper;

use std::sync::Arc;

use crate::audit::{self, AuditEntry, AuditEventType, AuditLogger};
use crate::clock::Clock;
use crate::config::SupervisorConfig;
use crate::models::decision::{CheckInAck, Decision};
use crate::models::permission::{CompletionPermission, CompletionRequest};
use crate::models::session::{AgentSession, CheckInRequest, Liveness, SessionSnapshot};
use crate::persistence::db::Database;
use crate::persistence::permission_repo::PermissionRepo;
use crate::persistence::session_repo::SessionRepo;
use crate::Result;

use check_in::CheckInRecorder;
use locks::KeyedLocks;
use permission_gate::PermissionGate;
use session_tracker::SessionTracker;

/// The keep-in-touch supervisor: liveness tracking plus completion
/// gating over one shared store.
pub struct Supervisor {
    tracker: SessionTracker,
    recorder: CheckInRecorder,
    gate: PermissionGate,
    audit: Option<Arc<dyn AuditLogger>>,
}

impl Supervisor {
    /// Wire a supervisor without an audit log.
    #[must_use]
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, config: &SupervisorConfig) -> Self {
        Self::with_audit(db, clock, config, None)
    }

    /// Wire a supervisor with an optional audit log.
    #[must_use]
    pub fn with_audit(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        config: &SupervisorConfig,
        audit: Option<Arc<dyn AuditLogger>>,
    ) -> Self {
        let locks = Arc::new(KeyedLocks::new());
        let tracker = SessionTracker::new(
            SessionRepo::new(Arc::clone(&db)),
            Arc::clone(&clock),
            config,
            Arc::clone(&locks),
        );
        let recorder = CheckInRecorder::new(tracker.clone(), audit.clone());
        let gate = PermissionGate::new(
            PermissionRepo::new(db),
            tracker.clone(),
            clock,
            config,
            locks,
            audit.clone(),
        );
        Self {
            tracker,
            recorder,
            gate,
            audit,
        }
    }

    /// The session tracker, for direct reads and the sweep task.
    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Open a session without recording a check-in.
    ///
    /// # Errors
    ///
    /// See [`SessionTracker::open_session`].
    pub async fn open_session(&self, session_id: &str, agent_id: &str) -> Result<SessionSnapshot> {
        let snapshot = self.tracker.open_session(session_id, agent_id).await?;
        audit::emit(
            self.audit.as_deref(),
            AuditEntry::new(AuditEventType::SessionOpened)
                .with_session(snapshot.session.session_id.clone())
                .with_agent(snapshot.session.agent_id.clone()),
        );
        Ok(snapshot)
    }

    /// Record a check-in and return the acknowledgement.
    ///
    /// # Errors
    ///
    /// See [`CheckInRecorder::check_in`].
    pub async fn check_in(&self, request: &CheckInRequest) -> Result<CheckInAck> {
        self.recorder.check_in(request).await
    }

    /// Derive liveness for a session.
    ///
    /// # Errors
    ///
    /// See [`SessionTracker::liveness`].
    pub async fn liveness(&self, session_id: &str) -> Result<Liveness> {
        self.tracker.liveness(session_id).await
    }

    /// List all sessions, oldest first.
    ///
    /// # Errors
    ///
    /// See [`SessionTracker::list_sessions`].
    pub async fn list_sessions(&self) -> Result<Vec<AgentSession>> {
        self.tracker.list_sessions().await
    }

    /// Decide a completion request.
    ///
    /// # Errors
    ///
    /// See [`PermissionGate::request_completion`].
    pub async fn request_completion(&self, request: &CompletionRequest) -> Result<Decision> {
        self.gate.request_completion(request).await
    }

    /// Grant completion manually.
    ///
    /// # Errors
    ///
    /// See [`PermissionGate::grant_override`].
    pub async fn grant_override(
        &self,
        task_id: &str,
        agent_id: &str,
        decided_by: &str,
        reason: Option<String>,
    ) -> Result<CompletionPermission> {
        self.gate
            .grant_override(task_id, agent_id, decided_by, reason)
            .await
    }

    /// Deny completion manually.
    ///
    /// # Errors
    ///
    /// See [`PermissionGate::deny_override`].
    pub async fn deny_override(
        &self,
        task_id: &str,
        agent_id: &str,
        decided_by: &str,
        reason: Option<String>,
    ) -> Result<CompletionPermission> {
        self.gate
            .deny_override(task_id, agent_id, decided_by, reason)
            .await
    }

    /// List pending permission records, oldest request first.
    ///
    /// # Errors
    ///
    /// See [`PermissionGate::list_pending`].
    pub async fn list_pending(&self) -> Result<Vec<CompletionPermission>> {
        self.gate.list_pending().await
    }

    /// Fetch the permission record for a pair.
    ///
    /// # Errors
    ///
    /// See [`PermissionGate::permission`].
    pub async fn permission(
        &self,
        task_id: &str,
        agent_id: &str,
    ) -> Result<Option<CompletionPermission>> {
        self.gate.permission(task_id, agent_id).await
    }

    /// Recompute and persist the stored missed-check-in counters.
    ///
    /// # Errors
    ///
    /// See [`SessionTracker::refresh_missed_check_ins`].
    pub async fn refresh_missed_check_ins(&self) -> Result<u64> {
        self.tracker.refresh_missed_check_ins().await
    }
}
