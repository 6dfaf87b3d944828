//! Completion gating: liveness-derived decisions plus supervisor
//! overrides.
//!
//! A grant is terminal. Every path that could produce one runs under the
//! pair's key lock and finishes by re-reading the stored record, so
//! racing requesters and a second supervisor instance sharing the store
//! all converge on the same single decision.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::audit::{self, AuditEntry, AuditEventType, AuditLogger};
use crate::clock::Clock;
use crate::config::SupervisorConfig;
use crate::models::decision::{Decision, RequiredAction};
use crate::models::permission::{
    CompletionPermission, CompletionRequest, PermissionStatus, SYSTEM_AUTO,
};
use crate::models::session::{Liveness, LivenessState};
use crate::persistence::permission_repo::PermissionRepo;
use crate::{AppError, Result};

use super::locks::KeyedLocks;
use super::session_tracker::SessionTracker;

/// Reason stored on records that are waiting out an overdue window.
const PENDING_REASON: &str = "awaiting liveness confirmation";

/// Decides completion requests from recorded liveness.
#[derive(Clone)]
pub struct PermissionGate {
    permissions: PermissionRepo,
    tracker: SessionTracker,
    clock: Arc<dyn Clock>,
    pending_backoff_seconds: u32,
    locks: Arc<KeyedLocks>,
    audit: Option<Arc<dyn AuditLogger>>,
}

fn lock_key(task_id: &str, agent_id: &str) -> String {
    format!("completion:{task_id}:{agent_id}")
}

fn validate_pair(task_id: &str, agent_id: &str) -> Result<()> {
    if task_id.is_empty() {
        return Err(AppError::Validation("task_id must not be empty".into()));
    }
    if agent_id.is_empty() {
        return Err(AppError::Validation("agent_id must not be empty".into()));
    }
    Ok(())
}

fn outcome_label(decision: &Decision) -> &'static str {
    match decision {
        Decision::Granted { .. } => "granted",
        Decision::Pending { .. } => "pending",
        Decision::ActionRequired { .. } => "action_required",
        Decision::Denied { .. } => "denied",
    }
}

impl PermissionGate {
    /// Create a gate over the given repositories, clock, and config.
    #[must_use]
    pub fn new(
        permissions: PermissionRepo,
        tracker: SessionTracker,
        clock: Arc<dyn Clock>,
        config: &SupervisorConfig,
        locks: Arc<KeyedLocks>,
        audit: Option<Arc<dyn AuditLogger>>,
    ) -> Self {
        Self {
            permissions,
            tracker,
            clock,
            pending_backoff_seconds: config.pending_backoff_seconds,
            locks,
            audit,
        }
    }

    /// Decide a completion request.
    ///
    /// A terminal record for the pair is replayed without recomputation.
    /// Otherwise the decision follows the liveness of the offered
    /// session: active grants, overdue defers, stale demands a check-in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for empty identifiers and
    /// `AppError::Unavailable` on storage failure; callers must treat the
    /// latter as not-granted.
    pub async fn request_completion(&self, request: &CompletionRequest) -> Result<Decision> {
        validate_pair(&request.task_id, &request.agent_id)?;

        let span = info_span!(
            "request_completion",
            task_id = %request.task_id,
            agent_id = %request.agent_id,
        );
        async {
            let _lock = self
                .locks
                .acquire(&lock_key(&request.task_id, &request.agent_id))
                .await;

            if let Some(stored) = self
                .permissions
                .get(&request.task_id, &request.agent_id)
                .await?
            {
                if stored.status.is_terminal() {
                    let decision = decision_from_record(&stored)?;
                    info!(outcome = outcome_label(&decision), "replaying terminal decision");
                    return Ok(decision);
                }
            }

            let liveness = match request.session_id.as_deref() {
                Some(session_id) => {
                    self.tracker
                        .liveness_evidence(session_id, &request.agent_id)
                        .await?
                }
                None => Liveness::never_seen(),
            };

            let decision = match liveness.state {
                LivenessState::Stale => demand_check_in(&liveness),
                LivenessState::Overdue => self.defer(request).await?,
                LivenessState::Active => self.grant(request).await?,
            };

            info!(
                outcome = outcome_label(&decision),
                state = ?liveness.state,
                "completion decided"
            );
            audit::emit(
                self.audit.as_deref(),
                AuditEntry::new(AuditEventType::CompletionRequested)
                    .with_task(request.task_id.clone())
                    .with_agent(request.agent_id.clone())
                    .with_outcome(outcome_label(&decision).to_owned()),
            );

            Ok(decision)
        }
        .instrument(span)
        .await
    }

    /// Overdue liveness: park the pair as pending with a retry hint.
    async fn defer(&self, request: &CompletionRequest) -> Result<Decision> {
        let mut record = CompletionPermission::new_pending(
            request.task_id.clone(),
            request.agent_id.clone(),
            request.session_id.clone(),
            self.clock.now(),
        );
        record.reason = Some(PENDING_REASON.to_owned());
        record.retry_after_seconds = Some(self.pending_backoff_seconds);
        self.permissions.upsert_pending(&record).await?;

        // The guarded upsert is a no-op against a terminal row written by
        // another instance; re-read so the stored outcome wins.
        let stored = self.fetch_pair(&request.task_id, &request.agent_id).await?;
        if stored.status.is_terminal() {
            return decision_from_record(&stored);
        }

        Ok(Decision::Pending {
            reason: PENDING_REASON.to_owned(),
            message: format!(
                "agent is overdue for check-in; retry in {} seconds",
                self.pending_backoff_seconds
            ),
            retry_after_seconds: self.pending_backoff_seconds,
        })
    }

    /// Active liveness: record the automatic grant.
    async fn grant(&self, request: &CompletionRequest) -> Result<Decision> {
        let now = self.clock.now();
        let record = CompletionPermission {
            id: Uuid::new_v4().to_string(),
            task_id: request.task_id.clone(),
            agent_id: request.agent_id.clone(),
            session_id: request.session_id.clone(),
            status: PermissionStatus::Granted,
            requested_at: now,
            decided_at: Some(now),
            granted_by: Some(SYSTEM_AUTO.to_owned()),
            reason: Some("agent liveness confirmed".to_owned()),
            retry_after_seconds: None,
        };
        self.permissions.decide(&record).await?;

        let stored = self.fetch_pair(&request.task_id, &request.agent_id).await?;
        decision_from_record(&stored)
    }

    /// Grant completion manually, bypassing the liveness evaluation.
    ///
    /// Re-granting an already granted pair replays the stored record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for empty identifiers or a pair
    /// already terminally denied, `AppError::Unavailable` on storage
    /// failure.
    pub async fn grant_override(
        &self,
        task_id: &str,
        agent_id: &str,
        decided_by: &str,
        reason: Option<String>,
    ) -> Result<CompletionPermission> {
        self.decide_override(task_id, agent_id, decided_by, reason, PermissionStatus::Granted)
            .await
    }

    /// Deny completion manually.
    ///
    /// Re-denying an already denied pair replays the stored record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for empty identifiers or a pair
    /// already terminally granted, `AppError::Unavailable` on storage
    /// failure.
    pub async fn deny_override(
        &self,
        task_id: &str,
        agent_id: &str,
        decided_by: &str,
        reason: Option<String>,
    ) -> Result<CompletionPermission> {
        self.decide_override(task_id, agent_id, decided_by, reason, PermissionStatus::Denied)
            .await
    }

    async fn decide_override(
        &self,
        task_id: &str,
        agent_id: &str,
        decided_by: &str,
        reason: Option<String>,
        status: PermissionStatus,
    ) -> Result<CompletionPermission> {
        validate_pair(task_id, agent_id)?;
        if decided_by.is_empty() {
            return Err(AppError::Validation("decided_by must not be empty".into()));
        }

        let span = info_span!("decide_override", task_id, agent_id, decided_by, ?status);
        async {
            let _lock = self.locks.acquire(&lock_key(task_id, agent_id)).await;

            if let Some(stored) = self.permissions.get(task_id, agent_id).await? {
                if stored.status == status {
                    info!("override replayed");
                    return Ok(stored);
                }
                if stored.status.is_terminal() {
                    return Err(terminal_conflict(stored.status));
                }
            }

            let now = self.clock.now();
            let record = CompletionPermission {
                id: Uuid::new_v4().to_string(),
                task_id: task_id.to_owned(),
                agent_id: agent_id.to_owned(),
                session_id: None,
                status,
                requested_at: now,
                decided_at: Some(now),
                granted_by: Some(decided_by.to_owned()),
                reason: reason.clone(),
                retry_after_seconds: None,
            };
            self.permissions.decide(&record).await?;

            let stored = self.fetch_pair(task_id, agent_id).await?;
            if stored.status != status {
                // Another instance reached a different terminal state first.
                warn!(stored = ?stored.status, "override lost to an earlier terminal decision");
                return Err(terminal_conflict(stored.status));
            }

            let event_type = match status {
                PermissionStatus::Granted => AuditEventType::OverrideGranted,
                _ => AuditEventType::OverrideDenied,
            };
            let mut entry = AuditEntry::new(event_type)
                .with_task(task_id.to_owned())
                .with_agent(agent_id.to_owned())
                .with_operator(decided_by.to_owned());
            if let Some(reason) = reason {
                entry = entry.with_reason(reason);
            }
            audit::emit(self.audit.as_deref(), entry);
            info!("completion decided by override");

            Ok(stored)
        }
        .instrument(span)
        .await
    }

    /// List pending permission records, oldest request first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<CompletionPermission>> {
        self.permissions.list_pending().await
    }

    /// Fetch the permission record for a pair.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the lookup fails.
    pub async fn permission(
        &self,
        task_id: &str,
        agent_id: &str,
    ) -> Result<Option<CompletionPermission>> {
        self.permissions.get(task_id, agent_id).await
    }

    async fn fetch_pair(&self, task_id: &str, agent_id: &str) -> Result<CompletionPermission> {
        self.permissions.get(task_id, agent_id).await?.ok_or_else(|| {
            AppError::Unavailable(format!(
                "permission record for task {task_id} vanished after write"
            ))
        })
    }
}

/// Stale liveness: demand a check-in, touch nothing.
fn demand_check_in(liveness: &Liveness) -> Decision {
    let message = if liveness.elapsed_seconds.is_some() {
        "session is stale; check in to confirm liveness, then request completion again"
    } else {
        "no live session evidence; check in to confirm liveness, then request completion again"
    };
    Decision::ActionRequired {
        required_action: RequiredAction::CheckIn,
        message: message.to_owned(),
    }
}

fn terminal_conflict(status: PermissionStatus) -> AppError {
    match status {
        PermissionStatus::Granted => {
            AppError::Validation("completion already granted; terminal decisions do not change".into())
        }
        _ => AppError::Validation("completion already denied; terminal decisions do not change".into()),
    }
}

/// Map a stored record onto the caller-facing decision.
///
/// Terminal rows missing their decision metadata are treated as storage
/// corruption so the caller fails closed.
fn decision_from_record(record: &CompletionPermission) -> Result<Decision> {
    match record.status {
        PermissionStatus::Granted => Ok(Decision::Granted {
            granted_at: record.decided_at.ok_or_else(|| {
                AppError::Unavailable("granted record is missing decided_at".into())
            })?,
            granted_by: record
                .granted_by
                .clone()
                .ok_or_else(|| AppError::Unavailable("granted record is missing granted_by".into()))?,
        }),
        PermissionStatus::Denied => Ok(Decision::Denied {
            decided_at: record.decided_at.ok_or_else(|| {
                AppError::Unavailable("denied record is missing decided_at".into())
            })?,
            decided_by: record
                .granted_by
                .clone()
                .ok_or_else(|| AppError::Unavailable("denied record is missing granted_by".into()))?,
            reason: record.reason.clone(),
        }),
        PermissionStatus::Pending => {
            let retry_after_seconds = record.retry_after_seconds.unwrap_or(0);
            Ok(Decision::Pending {
                reason: record
                    .reason
                    .clone()
                    .unwrap_or_else(|| PENDING_REASON.to_owned()),
                message: format!(
                    "agent is overdue for check-in; retry in {retry_after_seconds} seconds"
                ),
                retry_after_seconds,
            })
        }
    }
}
