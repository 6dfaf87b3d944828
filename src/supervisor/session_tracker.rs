//! Session liveness tracking over the persisted check-in timestamps.
//!
//! The tracker owns every mutation of `agent_session` rows and the
//! read-side liveness derivation. Liveness is always recomputed from
//! `last_check_in_at` and the injected clock; the stored
//! `missed_check_ins` counter is advisory and only refreshed here so
//! raw-table readers see degradation.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::clock::Clock;
use crate::config::SupervisorConfig;
use crate::models::session::{
    AgentSession, CheckInRequest, Liveness, SessionSnapshot,
};
use crate::persistence::session_repo::SessionRepo;
use crate::{AppError, Result};

use super::locks::KeyedLocks;

/// Tracks per-agent work sessions and derives their liveness.
#[derive(Clone)]
pub struct SessionTracker {
    repo: SessionRepo,
    clock: Arc<dyn Clock>,
    check_in_interval_seconds: u32,
    missed_check_in_threshold: u32,
    locks: Arc<KeyedLocks>,
}

fn validate_ids(session_id: &str, agent_id: &str) -> Result<()> {
    if session_id.is_empty() {
        return Err(AppError::Validation("session_id must not be empty".into()));
    }
    if agent_id.is_empty() {
        return Err(AppError::Validation("agent_id must not be empty".into()));
    }
    Ok(())
}

fn lock_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

impl SessionTracker {
    /// Create a tracker over the given repository, clock, and thresholds.
    #[must_use]
    pub fn new(
        repo: SessionRepo,
        clock: Arc<dyn Clock>,
        config: &SupervisorConfig,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            repo,
            clock,
            check_in_interval_seconds: config.check_in_interval_seconds,
            missed_check_in_threshold: config.missed_check_in_threshold,
            locks,
        }
    }

    /// Open a session without recording a check-in.
    ///
    /// The new session's `last_check_in_at` equals its creation time, so
    /// an agent that opens a session and then goes silent becomes overdue
    /// and stale on the ordinary schedule. Re-opening an existing session
    /// owned by the same agent is a no-op returning the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for empty identifiers or a session
    /// owned by a different agent, `AppError::Unavailable` on storage
    /// failure.
    pub async fn open_session(&self, session_id: &str, agent_id: &str) -> Result<SessionSnapshot> {
        validate_ids(session_id, agent_id)?;

        let span = info_span!("open_session", session_id, agent_id);
        async {
            let _lock = self.locks.acquire(&lock_key(session_id)).await;

            if let Some(existing) = self.repo.get(session_id).await? {
                if existing.agent_id != agent_id {
                    return Err(AppError::Validation(format!(
                        "session {session_id} belongs to a different agent"
                    )));
                }
                return Ok(SessionSnapshot::of(existing));
            }

            let session = AgentSession::new(
                session_id.to_owned(),
                agent_id.to_owned(),
                self.check_in_interval_seconds,
                self.clock.now(),
            );
            self.repo.create(&session).await?;
            info!("session opened");

            Ok(SessionSnapshot::of(session))
        }
        .instrument(span)
        .await
    }

    /// Record a check-in, creating the session on first contact.
    ///
    /// Resets the liveness clock and overwrites the activity fields with
    /// the reported values; optional fields left absent in the request
    /// overwrite stored values with absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for empty identifiers, progress
    /// above 100, or a session owned by a different agent; nothing is
    /// written in those cases. Returns `AppError::Unavailable` on storage
    /// failure.
    pub async fn record_check_in(&self, request: &CheckInRequest) -> Result<SessionSnapshot> {
        validate_ids(&request.session_id, &request.agent_id)?;
        if let Some(progress) = request.progress_percent {
            if progress > 100 {
                return Err(AppError::Validation(
                    "progress_percent must be between 0 and 100".into(),
                ));
            }
        }

        let span = info_span!(
            "record_check_in",
            session_id = %request.session_id,
            agent_id = %request.agent_id,
        );
        async {
            let _lock = self.locks.acquire(&lock_key(&request.session_id)).await;
            let now = self.clock.now();

            let session = match self.repo.get(&request.session_id).await? {
                None => {
                    let mut session = AgentSession::new(
                        request.session_id.clone(),
                        request.agent_id.clone(),
                        self.check_in_interval_seconds,
                        now,
                    );
                    session.current_activity = request.current_activity.clone();
                    session.progress_percent = request.progress_percent;
                    session.blockers = request.blockers.clone();
                    self.repo.create(&session).await?;
                    info!("session created on first check-in");
                    session
                }
                Some(existing) if existing.agent_id != request.agent_id => {
                    return Err(AppError::Validation(format!(
                        "session {} belongs to a different agent",
                        request.session_id
                    )));
                }
                Some(mut existing) => {
                    self.repo
                        .record_check_in(
                            &request.session_id,
                            now,
                            request.current_activity.as_deref(),
                            request.progress_percent,
                            &request.blockers,
                        )
                        .await?;
                    existing.last_check_in_at = now;
                    existing.missed_check_ins = 0;
                    existing.current_activity = request.current_activity.clone();
                    existing.progress_percent = request.progress_percent;
                    existing.blockers = request.blockers.clone();
                    info!("check-in recorded");
                    existing
                }
            };

            Ok(SessionSnapshot::of(session))
        }
        .instrument(span)
        .await
    }

    /// Derive liveness for a session at the clock's current instant.
    ///
    /// Pure read: never creates or mutates a session. An unknown session
    /// reads as never seen, which is stale.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the lookup fails.
    pub async fn liveness(&self, session_id: &str) -> Result<Liveness> {
        match self.repo.get(session_id).await? {
            Some(session) => {
                Ok(session.liveness_at(self.missed_check_in_threshold, self.clock.now()))
            }
            None => Ok(Liveness::never_seen()),
        }
    }

    /// Derive liveness usable as completion evidence for `agent_id`.
    ///
    /// A session owned by a different agent proves nothing about the
    /// requester and reads as never seen.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the lookup fails.
    pub async fn liveness_evidence(&self, session_id: &str, agent_id: &str) -> Result<Liveness> {
        match self.repo.get(session_id).await? {
            Some(session) if session.agent_id == agent_id => {
                Ok(session.liveness_at(self.missed_check_in_threshold, self.clock.now()))
            }
            Some(_) => {
                warn!(session_id, agent_id, "liveness evidence from foreign session ignored");
                Ok(Liveness::never_seen())
            }
            None => Ok(Liveness::never_seen()),
        }
    }

    /// Fetch a session record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the lookup fails.
    pub async fn session(&self, session_id: &str) -> Result<Option<AgentSession>> {
        self.repo.get(session_id).await
    }

    /// Fetch a session together with its derived due time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the lookup fails.
    pub async fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        Ok(self.repo.get(session_id).await?.map(SessionSnapshot::of))
    }

    /// List all sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the query fails.
    pub async fn list_sessions(&self) -> Result<Vec<AgentSession>> {
        self.repo.list().await
    }

    /// Recompute and persist the stored missed-check-in counters.
    ///
    /// Each session is re-read under its own lock so a concurrent
    /// check-in cannot be clobbered with a stale count. Returns the
    /// number of rows whose counter changed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` on storage failure.
    pub async fn refresh_missed_check_ins(&self) -> Result<u64> {
        let now = self.clock.now();
        let mut updated: u64 = 0;

        for session in self.repo.list().await? {
            let _lock = self.locks.acquire(&lock_key(&session.session_id)).await;
            let Some(current) = self.repo.get(&session.session_id).await? else {
                continue;
            };
            let missed = current
                .liveness_at(self.missed_check_in_threshold, now)
                .missed_check_ins;
            if self
                .repo
                .update_missed_check_ins(&current.session_id, missed)
                .await?
            {
                updated += 1;
            }
        }

        Ok(updated)
    }
}
