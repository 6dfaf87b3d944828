//! Agent session repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::session::AgentSession;
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for agent session records.
#[derive(Clone)]
pub struct SessionRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    agent_id: String,
    check_in_interval_seconds: i64,
    created_at: String,
    last_check_in_at: String,
    missed_check_ins: i64,
    current_activity: Option<String>,
    progress_percent: Option<i64>,
    blockers: String,
}

impl SessionRow {
    /// Convert a database row into the domain model.
    fn into_session(self) -> Result<AgentSession> {
        let created_at = parse_timestamp(&self.created_at, "created_at")?;
        let last_check_in_at = parse_timestamp(&self.last_check_in_at, "last_check_in_at")?;
        let check_in_interval_seconds = u32::try_from(self.check_in_interval_seconds)
            .map_err(|_| AppError::Unavailable("invalid check_in_interval_seconds".into()))?;
        let missed_check_ins = u32::try_from(self.missed_check_ins)
            .map_err(|_| AppError::Unavailable("invalid missed_check_ins".into()))?;
        let progress_percent = self
            .progress_percent
            .map(|p| {
                u8::try_from(p).map_err(|_| AppError::Unavailable("invalid progress_percent".into()))
            })
            .transpose()?;
        let blockers: Vec<String> = serde_json::from_str(&self.blockers)
            .map_err(|e| AppError::Unavailable(format!("invalid blockers: {e}")))?;

        Ok(AgentSession {
            session_id: self.session_id,
            agent_id: self.agent_id,
            check_in_interval_seconds,
            created_at,
            last_check_in_at,
            missed_check_ins,
            current_activity: self.current_activity,
            progress_percent,
            blockers,
        })
    }
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Unavailable(format!("invalid {column}: {e}")))
}

fn encode_blockers(blockers: &[String]) -> Result<String> {
    serde_json::to_string(blockers)
        .map_err(|e| AppError::Unavailable(format!("failed to encode blockers: {e}")))
}

impl SessionRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new session record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the insert fails, including when
    /// the session identifier already exists.
    pub async fn create(&self, session: &AgentSession) -> Result<()> {
        let blockers = encode_blockers(&session.blockers)?;

        sqlx::query(
            "INSERT INTO agent_session (session_id, agent_id, check_in_interval_seconds,
             created_at, last_check_in_at, missed_check_ins, current_activity,
             progress_percent, blockers)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&session.session_id)
        .bind(&session.agent_id)
        .bind(i64::from(session.check_in_interval_seconds))
        .bind(session.created_at.to_rfc3339())
        .bind(session.last_check_in_at.to_rfc3339())
        .bind(i64::from(session.missed_check_ins))
        .bind(&session.current_activity)
        .bind(session.progress_percent.map(i64::from))
        .bind(&blockers)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Retrieve a session by identifier.
    ///
    /// Returns `Ok(None)` if the session does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the query fails.
    pub async fn get(&self, session_id: &str) -> Result<Option<AgentSession>> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM agent_session WHERE session_id = ?1")
                .bind(session_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(SessionRow::into_session).transpose()
    }

    /// Record a check-in: reset the liveness clock and overwrite the
    /// status fields with the reported values.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the update fails.
    pub async fn record_check_in(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        current_activity: Option<&str>,
        progress_percent: Option<u8>,
        blockers: &[String],
    ) -> Result<()> {
        let encoded = encode_blockers(blockers)?;

        sqlx::query(
            "UPDATE agent_session
             SET last_check_in_at = ?1, missed_check_ins = 0, current_activity = ?2,
                 progress_percent = ?3, blockers = ?4
             WHERE session_id = ?5",
        )
        .bind(now.to_rfc3339())
        .bind(current_activity)
        .bind(progress_percent.map(i64::from))
        .bind(&encoded)
        .bind(session_id)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Overwrite the stored missed-check-in counter if it differs.
    ///
    /// Returns whether a row was actually updated.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the update fails.
    pub async fn update_missed_check_ins(&self, session_id: &str, missed: u32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE agent_session SET missed_check_ins = ?1
             WHERE session_id = ?2 AND missed_check_ins != ?1",
        )
        .bind(i64::from(missed))
        .bind(session_id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List all sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the query fails.
    pub async fn list(&self) -> Result<Vec<AgentSession>> {
        let rows: Vec<SessionRow> =
            sqlx::query_as("SELECT * FROM agent_session ORDER BY created_at ASC, session_id ASC")
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(SessionRow::into_session).collect()
    }
}
