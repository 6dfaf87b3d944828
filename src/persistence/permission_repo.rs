//! Completion permission repository for `SQLite` persistence.
//!
//! Writes are single upsert statements guarded so a terminal row is never
//! rewritten. Together with the `UNIQUE(task_id, agent_id)` constraint
//! this keeps one authoritative record per pair across racing writers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::permission::{CompletionPermission, PermissionStatus};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for completion permission records.
#[derive(Clone)]
pub struct PermissionRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct PermissionRow {
    id: String,
    task_id: String,
    agent_id: String,
    session_id: Option<String>,
    status: String,
    requested_at: String,
    decided_at: Option<String>,
    granted_by: Option<String>,
    reason: Option<String>,
    retry_after_seconds: Option<i64>,
}

impl PermissionRow {
    /// Convert a database row into the domain model.
    fn into_permission(self) -> Result<CompletionPermission> {
        let status = parse_permission_status(&self.status)?;
        let requested_at = parse_timestamp(&self.requested_at, "requested_at")?;
        let decided_at = self
            .decided_at
            .as_deref()
            .map(|s| parse_timestamp(s, "decided_at"))
            .transpose()?;
        let retry_after_seconds = self
            .retry_after_seconds
            .map(|v| {
                u32::try_from(v)
                    .map_err(|_| AppError::Unavailable("invalid retry_after_seconds".into()))
            })
            .transpose()?;

        Ok(CompletionPermission {
            id: self.id,
            task_id: self.task_id,
            agent_id: self.agent_id,
            session_id: self.session_id,
            status,
            requested_at,
            decided_at,
            granted_by: self.granted_by,
            reason: self.reason,
            retry_after_seconds,
        })
    }
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Unavailable(format!("invalid {column}: {e}")))
}

fn parse_permission_status(s: &str) -> Result<PermissionStatus> {
    match s {
        "pending" => Ok(PermissionStatus::Pending),
        "granted" => Ok(PermissionStatus::Granted),
        "denied" => Ok(PermissionStatus::Denied),
        other => Err(AppError::Unavailable(format!(
            "invalid permission status: {other}"
        ))),
    }
}

fn permission_status_str(s: PermissionStatus) -> &'static str {
    match s {
        PermissionStatus::Pending => "pending",
        PermissionStatus::Granted => "granted",
        PermissionStatus::Denied => "denied",
    }
}

impl PermissionRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Retrieve the permission record for a `(task_id, agent_id)` pair.
    ///
    /// Returns `Ok(None)` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the query fails.
    pub async fn get(&self, task_id: &str, agent_id: &str) -> Result<Option<CompletionPermission>> {
        let row: Option<PermissionRow> = sqlx::query_as(
            "SELECT * FROM completion_permission WHERE task_id = ?1 AND agent_id = ?2",
        )
        .bind(task_id)
        .bind(agent_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(PermissionRow::into_permission).transpose()
    }

    /// Insert or refresh a pending record for a pair.
    ///
    /// On conflict with an existing pending row, `requested_at` is
    /// preserved and only the advisory fields are refreshed; a new
    /// `session_id` replaces the old one but an absent one does not erase
    /// it. A terminal row is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the statement fails.
    pub async fn upsert_pending(&self, record: &CompletionPermission) -> Result<()> {
        sqlx::query(
            "INSERT INTO completion_permission (id, task_id, agent_id, session_id, status,
             requested_at, decided_at, granted_by, reason, retry_after_seconds)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, NULL, NULL, ?6, ?7)
             ON CONFLICT(task_id, agent_id) DO UPDATE SET
                 session_id = COALESCE(excluded.session_id, completion_permission.session_id),
                 reason = excluded.reason,
                 retry_after_seconds = excluded.retry_after_seconds
             WHERE completion_permission.status = 'pending'",
        )
        .bind(&record.id)
        .bind(&record.task_id)
        .bind(&record.agent_id)
        .bind(&record.session_id)
        .bind(record.requested_at.to_rfc3339())
        .bind(&record.reason)
        .bind(record.retry_after_seconds.map(i64::from))
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Record a terminal decision for a pair.
    ///
    /// Inserts the record, or promotes an existing pending row in place
    /// while preserving its original `requested_at`. A row that is
    /// already terminal is left untouched; callers must re-fetch after
    /// this call to observe the authoritative outcome.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the statement fails.
    pub async fn decide(&self, record: &CompletionPermission) -> Result<()> {
        let status = permission_status_str(record.status);
        let decided_at = record.decided_at.map(|dt| dt.to_rfc3339());

        sqlx::query(
            "INSERT INTO completion_permission (id, task_id, agent_id, session_id, status,
             requested_at, decided_at, granted_by, reason, retry_after_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)
             ON CONFLICT(task_id, agent_id) DO UPDATE SET
                 status = excluded.status,
                 session_id = COALESCE(excluded.session_id, completion_permission.session_id),
                 decided_at = excluded.decided_at,
                 granted_by = excluded.granted_by,
                 reason = excluded.reason,
                 retry_after_seconds = NULL
             WHERE completion_permission.status = 'pending'",
        )
        .bind(&record.id)
        .bind(&record.task_id)
        .bind(&record.agent_id)
        .bind(&record.session_id)
        .bind(status)
        .bind(record.requested_at.to_rfc3339())
        .bind(&decided_at)
        .bind(&record.granted_by)
        .bind(&record.reason)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// List all pending permission records, oldest request first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<CompletionPermission>> {
        let rows: Vec<PermissionRow> = sqlx::query_as(
            "SELECT * FROM completion_permission WHERE status = 'pending'
             ORDER BY requested_at ASC, task_id ASC",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }
}
