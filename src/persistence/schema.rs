//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// The `UNIQUE(task_id, agent_id)` constraint on `completion_permission`
/// is load-bearing: it is what guarantees at most one decision record per
/// pair even when several writers race.
///
/// # Errors
///
/// Returns `AppError::Unavailable` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS agent_session (
    session_id                TEXT PRIMARY KEY NOT NULL,
    agent_id                  TEXT NOT NULL,
    check_in_interval_seconds INTEGER NOT NULL,
    created_at                TEXT NOT NULL,
    last_check_in_at          TEXT NOT NULL,
    missed_check_ins          INTEGER NOT NULL DEFAULT 0,
    current_activity          TEXT,
    progress_percent          INTEGER,
    blockers                  TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS completion_permission (
    id                  TEXT PRIMARY KEY NOT NULL,
    task_id             TEXT NOT NULL,
    agent_id            TEXT NOT NULL,
    session_id          TEXT,
    status              TEXT NOT NULL CHECK(status IN ('pending','granted','denied')),
    requested_at        TEXT NOT NULL,
    decided_at          TEXT,
    granted_by          TEXT,
    reason              TEXT,
    retry_after_seconds INTEGER,
    UNIQUE(task_id, agent_id)
);

CREATE INDEX IF NOT EXISTS idx_session_agent ON agent_session(agent_id);
CREATE INDEX IF NOT EXISTS idx_permission_status ON completion_permission(status);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
