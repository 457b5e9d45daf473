//! Session repository

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::error::StoreResult;

/// One bounded interval of tracked activity for a project. A session is
/// "active" while `end_time` is unset; at most one session per project path
/// is active at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project_path: String,
    pub project_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_prompt: Option<String>,
    pub last_prompt_time: Option<DateTime<Utc>>,
    pub total_file_changes: i64,
}

/// Per-project aggregate across all sessions and checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStats {
    pub project_name: String,
    pub project_path: String,
    pub session_count: i64,
    pub checkpoint_count: i64,
    pub total_file_changes: i64,
    pub first_session_time: DateTime<Utc>,
    pub last_session_time: DateTime<Utc>,
}

pub struct SessionRepository {
    db: Database,
}

impl SessionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new active session for a project.
    pub async fn create(
        &self,
        project_path: &str,
        project_name: &str,
        prompt: Option<&str>,
    ) -> StoreResult<Session> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let session = Session {
            id: id.clone(),
            project_path: project_path.to_string(),
            project_name: project_name.to_string(),
            start_time: now,
            end_time: None,
            last_prompt: prompt.map(str::to_string),
            last_prompt_time: prompt.map(|_| now),
            total_file_changes: 0,
        };

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO sessions (id, project_path, project_name, start_time, end_time, last_prompt, last_prompt_time, total_file_changes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id,
                session.project_path,
                session.project_name,
                session.start_time.to_rfc3339(),
                Option::<String>::None,
                session.last_prompt,
                session.last_prompt_time.map(|t| t.to_rfc3339()),
                session.total_file_changes,
            ],
        )?;

        tracing::debug!("Created session {} for {}", id, project_path);
        Ok(session)
    }

    /// Get a session by ID
    pub async fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, project_path, project_name, start_time, end_time,
                    last_prompt, last_prompt_time, total_file_changes
             FROM sessions WHERE id = ?1",
        )?;

        let result = stmt.query_row(params![id], Self::map_row);

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the active (not yet ended) session for a project path, if any.
    pub async fn get_active(&self, project_path: &str) -> StoreResult<Option<Session>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, project_path, project_name, start_time, end_time,
                    last_prompt, last_prompt_time, total_file_changes
             FROM sessions WHERE project_path = ?1 AND end_time IS NULL
             ORDER BY start_time DESC LIMIT 1",
        )?;

        let result = stmt.query_row(params![project_path], Self::map_row);

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Refresh the last prompt on an active session.
    pub async fn refresh_prompt(
        &self,
        id: &str,
        prompt: &str,
        prompt_time: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.db.lock().await;
        conn.execute(
            "UPDATE sessions SET last_prompt = ?1, last_prompt_time = ?2 WHERE id = ?3",
            params![prompt, prompt_time.to_rfc3339(), id],
        )?;
        Ok(())
    }

    /// Close a session by setting its end time.
    pub async fn close(&self, id: &str, end_time: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.db.lock().await;
        conn.execute(
            "UPDATE sessions SET end_time = ?1 WHERE id = ?2",
            params![end_time.to_rfc3339(), id],
        )?;
        tracing::debug!("Closed session {}", id);
        Ok(())
    }

    /// Aggregate per-project statistics across all sessions and checkpoints.
    pub async fn project_stats(&self) -> StoreResult<Vec<ProjectStats>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT s.project_path,
                    s.project_name,
                    COUNT(s.id),
                    (SELECT COUNT(*) FROM checkpoints c WHERE c.project_path = s.project_path),
                    SUM(s.total_file_changes),
                    MIN(s.start_time),
                    MAX(s.start_time)
             FROM sessions s
             GROUP BY s.project_path
             ORDER BY MAX(s.start_time) DESC",
        )?;

        let stats = stmt
            .query_map([], |row| {
                Ok(ProjectStats {
                    project_path: row.get(0)?,
                    project_name: row.get(1)?,
                    session_count: row.get(2)?,
                    checkpoint_count: row.get(3)?,
                    total_file_changes: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    first_session_time: parse_time(&row.get::<_, String>(5)?),
                    last_session_time: parse_time(&row.get::<_, String>(6)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stats)
    }

    /// Delete all sessions for one project path.
    pub async fn delete_for_project(&self, project_path: &str) -> StoreResult<usize> {
        let conn = self.db.lock().await;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE project_path = ?1",
            params![project_path],
        )?;
        tracing::debug!("Deleted {} sessions for {}", deleted, project_path);
        Ok(deleted)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        Ok(Session {
            id: row.get(0)?,
            project_path: row.get(1)?,
            project_name: row.get(2)?,
            start_time: parse_time(&row.get::<_, String>(3)?),
            end_time: row.get::<_, Option<String>>(4)?.map(|t| parse_time(&t)),
            last_prompt: row.get(5)?,
            last_prompt_time: row.get::<_, Option<String>>(6)?.map(|t| parse_time(&t)),
            total_file_changes: row.get(7)?,
        })
    }
}

/// Parse a stored RFC3339 timestamp, falling back to "now" on malformed rows.
pub(crate) fn parse_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
