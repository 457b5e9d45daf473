//! Checkpoint and file snapshot repository

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::StoreResult;

use super::session::parse_time;

/// An immutable full snapshot of a project's tracked files, owned by the
/// session that was closing when it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub session_id: String,
    pub project_path: String,
    pub project_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub file_count: i64,
    pub total_size: i64,
    pub user_prompt: Option<String>,
}

/// One file's captured content and metadata at the moment of a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub checkpoint_id: String,
    pub file_path: String,
    pub relative_path: String,
    pub content: String,
    pub size: i64,
    pub modified_time: DateTime<Utc>,
    pub content_hash: String,
    pub extension: Option<String>,
    pub is_directory: bool,
}

pub struct CheckpointRepository {
    db: Database,
}

impl CheckpointRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a checkpoint together with all of its file snapshots and bump
    /// the owning session's cumulative file-change counter.
    ///
    /// All three writes happen in one transaction: a checkpoint is never
    /// visible with a partial or missing file set.
    pub async fn create_with_snapshots(
        &self,
        checkpoint: &Checkpoint,
        snapshots: &[FileSnapshot],
    ) -> StoreResult<()> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO checkpoints (id, session_id, project_path, project_name, message, timestamp, file_count, total_size, user_prompt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                checkpoint.id,
                checkpoint.session_id,
                checkpoint.project_path,
                checkpoint.project_name,
                checkpoint.message,
                checkpoint.timestamp.to_rfc3339(),
                checkpoint.file_count,
                checkpoint.total_size,
                checkpoint.user_prompt,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO file_snapshots (checkpoint_id, file_path, relative_path, content, size, modified_time, content_hash, extension, is_directory)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for snap in snapshots {
                stmt.execute(params![
                    snap.checkpoint_id,
                    snap.file_path,
                    snap.relative_path,
                    snap.content,
                    snap.size,
                    snap.modified_time.to_rfc3339(),
                    snap.content_hash,
                    snap.extension,
                    snap.is_directory as i64,
                ])?;
            }
        }

        tx.execute(
            "UPDATE sessions SET total_file_changes = total_file_changes + ?1 WHERE id = ?2",
            params![checkpoint.file_count, checkpoint.session_id],
        )?;

        tx.commit()?;

        tracing::debug!(
            "Persisted checkpoint {} ({} files)",
            checkpoint.id,
            checkpoint.file_count
        );
        Ok(())
    }

    /// Get a checkpoint by ID
    pub async fn get(&self, id: &str) -> StoreResult<Option<Checkpoint>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, project_path, project_name, message,
                    timestamp, file_count, total_size, user_prompt
             FROM checkpoints WHERE id = ?1",
        )?;

        let result = stmt.query_row(params![id], Self::map_row);

        match result {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List checkpoints for a project, newest first.
    pub async fn list_for_project(&self, project_path: &str) -> StoreResult<Vec<Checkpoint>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, project_path, project_name, message,
                    timestamp, file_count, total_size, user_prompt
             FROM checkpoints WHERE project_path = ?1
             ORDER BY timestamp DESC",
        )?;

        let checkpoints = stmt
            .query_map(params![project_path], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(checkpoints)
    }

    /// The checkpoint with the next-older timestamp in the same project, if
    /// any. The oldest checkpoint of a project has no previous one.
    pub async fn previous_of(&self, checkpoint: &Checkpoint) -> StoreResult<Option<Checkpoint>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, project_path, project_name, message,
                    timestamp, file_count, total_size, user_prompt
             FROM checkpoints
             WHERE project_path = ?1 AND timestamp < ?2
             ORDER BY timestamp DESC LIMIT 1",
        )?;

        let result = stmt.query_row(
            params![checkpoint.project_path, checkpoint.timestamp.to_rfc3339()],
            Self::map_row,
        );

        match result {
            Ok(previous) => Ok(Some(previous)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load all file snapshots belonging to a checkpoint.
    pub async fn snapshots_for(&self, checkpoint_id: &str) -> StoreResult<Vec<FileSnapshot>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT checkpoint_id, file_path, relative_path, content, size,
                    modified_time, content_hash, extension, is_directory
             FROM file_snapshots WHERE checkpoint_id = ?1
             ORDER BY relative_path",
        )?;

        let snapshots = stmt
            .query_map(params![checkpoint_id], |row| {
                Ok(FileSnapshot {
                    checkpoint_id: row.get(0)?,
                    file_path: row.get(1)?,
                    relative_path: row.get(2)?,
                    content: row.get(3)?,
                    size: row.get(4)?,
                    modified_time: parse_time(&row.get::<_, String>(5)?),
                    content_hash: row.get(6)?,
                    extension: row.get(7)?,
                    is_directory: row.get::<_, i64>(8)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    /// Delete one checkpoint; its snapshots go with it (FK cascade).
    pub async fn delete(&self, id: &str) -> StoreResult<usize> {
        let conn = self.db.lock().await;
        let deleted = conn.execute("DELETE FROM checkpoints WHERE id = ?1", params![id])?;
        tracing::debug!("Deleted checkpoint {}", id);
        Ok(deleted)
    }

    /// Delete all checkpoints (and their snapshots) for one project path.
    pub async fn delete_for_project(&self, project_path: &str) -> StoreResult<usize> {
        let conn = self.db.lock().await;
        let deleted = conn.execute(
            "DELETE FROM checkpoints WHERE project_path = ?1",
            params![project_path],
        )?;
        tracing::debug!("Deleted {} checkpoints for {}", deleted, project_path);
        Ok(deleted)
    }

    /// Wipe every session, checkpoint, and snapshot. Irreversible.
    pub async fn clear_all(&self) -> StoreResult<()> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM file_snapshots", [])?;
        tx.execute("DELETE FROM checkpoints", [])?;
        tx.execute("DELETE FROM sessions", [])?;
        tx.commit()?;
        tracing::debug!("Cleared all store data");
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Checkpoint> {
        Ok(Checkpoint {
            id: row.get(0)?,
            session_id: row.get(1)?,
            project_path: row.get(2)?,
            project_name: row.get(3)?,
            message: row.get(4)?,
            timestamp: parse_time(&row.get::<_, String>(5)?),
            file_count: row.get(6)?,
            total_size: row.get(7)?,
            user_prompt: row.get(8)?,
        })
    }
}
