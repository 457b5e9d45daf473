//! Checkpoint manager
//!
//! Composes the session tracker, content scanner, and repositories into the
//! operations the outer layers (CLI, transport) call.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::checkpoint::{Checkpoint, FileSnapshot};
use crate::db::repositories::session::{ProjectStats, Session};
use crate::db::{CheckpointRepository, Database, SessionRepository};
use crate::error::{StoreError, StoreResult};
use crate::scanner::{self, ScanOutcome, SkipReason};
use crate::session::SessionTracker;

use super::diff::{diff_snapshots, DiffResult};
use super::restore::{restore_snapshots, RestoreResult};

pub struct CheckpointManager {
    tracker: SessionTracker,
    sessions: SessionRepository,
    checkpoints: CheckpointRepository,
}

impl CheckpointManager {
    pub fn new(db: Database) -> Self {
        Self {
            tracker: SessionTracker::new(db.clone()),
            sessions: SessionRepository::new(db.clone()),
            checkpoints: CheckpointRepository::new(db),
        }
    }

    /// "Work started" event: open a session for the project or refresh the
    /// active one's prompt.
    pub async fn open_or_refresh_session(
        &self,
        project_path: &str,
        project_name: &str,
        prompt: Option<&str>,
    ) -> StoreResult<Session> {
        self.tracker
            .open_or_refresh(project_path, project_name, prompt)
            .await
    }

    /// "Work stopped" event: close the project's active session and take a
    /// checkpoint of its tracked files.
    ///
    /// Returns `Ok(None)` when there is no active session, when the scan
    /// finds nothing to checkpoint, or when creation fails; a stop event
    /// must never take the caller down.
    pub async fn close_session_and_checkpoint(
        &self,
        project_path: &str,
    ) -> Result<Option<Checkpoint>> {
        let Some(session) = self.tracker.close(project_path).await? else {
            return Ok(None);
        };

        match self.create_checkpoint(&session).await {
            Ok(checkpoint) => Ok(checkpoint),
            Err(e) => {
                warn!(
                    "Checkpoint creation failed for {}: {:#}; no checkpoint created",
                    project_path, e
                );
                Ok(None)
            }
        }
    }

    async fn create_checkpoint(&self, session: &Session) -> Result<Option<Checkpoint>> {
        let outcome = scanner::scan(Path::new(&session.project_path))?;
        log_skips(&outcome);

        if outcome.files.is_empty() {
            info!(
                "Nothing to checkpoint for {}: scan found no eligible files",
                session.project_path
            );
            return Ok(None);
        }

        let file_count = outcome.files.len() as i64;
        let total_size = outcome.total_size() as i64;

        let prompt = session
            .last_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let suffix = format!("({} files, {})", file_count, human_size(total_size));
        let message = match prompt {
            Some(prompt) => format!("{} {}", prompt, suffix),
            None => format!("Checkpoint {}", suffix),
        };

        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            project_path: session.project_path.clone(),
            project_name: session.project_name.clone(),
            message,
            timestamp: Utc::now(),
            file_count,
            total_size,
            user_prompt: prompt.map(str::to_string),
        };

        let snapshots: Vec<FileSnapshot> = outcome
            .files
            .into_iter()
            .map(|record| FileSnapshot {
                checkpoint_id: checkpoint.id.clone(),
                file_path: record.path.to_string_lossy().to_string(),
                relative_path: record.relative_path,
                content: record.content,
                size: record.size as i64,
                modified_time: record.modified,
                content_hash: record.hash,
                extension: record.extension,
                is_directory: false,
            })
            .collect();

        self.checkpoints
            .create_with_snapshots(&checkpoint, &snapshots)
            .await?;

        info!(
            "Created checkpoint {} for {}: {}",
            checkpoint.id, checkpoint.project_path, checkpoint.message
        );
        Ok(Some(checkpoint))
    }

    /// Per-project statistics across all projects in the store.
    pub async fn list_project_stats(&self) -> StoreResult<Vec<ProjectStats>> {
        self.sessions.project_stats().await
    }

    /// A project's checkpoints, newest first.
    pub async fn list_checkpoints(&self, project_path: &str) -> StoreResult<Vec<Checkpoint>> {
        self.checkpoints.list_for_project(project_path).await
    }

    /// One checkpoint together with its captured files.
    pub async fn get_checkpoint(
        &self,
        id: &str,
    ) -> StoreResult<Option<(Checkpoint, Vec<FileSnapshot>)>> {
        let Some(checkpoint) = self.checkpoints.get(id).await? else {
            return Ok(None);
        };
        let snapshots = self.checkpoints.snapshots_for(id).await?;
        Ok(Some((checkpoint, snapshots)))
    }

    /// The checkpoint with the next-older timestamp in the same project.
    /// `NotFound` when `id` itself is missing; `Ok(None)` when `id` is the
    /// project's oldest checkpoint.
    pub async fn previous_checkpoint_of(&self, id: &str) -> StoreResult<Option<Checkpoint>> {
        let checkpoint = self
            .checkpoints
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.checkpoints.previous_of(&checkpoint).await
    }

    /// Line-level difference between two checkpoints. `NotFound` when either
    /// id does not resolve.
    pub async fn diff_checkpoints(
        &self,
        current_id: &str,
        previous_id: &str,
    ) -> StoreResult<DiffResult> {
        self.require(current_id).await?;
        self.require(previous_id).await?;

        let current = self.checkpoints.snapshots_for(current_id).await?;
        let previous = self.checkpoints.snapshots_for(previous_id).await?;

        let result = diff_snapshots(&current, &previous);
        debug!(
            "Diffed {} against {}: +{} ~{} -{}",
            current_id,
            previous_id,
            result.summary.added,
            result.summary.modified,
            result.summary.deleted
        );
        Ok(result)
    }

    /// Write a checkpoint's files back to disk, best-effort. `NotFound` when
    /// the id does not resolve.
    pub async fn restore_checkpoint(&self, id: &str) -> StoreResult<RestoreResult> {
        self.require(id).await?;

        let snapshots = self.checkpoints.snapshots_for(id).await?;
        let result = restore_snapshots(&snapshots);
        info!(
            "Restored checkpoint {}: {}/{} files, {} errors",
            id,
            result.files_restored,
            result.total_files,
            result.errors.len()
        );
        Ok(result)
    }

    /// Delete one checkpoint and its snapshots.
    pub async fn delete_checkpoint(&self, id: &str) -> StoreResult<()> {
        let deleted = self.checkpoints.delete(id).await?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Delete every checkpoint and session belonging to one project.
    pub async fn delete_project_checkpoints(&self, project_path: &str) -> StoreResult<()> {
        self.checkpoints.delete_for_project(project_path).await?;
        self.sessions.delete_for_project(project_path).await?;
        self.tracker.evict(project_path).await;
        info!("Deleted all checkpoints and sessions for {}", project_path);
        Ok(())
    }

    /// Wipe the entire store. Irreversible.
    pub async fn clear_all(&self) -> StoreResult<()> {
        self.checkpoints.clear_all().await?;
        self.tracker.evict_all().await;
        info!("Cleared all sessions, checkpoints, and snapshots");
        Ok(())
    }

    async fn require(&self, id: &str) -> StoreResult<()> {
        match self.checkpoints.get(id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}

fn log_skips(outcome: &ScanOutcome) {
    if outcome.skipped.is_empty() {
        return;
    }
    let too_large = outcome
        .skipped
        .iter()
        .filter(|s| matches!(s.reason, SkipReason::TooLarge { .. }))
        .count();
    let binary = outcome
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::Binary)
        .count();
    let unreadable = outcome.skipped.len() - too_large - binary;
    debug!(
        "Scan skipped {} files ({} too large, {} binary, {} unreadable)",
        outcome.skipped.len(),
        too_large,
        binary,
        unreadable
    );
}

/// Human-readable size: binary units, one decimal place.
pub fn human_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes.max(0) as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
