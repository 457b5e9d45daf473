//! Session tracker
//!
//! Per-project state machine: NONE -> ACTIVE -> CLOSED. The in-memory map of
//! active sessions is a cache over the persisted "end_time IS NULL per
//! project path" query; on a cache miss the tracker reloads from storage
//! before deciding a project has no active session.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::db::repositories::session::Session;
use crate::db::{Database, SessionRepository};
use crate::error::StoreResult;

pub struct SessionTracker {
    repo: SessionRepository,
    active: Mutex<HashMap<String, Session>>,
}

impl SessionTracker {
    pub fn new(db: Database) -> Self {
        Self {
            repo: SessionRepository::new(db),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Handle a "work started" event. Creates a session when the project has
    /// no active one; otherwise refreshes the active session's last prompt
    /// in place. Never opens a second active session for the same path.
    pub async fn open_or_refresh(
        &self,
        project_path: &str,
        project_name: &str,
        prompt: Option<&str>,
    ) -> StoreResult<Session> {
        let mut cache = self.active.lock().await;

        let existing = match cache.get(project_path) {
            Some(session) => Some(session.clone()),
            None => self.repo.get_active(project_path).await?,
        };

        let session = match existing {
            Some(mut session) => {
                if let Some(prompt) = prompt {
                    let now = Utc::now();
                    self.repo.refresh_prompt(&session.id, prompt, now).await?;
                    session.last_prompt = Some(prompt.to_string());
                    session.last_prompt_time = Some(now);
                }
                debug!("Refreshed session {} for {}", session.id, project_path);
                session
            }
            None => {
                let session = self.repo.create(project_path, project_name, prompt).await?;
                debug!("Opened session {} for {}", session.id, project_path);
                session
            }
        };

        cache.insert(project_path.to_string(), session.clone());
        Ok(session)
    }

    /// Handle a "work stopped" event. Closes the project's active session and
    /// returns it; returns `None` (not an error) when there is nothing to
    /// close.
    pub async fn close(&self, project_path: &str) -> StoreResult<Option<Session>> {
        let mut cache = self.active.lock().await;

        let existing = match cache.remove(project_path) {
            Some(session) => Some(session),
            None => self.repo.get_active(project_path).await?,
        };

        let Some(mut session) = existing else {
            debug!("No active session for {}", project_path);
            return Ok(None);
        };

        let end_time = Utc::now();
        self.repo.close(&session.id, end_time).await?;
        session.end_time = Some(end_time);
        debug!("Closed session {} for {}", session.id, project_path);
        Ok(Some(session))
    }

    /// Drop any cached session for a project, forcing the next event to
    /// reload from storage. Used after bulk deletes invalidate rows behind
    /// the cache's back.
    pub async fn evict(&self, project_path: &str) {
        self.active.lock().await.remove(project_path);
    }

    /// Drop the whole cache. Used by the global clear operation.
    pub async fn evict_all(&self) {
        self.active.lock().await.clear();
    }
}
