//! Database connection management
//!
//! NOTE: This implementation uses synchronous rusqlite with tokio::Mutex,
//! which serializes all access through a single connection. That is exactly
//! the consistency model this store needs (one writer at a time, checkpoints
//! never partially visible), but it also means a second process opening the
//! same database file is unsupported.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::schema::SCHEMA;

pub struct Database {
    /// Single connection behind a mutex. Holding the guard blocks other
    /// async tasks; operations against this store are short enough that a
    /// connection pool would buy nothing.
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        // Foreign keys drive the checkpoint -> snapshot delete cascade
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Initialize schema
        conn.execute_batch(SCHEMA)?;

        info!("Database initialized at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Get a locked connection.
    ///
    /// WARNING: This holds the mutex for the duration of the operation,
    /// blocking other async tasks from accessing the database.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Get the database path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            path: self.path.clone(),
        }
    }
}
