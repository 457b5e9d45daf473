//! Typed store errors

use thiserror::Error;

/// Errors surfaced by checkpoint store operations.
///
/// Per-file problems (scan skips, restore failures) are not errors at this
/// level; they are aggregated into the operation's result so callers can
/// assert on them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested checkpoint id does not resolve to a stored checkpoint.
    #[error("checkpoint not found: {0}")]
    NotFound(String),

    /// The underlying SQLite store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
