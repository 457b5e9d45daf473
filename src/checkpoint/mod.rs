//! Checkpoint store operations

pub mod diff;
pub mod manager;
pub mod restore;

pub use diff::{Change, ChangeKind, DiffResult, DiffSummary};
pub use manager::CheckpointManager;
pub use restore::{RestoreFailure, RestoreResult};
