//! Backtrack - session-scoped project checkpoints: snapshot, diff, and
//! restore a project's tracked files around development sessions.

pub mod checkpoint;
pub mod cli;
pub mod db;
pub mod error;
pub mod scanner;
pub mod session;
