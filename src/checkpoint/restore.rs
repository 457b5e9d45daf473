//! Restore engine
//!
//! Writes a checkpoint's captured content back to the absolute paths it was
//! scanned from. Destructive overwrite, no backup of the pre-restore state;
//! running it twice ends in the same state as running it once.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::repositories::checkpoint::FileSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreResult {
    pub files_restored: usize,
    pub total_files: usize,
    pub errors: Vec<RestoreFailure>,
}

/// Best-effort restore: a failing file lands in `errors` and the rest keep
/// going. `files_restored` counts successful writes only.
pub fn restore_snapshots(snapshots: &[FileSnapshot]) -> RestoreResult {
    let mut result = RestoreResult::default();

    for snapshot in snapshots.iter().filter(|s| !s.is_directory) {
        result.total_files += 1;
        match write_snapshot(snapshot) {
            Ok(()) => result.files_restored += 1,
            Err(e) => {
                warn!("Failed to restore {}: {:#}", snapshot.file_path, e);
                result.errors.push(RestoreFailure {
                    path: snapshot.file_path.clone(),
                    message: format!("{:#}", e),
                });
            }
        }
    }

    result
}

fn write_snapshot(snapshot: &FileSnapshot) -> Result<()> {
    let path = Path::new(&snapshot.file_path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    fs::write(path, &snapshot.content)
        .with_context(|| format!("Failed to write {:?}", path))?;

    Ok(())
}
