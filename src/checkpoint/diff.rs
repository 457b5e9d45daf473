//! Diff engine
//!
//! Classifies every path across two checkpoints as added, deleted, or
//! modified, and renders modified files as a positional unified-style diff.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::db::repositories::checkpoint::FileSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One changed file between two checkpoints. Unchanged files carry no record
/// at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    /// Absolute file path (the snapshot key).
    pub path: String,
    pub relative_path: String,
    pub kind: ChangeKind,
    pub size_before: Option<i64>,
    pub size_after: Option<i64>,
    /// Unified-style diff text, only for `Modified` changes.
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub changes: Vec<Change>,
    pub summary: DiffSummary,
}

/// Compare the file sets of a current checkpoint against a previous one.
/// Paths are keyed by absolute file path; output is ordered by path.
pub fn diff_snapshots(current: &[FileSnapshot], previous: &[FileSnapshot]) -> DiffResult {
    let cur: HashMap<&str, &FileSnapshot> = current
        .iter()
        .map(|s| (s.file_path.as_str(), s))
        .collect();
    let prev: HashMap<&str, &FileSnapshot> = previous
        .iter()
        .map(|s| (s.file_path.as_str(), s))
        .collect();

    let paths: BTreeSet<&str> = cur.keys().chain(prev.keys()).copied().collect();

    let mut changes = Vec::new();
    let mut summary = DiffSummary::default();

    for path in paths {
        match (cur.get(path), prev.get(path)) {
            (Some(c), None) => {
                summary.added += 1;
                changes.push(Change {
                    path: path.to_string(),
                    relative_path: c.relative_path.clone(),
                    kind: ChangeKind::Added,
                    size_before: None,
                    size_after: Some(c.size),
                    diff: None,
                });
            }
            (None, Some(p)) => {
                summary.deleted += 1;
                changes.push(Change {
                    path: path.to_string(),
                    relative_path: p.relative_path.clone(),
                    kind: ChangeKind::Deleted,
                    size_before: Some(p.size),
                    size_after: None,
                    diff: None,
                });
            }
            (Some(c), Some(p)) => {
                if c.content == p.content {
                    continue;
                }
                summary.modified += 1;
                changes.push(Change {
                    path: path.to_string(),
                    relative_path: c.relative_path.clone(),
                    kind: ChangeKind::Modified,
                    size_before: Some(p.size),
                    size_after: Some(c.size),
                    diff: Some(positional_diff(&p.content, &c.content)),
                });
            }
            (None, None) => unreachable!("path came from one of the two maps"),
        }
    }

    DiffResult { changes, summary }
}

/// Positional line diff: line i of the old text against line i of the new
/// text, under a single synthetic hunk header. There is no LCS realignment,
/// so one inserted line near the top marks every following line as changed.
/// That behavior is kept deliberately for output compatibility.
pub fn positional_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let mut out = format!("@@ -1,{} +1,{} @@\n", old_lines.len(), new_lines.len());

    for i in 0..old_lines.len().max(new_lines.len()) {
        match (old_lines.get(i), new_lines.get(i)) {
            (Some(o), Some(n)) if o == n => {
                out.push(' ');
                out.push_str(o);
                out.push('\n');
            }
            (Some(o), Some(n)) => {
                out.push('-');
                out.push_str(o);
                out.push('\n');
                out.push('+');
                out.push_str(n);
                out.push('\n');
            }
            (Some(o), None) => {
                out.push('-');
                out.push_str(o);
                out.push('\n');
            }
            (None, Some(n)) => {
                out.push('+');
                out.push_str(n);
                out.push('\n');
            }
            (None, None) => unreachable!("index below max of both lengths"),
        }
    }

    out
}
