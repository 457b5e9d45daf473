//! Content scanner
//!
//! Walks a project directory, applies ignore rules, and reads every eligible
//! file into memory. Per-file problems never abort a scan; they are recorded
//! in the outcome's typed skip list.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files above this size are skipped, not truncated.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Safety valve against ignore-pattern gaps: a scan keeps at most this many
/// files, in traversal order.
pub const MAX_FILES: usize = 10_000;

/// Files are read in bounded sequential batches.
const READ_BATCH_SIZE: usize = 128;

/// Built-in deny-list: version-control directories, dependency directories,
/// and build/cache output are pruned without consulting any gitignore.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".cache",
    ".idea",
    "coverage",
    ".pytest_cache",
    ".mypy_cache",
    "vendor",
];

/// One eligible file captured during a scan.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the scanned project root.
    pub relative_path: String,
    pub content: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// SHA-256 of the content, hex-encoded. Stored with the snapshot; not
    /// used for deduplication.
    pub hash: String,
    pub extension: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Larger than [`MAX_FILE_SIZE`].
    TooLarge { size: u64 },
    /// Content is not valid UTF-8 text.
    Binary,
    /// The file could not be read at all.
    Unreadable { message: String },
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of one scan. `skipped` lists every per-file exclusion that was not
/// an ignore-rule match, so callers and tests can assert on them.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<FileRecord>,
    pub skipped: Vec<SkippedFile>,
    /// True when the [`MAX_FILES`] cap cut the scan short.
    pub truncated: bool,
}

impl ScanOutcome {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Scan a project directory. Only an unreadable root is a hard error; every
/// per-file problem is skipped and recorded.
pub fn scan(project_root: &Path) -> Result<ScanOutcome> {
    let root = project_root
        .canonicalize()
        .with_context(|| format!("Failed to resolve project root {:?}", project_root))?;

    let matchers = collect_gitignores(&root);
    let candidates = collect_candidates(&root, &matchers);

    let mut outcome = ScanOutcome::default();
    let mut remaining = candidates.len();

    // Bounded sequential batches; batch boundaries never overlap.
    for batch in candidates.chunks(READ_BATCH_SIZE) {
        for path in batch {
            if outcome.files.len() >= MAX_FILES {
                warn!(
                    "Scan of {:?} hit the {}-file cap; {} matching files dropped",
                    root, MAX_FILES, remaining
                );
                outcome.truncated = true;
                return Ok(outcome);
            }
            remaining -= 1;
            match read_file(&root, path) {
                Ok(record) => outcome.files.push(record),
                Err(skip) => {
                    match &skip.reason {
                        SkipReason::TooLarge { size } => {
                            warn!("Skipping {:?}: {} bytes exceeds size cap", skip.path, size)
                        }
                        SkipReason::Unreadable { message } => {
                            warn!("Skipping {:?}: {}", skip.path, message)
                        }
                        // Binary files are expected; keep them out of the logs.
                        SkipReason::Binary => debug!("Skipping binary file {:?}", skip.path),
                    }
                    outcome.skipped.push(skip);
                }
            }
        }
    }

    debug!(
        "Scanned {:?}: {} files included, {} skipped",
        root,
        outcome.files.len(),
        outcome.skipped.len()
    );
    Ok(outcome)
}

/// Built-in deny-list check, applied while walking. Directories are pruned by
/// name; log files are dropped wherever they appear. The root itself is never
/// pruned, whatever the project directory is called.
fn denied(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        IGNORED_DIRS.iter().any(|d| *d == name)
    } else {
        name.ends_with(".log")
    }
}

/// First pass: find every `.gitignore` under the root and build a matcher
/// rooted at the directory it lives in. Negation patterns (`!pattern`) are
/// unsupported and dropped.
fn collect_gitignores(root: &Path) -> Vec<Gitignore> {
    let mut matchers = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !denied(e));
    for entry in walker.filter_map(|r| r.ok()) {
        if entry.file_type().is_file() && entry.file_name() == ".gitignore" {
            if let Some(dir) = entry.path().parent() {
                if let Some(matcher) = build_gitignore(dir, entry.path()) {
                    matchers.push(matcher);
                }
            }
        }
    }
    matchers
}

fn build_gitignore(dir: &Path, file: &Path) -> Option<Gitignore> {
    let raw = match fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read {:?}: {}", file, e);
            return None;
        }
    };

    let mut builder = GitignoreBuilder::new(dir);
    for line in raw.lines() {
        if line.trim_start().starts_with('!') {
            // Negation patterns are a documented limitation.
            debug!("Dropping unsupported negation pattern {:?} in {:?}", line, file);
            continue;
        }
        if let Err(e) = builder.add_line(None, line) {
            debug!("Ignoring malformed pattern {:?} in {:?}: {}", line, file, e);
        }
    }

    match builder.build() {
        Ok(matcher) => Some(matcher),
        Err(e) => {
            warn!("Failed to build gitignore for {:?}: {}", dir, e);
            None
        }
    }
}

/// Second pass: walk regular files (symlinks not followed) that survive both
/// the deny-list and every discovered gitignore, in traversal order.
fn collect_candidates(root: &Path, matchers: &[Gitignore]) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !denied(e));

    let mut candidates = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        // A matcher only ever claims paths under its own root directory.
        let ignored = matchers.iter().any(|m| {
            path.starts_with(m.path()) && m.matched_path_or_any_parents(path, false).is_ignore()
        });
        if !ignored {
            candidates.push(path.to_path_buf());
        }
    }
    candidates
}

/// Read one candidate into a [`FileRecord`], or say why it was skipped.
fn read_file(root: &Path, path: &Path) -> std::result::Result<FileRecord, SkippedFile> {
    let skip = |reason| SkippedFile {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = fs::symlink_metadata(path).map_err(|e| {
        skip(SkipReason::Unreadable {
            message: e.to_string(),
        })
    })?;

    let size = metadata.len();
    if size > MAX_FILE_SIZE {
        return Err(skip(SkipReason::TooLarge { size }));
    }

    let bytes = fs::read(path).map_err(|e| {
        skip(SkipReason::Unreadable {
            message: e.to_string(),
        })
    })?;

    let content = String::from_utf8(bytes).map_err(|_| skip(SkipReason::Binary))?;

    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let relative_path = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string();

    Ok(FileRecord {
        path: path.to_path_buf(),
        relative_path,
        content,
        size,
        modified,
        hash,
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().to_string()),
    })
}
