// Content scanner tests

use std::fs;
use std::path::Path;

use backtrack::scanner::{self, SkipReason, MAX_FILES, MAX_FILE_SIZE};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

fn write_file(project: &Path, rel: &str, content: &[u8]) {
    let path = project.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn included_paths(outcome: &scanner::ScanOutcome) -> Vec<String> {
    let mut paths: Vec<String> = outcome
        .files
        .iter()
        .map(|f| f.relative_path.clone())
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_scan_collects_files_with_metadata() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), "src/main.rs", b"fn main() {}\n");
    write_file(project.path(), "README.md", b"# readme\n");

    let outcome = scanner::scan(project.path()).unwrap();

    assert_eq!(included_paths(&outcome), vec!["README.md", "src/main.rs"]);
    assert!(!outcome.truncated);

    let main = outcome
        .files
        .iter()
        .find(|f| f.relative_path == "src/main.rs")
        .unwrap();
    assert_eq!(main.content, "fn main() {}\n");
    assert_eq!(main.size, 13);
    assert_eq!(main.extension.as_deref(), Some("rs"));
    assert!(main.path.is_absolute());

    let expected_hash = format!("{:x}", Sha256::digest(b"fn main() {}\n"));
    assert_eq!(main.hash, expected_hash);
}

#[test]
fn test_builtin_denylist_prunes_directories_and_log_files() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), "keep.txt", b"keep\n");
    write_file(project.path(), ".git/HEAD", b"ref: refs/heads/main\n");
    write_file(project.path(), "node_modules/pkg/index.js", b"x\n");
    write_file(project.path(), "target/debug/out", b"x\n");
    write_file(project.path(), "debug.log", b"log line\n");
    write_file(project.path(), "sub/app.log", b"log line\n");

    let outcome = scanner::scan(project.path()).unwrap();

    assert_eq!(included_paths(&outcome), vec!["keep.txt"]);
}

#[test]
fn test_gitignore_applies_relative_to_its_directory() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), ".gitignore", b"ignored.txt\n");
    write_file(project.path(), "ignored.txt", b"top\n");
    write_file(project.path(), "kept.txt", b"top\n");
    // A nested gitignore only affects its own subtree
    write_file(project.path(), "sub/.gitignore", b"local.txt\n");
    write_file(project.path(), "sub/local.txt", b"sub\n");
    write_file(project.path(), "local.txt", b"root\n");

    let outcome = scanner::scan(project.path()).unwrap();

    let paths = included_paths(&outcome);
    assert!(paths.contains(&".gitignore".to_string()));
    assert!(paths.contains(&"kept.txt".to_string()));
    assert!(paths.contains(&"local.txt".to_string()));
    assert!(!paths.contains(&"ignored.txt".to_string()));
    assert!(!paths.contains(&"sub/local.txt".to_string()));
    // The root gitignore pattern also matches in subdirectories, git-style
    write_file(project.path(), "sub/ignored.txt", b"sub\n");
    let outcome = scanner::scan(project.path()).unwrap();
    assert!(!included_paths(&outcome).contains(&"sub/ignored.txt".to_string()));
}

#[test]
fn test_gitignore_negation_patterns_are_dropped() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), ".gitignore", b"*.txt\n!keep.txt\n");
    write_file(project.path(), "keep.txt", b"negated\n");
    write_file(project.path(), "other.txt", b"ignored\n");
    write_file(project.path(), "code.rs", b"fn x() {}\n");

    let outcome = scanner::scan(project.path()).unwrap();

    // The `!keep.txt` negation is unsupported; *.txt still excludes keep.txt
    let paths = included_paths(&outcome);
    assert!(!paths.contains(&"keep.txt".to_string()));
    assert!(!paths.contains(&"other.txt".to_string()));
    assert!(paths.contains(&"code.rs".to_string()));
}

#[test]
fn test_oversized_file_is_skipped_not_truncated() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), "small.txt", b"ok\n");
    let oversized = vec![b'a'; (MAX_FILE_SIZE + 1) as usize];
    write_file(project.path(), "huge.txt", &oversized);

    let outcome = scanner::scan(project.path()).unwrap();

    assert_eq!(included_paths(&outcome), vec!["small.txt"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert!(outcome.skipped[0].path.ends_with("huge.txt"));
    assert_eq!(
        outcome.skipped[0].reason,
        SkipReason::TooLarge {
            size: MAX_FILE_SIZE + 1
        }
    );
}

#[test]
fn test_scan_truncates_at_file_cap() {
    let project = TempDir::new().unwrap();
    // Spread the files over a few directories so no single readdir dominates
    for dir in 0..5 {
        for i in 0..(MAX_FILES / 5 + 1) {
            write_file(project.path(), &format!("d{}/f{}.txt", dir, i), b"x");
        }
    }

    let outcome = scanner::scan(project.path()).unwrap();

    assert_eq!(outcome.files.len(), MAX_FILES);
    assert!(outcome.truncated);
}

#[test]
fn test_binary_file_is_skipped() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), "text.txt", b"text\n");
    write_file(project.path(), "blob.bin", &[0u8, 159, 146, 150, 255]);

    let outcome = scanner::scan(project.path()).unwrap();

    assert_eq!(included_paths(&outcome), vec!["text.txt"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].reason, SkipReason::Binary);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), "real.txt", b"real\n");
    std::os::unix::fs::symlink(
        project.path().join("real.txt"),
        project.path().join("link.txt"),
    )
    .unwrap();

    let outcome = scanner::scan(project.path()).unwrap();

    assert_eq!(included_paths(&outcome), vec!["real.txt"]);
}

#[test]
fn test_scan_of_missing_root_is_an_error() {
    let project = TempDir::new().unwrap();
    let missing = project.path().join("does-not-exist");
    assert!(scanner::scan(&missing).is_err());
}
