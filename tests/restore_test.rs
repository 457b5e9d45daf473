// Restore engine tests

use std::fs;
use std::path::Path;

use backtrack::checkpoint::CheckpointManager;
use backtrack::db::repositories::checkpoint::Checkpoint;
use backtrack::db::Database;
use backtrack::error::StoreError;
use tempfile::TempDir;

fn create_manager() -> (CheckpointManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(temp_dir.path().join("test.db")).unwrap();
    (CheckpointManager::new(db), temp_dir)
}

fn write_file(project: &Path, rel: &str, content: &str) {
    let path = project.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

async fn take_checkpoint(manager: &CheckpointManager, project: &TempDir) -> Checkpoint {
    let path = project
        .path()
        .canonicalize()
        .unwrap()
        .to_string_lossy()
        .to_string();
    manager
        .open_or_refresh_session(&path, "test-project", None)
        .await
        .unwrap();
    manager
        .close_session_and_checkpoint(&path)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_restore_round_trip() {
    let (manager, _temp) = create_manager();
    let project = TempDir::new().unwrap();
    write_file(project.path(), "a.txt", "original a\n");
    write_file(project.path(), "sub/b.txt", "original b\n");

    let checkpoint = take_checkpoint(&manager, &project).await;

    // Mangle the working tree after the checkpoint
    write_file(project.path(), "a.txt", "edited\n");
    fs::remove_file(project.path().join("sub/b.txt")).unwrap();
    fs::remove_dir(project.path().join("sub")).unwrap();

    let result = manager.restore_checkpoint(&checkpoint.id).await.unwrap();

    assert_eq!(result.files_restored, 2);
    assert_eq!(result.total_files, 2);
    assert!(result.errors.is_empty());

    let a = fs::read_to_string(project.path().join("a.txt")).unwrap();
    assert_eq!(a, "original a\n");
    // Missing directories are recreated during restore
    let b = fs::read_to_string(project.path().join("sub/b.txt")).unwrap();
    assert_eq!(b, "original b\n");
}

#[tokio::test]
async fn test_restore_is_idempotent() {
    let (manager, _temp) = create_manager();
    let project = TempDir::new().unwrap();
    write_file(project.path(), "a.txt", "stable\n");

    let checkpoint = take_checkpoint(&manager, &project).await;

    write_file(project.path(), "a.txt", "dirty\n");

    let first = manager.restore_checkpoint(&checkpoint.id).await.unwrap();
    let second = manager.restore_checkpoint(&checkpoint.id).await.unwrap();

    assert_eq!(first.files_restored, second.files_restored);
    assert!(second.errors.is_empty());
    let content = fs::read_to_string(project.path().join("a.txt")).unwrap();
    assert_eq!(content, "stable\n");
}

#[tokio::test]
async fn test_restored_content_survives_rescan() {
    let (manager, _temp) = create_manager();
    let project = TempDir::new().unwrap();
    write_file(project.path(), "a.txt", "scan me\n");

    let checkpoint = take_checkpoint(&manager, &project).await;
    write_file(project.path(), "a.txt", "changed\n");
    manager.restore_checkpoint(&checkpoint.id).await.unwrap();

    let rescan = backtrack::scanner::scan(project.path()).unwrap();
    let (_, snapshots) = manager
        .get_checkpoint(&checkpoint.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(rescan.files.len(), snapshots.len());
    for snapshot in &snapshots {
        let rescanned = rescan
            .files
            .iter()
            .find(|f| f.path.to_string_lossy() == snapshot.file_path)
            .unwrap();
        assert_eq!(rescanned.content, snapshot.content);
        assert_eq!(rescanned.hash, snapshot.content_hash);
    }
}

#[tokio::test]
async fn test_restore_unknown_id_is_not_found() {
    let (manager, _temp) = create_manager();

    let err = manager.restore_checkpoint("no-such-id").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_restore_collects_per_file_failures() {
    let (manager, _temp) = create_manager();
    let project = TempDir::new().unwrap();
    write_file(project.path(), "ok.txt", "fine\n");
    write_file(project.path(), "sub/blocked.txt", "blocked\n");

    let checkpoint = take_checkpoint(&manager, &project).await;

    // A directory now squats on the snapshot's path; that write must fail
    // while the rest of the restore keeps going
    fs::remove_file(project.path().join("sub/blocked.txt")).unwrap();
    fs::create_dir(project.path().join("sub/blocked.txt")).unwrap();

    let result = manager.restore_checkpoint(&checkpoint.id).await.unwrap();

    assert_eq!(result.total_files, 2);
    assert_eq!(result.files_restored, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].path.ends_with("blocked.txt"));
    assert!(!result.errors[0].message.is_empty());

    let ok = fs::read_to_string(project.path().join("ok.txt")).unwrap();
    assert_eq!(ok, "fine\n");
}
