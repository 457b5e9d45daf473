//! SQL schema definitions

pub const SCHEMA: &str = r#"
-- Sessions table
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    project_path TEXT NOT NULL,
    project_name TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    last_prompt TEXT,
    last_prompt_time TEXT,
    total_file_changes INTEGER NOT NULL DEFAULT 0
);

-- Checkpoints table
CREATE TABLE IF NOT EXISTS checkpoints (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    project_path TEXT NOT NULL,
    project_name TEXT NOT NULL,
    message TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    file_count INTEGER NOT NULL,
    total_size INTEGER NOT NULL,
    user_prompt TEXT,
    FOREIGN KEY (session_id) REFERENCES sessions(id)
);

-- File snapshots table: one row per tracked file per checkpoint.
-- Snapshots are full copies, not deltas; deleted with their checkpoint.
CREATE TABLE IF NOT EXISTS file_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    checkpoint_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    content TEXT NOT NULL,
    size INTEGER NOT NULL,
    modified_time TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    extension TEXT,
    is_directory INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (checkpoint_id) REFERENCES checkpoints(id) ON DELETE CASCADE
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_sessions_project_path ON sessions(project_path);
CREATE INDEX IF NOT EXISTS idx_checkpoints_project_path ON checkpoints(project_path);
CREATE INDEX IF NOT EXISTS idx_file_snapshots_checkpoint_id ON file_snapshots(checkpoint_id);
"#;
