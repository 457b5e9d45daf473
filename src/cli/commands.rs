//! CLI commands

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::checkpoint::{ChangeKind, CheckpointManager};
use crate::db::Database;
use crate::error::StoreError;

#[derive(Parser)]
#[command(name = "backtrack")]
#[command(about = "Session-scoped project checkpoints: snapshot, diff, and restore tracked files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path (default: ~/.backtrack/backtrack.db)
    #[arg(long)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a "work started" event: open or refresh the project's session
    Start {
        /// Project directory
        project_path: String,

        /// Project name (default: the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Prompt or activity text to attach to the session
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Record a "work stopped" event: close the session and take a checkpoint
    Stop {
        /// Project directory
        project_path: String,
    },

    /// Per-project statistics across all sessions and checkpoints
    Projects {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List a project's checkpoints, newest first
    Checkpoints {
        /// Project directory
        project_path: String,

        #[arg(long)]
        json: bool,
    },

    /// Show one checkpoint and its captured files
    Show {
        /// Checkpoint ID
        checkpoint_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Diff a checkpoint against its previous one (or an explicit baseline)
    Diff {
        /// Checkpoint ID (the "current" side)
        checkpoint_id: String,

        /// Baseline checkpoint ID (default: the previous checkpoint)
        #[arg(long)]
        against: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Write every file captured by a checkpoint back to disk
    Restore {
        /// Checkpoint ID
        checkpoint_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete one checkpoint
    Delete {
        /// Checkpoint ID
        checkpoint_id: String,
    },

    /// Delete all checkpoints and sessions for one project
    DeleteProject {
        /// Project directory
        project_path: String,
    },

    /// Wipe all sessions, checkpoints, and snapshots
    Clear {
        /// Confirm the irreversible wipe
        #[arg(long)]
        yes: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Use provided path or default to ~/.backtrack/backtrack.db
    let db_path = cli.database.unwrap_or_else(|| {
        dirs::home_dir()
            .map(|h| h.join(".backtrack").join("backtrack.db"))
            .unwrap_or_else(|| std::path::PathBuf::from("./backtrack.db"))
            .to_string_lossy()
            .to_string()
    });

    // Initialize database and manager
    let db = Database::new(&db_path)?;
    let manager = CheckpointManager::new(db);

    // Create a multi-threaded runtime for CLI operations
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        match cli.command {
            Commands::Start {
                project_path,
                name,
                prompt,
            } => {
                let project_path = resolve_project_path(&project_path);
                let project_name = name.unwrap_or_else(|| project_name_of(&project_path));

                let session = manager
                    .open_or_refresh_session(&project_path, &project_name, prompt.as_deref())
                    .await?;

                println!(
                    "Session {} active for {}",
                    short(&session.id),
                    session.project_path
                );
                Ok(())
            }

            Commands::Stop { project_path } => {
                let project_path = resolve_project_path(&project_path);

                match manager.close_session_and_checkpoint(&project_path).await? {
                    Some(checkpoint) => {
                        println!("Created checkpoint {}: {}", short(&checkpoint.id), checkpoint.message)
                    }
                    None => println!("No checkpoint created for {}", project_path),
                }
                Ok(())
            }

            Commands::Projects { json } => {
                let stats = manager.list_project_stats().await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else if stats.is_empty() {
                    println!("No projects found");
                } else {
                    for p in stats {
                        println!(
                            "{} ({}) - {} sessions, {} checkpoints, {} file changes, last active {}",
                            p.project_name,
                            p.project_path,
                            p.session_count,
                            p.checkpoint_count,
                            p.total_file_changes,
                            p.last_session_time.to_rfc3339()
                        );
                    }
                }
                Ok(())
            }

            Commands::Checkpoints { project_path, json } => {
                let project_path = resolve_project_path(&project_path);
                let checkpoints = manager.list_checkpoints(&project_path).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&checkpoints)?);
                } else if checkpoints.is_empty() {
                    println!("No checkpoints found for {}", project_path);
                } else {
                    for c in checkpoints {
                        println!(
                            "[{}] {} - {}",
                            short(&c.id),
                            c.timestamp.to_rfc3339(),
                            c.message
                        );
                    }
                }
                Ok(())
            }

            Commands::Show { checkpoint_id, json } => {
                match manager.get_checkpoint(&checkpoint_id).await? {
                    Some((checkpoint, files)) => {
                        if json {
                            let payload = serde_json::json!({
                                "checkpoint": checkpoint,
                                "files": files,
                            });
                            println!("{}", serde_json::to_string_pretty(&payload)?);
                        } else {
                            println!("Checkpoint {}", checkpoint.id);
                            println!("  Project: {} ({})", checkpoint.project_name, checkpoint.project_path);
                            println!("  Created: {}", checkpoint.timestamp.to_rfc3339());
                            println!("  Message: {}", checkpoint.message);
                            println!("  Files:");
                            for f in files {
                                println!("    {} ({} bytes)", f.relative_path, f.size);
                            }
                        }
                        Ok(())
                    }
                    None => anyhow::bail!("Checkpoint not found: {}", checkpoint_id),
                }
            }

            Commands::Diff {
                checkpoint_id,
                against,
                json,
            } => {
                let previous_id = match against {
                    Some(id) => id,
                    None => match manager.previous_checkpoint_of(&checkpoint_id).await? {
                        Some(previous) => previous.id,
                        None => {
                            println!("No prior checkpoint to diff {} against", checkpoint_id);
                            return Ok(());
                        }
                    },
                };

                let result = manager.diff_checkpoints(&checkpoint_id, &previous_id).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!(
                        "{} added, {} modified, {} deleted",
                        result.summary.added, result.summary.modified, result.summary.deleted
                    );
                    for change in result.changes {
                        let marker = match change.kind {
                            ChangeKind::Added => "A",
                            ChangeKind::Modified => "M",
                            ChangeKind::Deleted => "D",
                        };
                        println!("{} {}", marker, change.relative_path);
                        if let Some(diff) = change.diff {
                            print!("{}", diff);
                        }
                    }
                }
                Ok(())
            }

            Commands::Restore { checkpoint_id, json } => {
                let result = manager.restore_checkpoint(&checkpoint_id).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!(
                        "Restored {}/{} files from {}",
                        result.files_restored, result.total_files, checkpoint_id
                    );
                    for failure in result.errors {
                        println!("  failed: {} ({})", failure.path, failure.message);
                    }
                }
                Ok(())
            }

            Commands::Delete { checkpoint_id } => {
                match manager.delete_checkpoint(&checkpoint_id).await {
                    Ok(()) => {
                        println!("Deleted checkpoint {}", checkpoint_id);
                        Ok(())
                    }
                    Err(StoreError::NotFound(id)) => {
                        anyhow::bail!("Checkpoint not found: {}", id)
                    }
                    Err(e) => Err(e.into()),
                }
            }

            Commands::DeleteProject { project_path } => {
                let project_path = resolve_project_path(&project_path);
                manager.delete_project_checkpoints(&project_path).await?;
                println!("Deleted all checkpoints and sessions for {}", project_path);
                Ok(())
            }

            Commands::Clear { yes } => {
                if !yes {
                    println!("This wipes every session and checkpoint; re-run with --yes to confirm");
                    return Ok(());
                }
                manager.clear_all().await?;
                println!("Cleared all data");
                Ok(())
            }
        }
    })
}

/// Canonicalize a project path so session keys and scanner paths agree; a
/// path that no longer exists (e.g. for delete-project) is used as given.
fn resolve_project_path(raw: &str) -> String {
    std::fs::canonicalize(raw)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn project_name_of(project_path: &str) -> String {
    std::path::Path::new(project_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| project_path.to_string())
}

fn short(id: &str) -> String {
    id.chars().take(8).collect()
}
