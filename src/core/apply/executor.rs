//! Executor for apply actions.

use super::types::*;
use crate::events::{null_sender, ApplyEvent, ApplyProgress, Event, EventSender};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Executes apply actions against the filesystem
pub struct ApplyExecutor {
    /// Export root cleaned of empty directories afterwards
    source_root: Option<PathBuf>,
}

impl ApplyExecutor {
    /// Executor that prunes empty directories under `source_root` when done
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: Some(source_root.into()),
        }
    }

    /// Executor that never prunes directories
    pub fn without_cleanup() -> Self {
        Self { source_root: None }
    }

    /// Execute actions without progress events
    pub fn execute(
        &self,
        actions: &[ApplyAction],
        operation: OperationMode,
        dry_run: bool,
    ) -> ApplyOutcome {
        self.execute_with_events(actions, operation, dry_run, &null_sender())
    }

    /// Execute actions in order. Failures are collected and the rest continue.
    ///
    /// With `dry_run` nothing is touched and `completed` lists what would run.
    pub fn execute_with_events(
        &self,
        actions: &[ApplyAction],
        operation: OperationMode,
        dry_run: bool,
        events: &EventSender,
    ) -> ApplyOutcome {
        let start = Instant::now();
        let mut last_progress = Instant::now();
        let total = actions.len();
        let mut outcome = ApplyOutcome {
            dry_run,
            ..Default::default()
        };
        let mut created_dirs: HashSet<PathBuf> = HashSet::new();

        events.send(Event::Apply(ApplyEvent::Started {
            total_actions: total,
            dry_run,
        }));

        for (i, action) in actions.iter().enumerate() {
            let now = Instant::now();
            if now.duration_since(last_progress) >= PROGRESS_INTERVAL {
                events.send(Event::Apply(ApplyEvent::Progress(ApplyProgress {
                    completed: i,
                    total,
                    current_path: action.source().to_path_buf(),
                })));
                last_progress = now;
            }

            let result = if dry_run {
                Ok(())
            } else {
                match action {
                    ApplyAction::Place {
                        source,
                        destination,
                        capture_time,
                        ..
                    } => self
                        .prepare_parent(destination, &mut created_dirs, &mut outcome)
                        .and_then(|_| place(source, destination, operation))
                        .map(|_| {
                            if let Some(time) = capture_time.and_then(|t| t.to_system_time()) {
                                if let Err(e) = stamp_modified(destination, time) {
                                    warn!(
                                        path = %destination.display(),
                                        "could not set modification time: {}",
                                        e
                                    );
                                }
                            }
                        }),
                    ApplyAction::Delete { path, .. } => delete(path),
                }
            };

            match result {
                Ok(()) => {
                    match action {
                        ApplyAction::Place { .. } => outcome.files_placed += 1,
                        ApplyAction::Delete { .. } => outcome.files_deleted += 1,
                    }
                    outcome.total_size_bytes += action.size_bytes();
                    outcome.completed.push(action.clone());
                }
                Err(e) => {
                    let failure = ApplyFailure {
                        path: action.source().to_path_buf(),
                        message: e.to_string(),
                    };
                    warn!(path = %failure.path.display(), "apply failed: {}", failure.message);
                    events.send(Event::Apply(ApplyEvent::Error {
                        path: failure.path.clone(),
                        message: failure.message.clone(),
                    }));
                    outcome.failures.push(failure);
                }
            }
        }

        events.send(Event::Apply(ApplyEvent::Progress(ApplyProgress {
            completed: total,
            total,
            current_path: PathBuf::new(),
        })));

        if !dry_run {
            if let Some(root) = &self.source_root {
                outcome.folders_removed = remove_empty_dirs(root);
            }
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            placed = outcome.files_placed,
            deleted = outcome.files_deleted,
            failed = outcome.failures.len(),
            dry_run,
            "apply complete"
        );
        events.send(Event::Apply(ApplyEvent::Completed {
            succeeded: outcome.completed.len(),
            failed: outcome.failures.len(),
            directories_removed: outcome.folders_removed,
        }));

        outcome
    }

    fn prepare_parent(
        &self,
        destination: &Path,
        created_dirs: &mut HashSet<PathBuf>,
        outcome: &mut ApplyOutcome,
    ) -> std::io::Result<()> {
        if let Some(parent) = destination.parent() {
            if !created_dirs.contains(parent) {
                if !parent.exists() {
                    outcome.folders_created += 1;
                }
                fs::create_dir_all(parent)?;
                created_dirs.insert(parent.to_path_buf());
            }
        }
        Ok(())
    }
}

/// Copy or move one file, never overwriting
fn place(source: &Path, destination: &Path, operation: OperationMode) -> std::io::Result<()> {
    if !source.exists() {
        return Err(std::io::Error::new(
            ErrorKind::NotFound,
            "Source file not found",
        ));
    }
    if destination.exists() {
        return Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("Destination already exists: {}", destination.display()),
        ));
    }

    match operation {
        OperationMode::Copy => fs::copy(source, destination).map(|_| ()),
        OperationMode::Move => fs::rename(source, destination).or_else(|_| {
            // rename fails across filesystems, fall back to copy+delete
            // with size verification before deleting source
            let source_size = fs::metadata(source)?.len();
            fs::copy(source, destination)?;

            let dest_size = fs::metadata(destination)?.len();
            if dest_size != source_size {
                let _ = fs::remove_file(destination);
                return Err(std::io::Error::other(format!(
                    "Copy verification failed: source {} bytes, dest {} bytes",
                    source_size, dest_size
                )));
            }

            fs::remove_file(source)
        }),
    }
}

fn stamp_modified(path: &Path, time: std::time::SystemTime) -> std::io::Result<()> {
    let file = fs::File::options().write(true).open(path)?;
    file.set_modified(time)
}

/// Remove a discarded file; one that is already gone counts as removed
fn delete(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "discard already gone");
            Ok(())
        }
        other => other,
    }
}

/// Remove empty directories below `root`, deepest first. The root stays.
fn remove_empty_dirs(root: &Path) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let is_empty = fs::read_dir(entry.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty && fs::remove_dir(entry.path()).is_ok() {
            debug!(path = %entry.path().display(), "removed empty directory");
            removed += 1;
        }
    }
    removed
}
