//! Turns a reconciliation plan into concrete filesystem actions.

use super::types::ApplyAction;
use crate::core::media::MediaItem;
use crate::core::pipeline::ReconciliationPlan;
use crate::error::ApplyError;
use chrono::Datelike;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder for items without a capture time
const UNDATED_FOLDER: &str = "Undated";

/// Maps plan items to destination paths
pub struct ApplyPlanner;

impl ApplyPlanner {
    /// Build the action list for `plan` under `destination`.
    ///
    /// Items land in `<Category>/<YYYY>/<MM>/`, undated ones in
    /// `<Category>/Undated/`. An overlay is placed next to its base as
    /// `<base stem>-overlay.<ext>`. Every discard becomes a delete.
    pub fn plan(
        plan: &ReconciliationPlan,
        destination: &Path,
    ) -> Result<Vec<ApplyAction>, ApplyError> {
        if is_inside(destination, &plan.root) {
            return Err(ApplyError::DestinationInsideRoot {
                path: destination.to_path_buf(),
            });
        }

        let mut actions = Vec::with_capacity(plan.items.len() + plan.discards.len());
        let mut taken: HashSet<PathBuf> = HashSet::new();
        // Track next available counter for each base path (parent + stem + ext)
        let mut path_counters: HashMap<String, usize> = HashMap::new();

        for item in &plan.items {
            let folder = destination.join(Self::build_folder_path(item));

            let base_dest = Self::claim(
                folder.join(&item.base.raw_filename),
                &mut taken,
                &mut path_counters,
            );
            actions.push(ApplyAction::Place {
                source: item.base.path.clone(),
                destination: base_dest.clone(),
                capture_time: item.capture_time,
                size_bytes: item.base.size_bytes,
            });

            if let Some(overlay) = &item.overlay {
                let stem = base_dest
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let name = if overlay.extension.is_empty() {
                    format!("{}-overlay", stem)
                } else {
                    format!("{}-overlay.{}", stem, overlay.extension)
                };
                let overlay_dest = Self::claim(folder.join(name), &mut taken, &mut path_counters);
                actions.push(ApplyAction::Place {
                    source: overlay.path.clone(),
                    destination: overlay_dest,
                    capture_time: item.capture_time,
                    size_bytes: overlay.size_bytes,
                });
            }
        }

        for discard in &plan.discards {
            actions.push(ApplyAction::Delete {
                path: discard.path.clone(),
                size_bytes: discard.size_bytes,
            });
        }

        Ok(actions)
    }

    /// Relative folder for an item
    fn build_folder_path(item: &MediaItem) -> PathBuf {
        let category = PathBuf::from(item.category.folder_name());
        match item.capture_time {
            Some(ts) => category
                .join(format!("{}", ts.local.year()))
                .join(format!("{:02}", ts.local.month())),
            None => category.join(UNDATED_FOLDER),
        }
    }

    /// Reserve `path`, renaming with a `_N` counter if it is taken
    fn claim(
        path: PathBuf,
        taken: &mut HashSet<PathBuf>,
        counters: &mut HashMap<String, usize>,
    ) -> PathBuf {
        let unique = if taken.contains(&path) || path.exists() {
            Self::generate_unique_path_fast(&path, taken, counters)
        } else {
            path
        };
        taken.insert(unique.clone());
        unique
    }

    /// Fast unique path generation using counter tracking (O(1) per call)
    fn generate_unique_path_fast(
        path: &Path,
        existing: &HashSet<PathBuf>,
        counters: &mut HashMap<String, usize>,
    ) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = path.parent().unwrap_or(Path::new(""));

        let pattern_key = format!("{}:{}:{}", parent.display(), stem, ext);
        let counter = counters.entry(pattern_key).or_insert(1);

        loop {
            let new_name = if ext.is_empty() {
                format!("{}_{}", stem, counter)
            } else {
                format!("{}_{}.{}", stem, counter, ext)
            };
            let new_path = parent.join(new_name);
            *counter += 1;

            if !existing.contains(&new_path) && !new_path.exists() {
                return new_path;
            }
        }
    }
}

/// Whether `path` is `root` or below it, resolving symlinks where possible
fn is_inside(path: &Path, root: &Path) -> bool {
    let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    // The destination may not exist yet; resolve its nearest existing ancestor
    let mut existing = path.to_path_buf();
    let mut tail = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }
    let mut resolved = fs::canonicalize(&existing).unwrap_or(existing);
    for name in tail.into_iter().rev() {
        resolved.push(name);
    }
    resolved.starts_with(&root)
}
