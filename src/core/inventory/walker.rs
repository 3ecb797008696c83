//! Directory walking implementation using walkdir.

use super::{FileRecord, Inventory};
use crate::core::container;
use crate::core::report::Warning;
use crate::error::InventoryError;
use crate::events::{null_sender, Event, EventSender, InventoryEvent, InventoryProgress};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Send a progress event every this many files
const PROGRESS_EVERY: usize = 256;

/// Builds an [`Inventory`] by walking an export root
#[derive(Debug, Clone, Default)]
pub struct InventoryBuilder {
    max_depth: Option<usize>,
}

impl InventoryBuilder {
    /// Create a builder that walks the whole tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the walk depth (mostly useful in tests)
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Walk `root` without progress events
    pub fn build(&self, root: &Path) -> Result<Inventory, InventoryError> {
        self.build_with_events(root, &null_sender())
    }

    /// Walk `root`, reporting progress through `events`.
    ///
    /// Fails only when the root itself is missing or unreadable. Any file
    /// that cannot be read is skipped and recorded as a warning.
    pub fn build_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<Inventory, InventoryError> {
        check_root(root)?;

        events.send(Event::Inventory(InventoryEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut inventory = Inventory::default();
        let mut walker = WalkDir::new(root).follow_links(false);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    events.send(Event::Inventory(InventoryEvent::Skipped {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                    inventory.warnings.push(Warning::Unreadable {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // Regular files only; symlinks are ignored to avoid cycles
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            match fs::metadata(path) {
                Ok(metadata) => {
                    let modified = metadata
                        .modified()
                        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                    let mut record =
                        FileRecord::new(path.to_path_buf(), metadata.len(), modified);
                    if container::is_iso_bmff_extension(&record.extension) {
                        record.has_video_track = container::has_video_track(path);
                    }
                    inventory.records.insert(record.path.clone(), record);

                    if inventory.records.len() % PROGRESS_EVERY == 0 {
                        events.send(Event::Inventory(InventoryEvent::Progress(
                            InventoryProgress {
                                files_found: inventory.records.len(),
                                current_path: path.to_path_buf(),
                            },
                        )));
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    events.send(Event::Inventory(InventoryEvent::Skipped {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    }));
                    inventory.warnings.push(Warning::Unreadable {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            files = inventory.records.len(),
            bytes = inventory.total_bytes(),
            "inventory complete"
        );
        events.send(Event::Inventory(InventoryEvent::Completed {
            total_files: inventory.records.len(),
        }));

        Ok(inventory)
    }
}

fn check_root(root: &Path) -> Result<(), InventoryError> {
    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        ErrorKind::NotFound => InventoryError::RootNotFound {
            path: root.to_path_buf(),
        },
        ErrorKind::PermissionDenied => InventoryError::PermissionDenied {
            path: root.to_path_buf(),
        },
        _ => InventoryError::ReadRoot {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    if !metadata.is_dir() {
        return Err(InventoryError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    // Listing the root up front distinguishes "unreadable" from "empty"
    fs::read_dir(root).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => InventoryError::PermissionDenied {
            path: root.to_path_buf(),
        },
        _ => InventoryError::ReadRoot {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn empty_directory_has_no_records() {
        let temp_dir = TempDir::new().unwrap();
        let inventory = InventoryBuilder::new().build(temp_dir.path()).unwrap();

        assert!(inventory.records.is_empty());
        assert!(inventory.warnings.is_empty());
    }

    #[test]
    fn records_size_and_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_file(temp_dir.path(), "Memory.JPG", b"12345");

        let inventory = InventoryBuilder::new().build(temp_dir.path()).unwrap();
        let record = &inventory.records[&path];

        assert_eq!(record.size_bytes, 5);
        assert_eq!(record.extension, "jpg");
        assert_eq!(record.raw_filename, "Memory.JPG");
    }

    #[test]
    fn includes_every_file_type() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "a.jpg", b"a");
        create_file(temp_dir.path(), "notes.xyz", b"b");
        create_file(temp_dir.path(), ".hidden", b"c");

        let inventory = InventoryBuilder::new().build(temp_dir.path()).unwrap();

        assert_eq!(inventory.records.len(), 3);
    }

    #[test]
    fn traverses_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("memories").join("2023");
        fs::create_dir_all(&nested).unwrap();
        create_file(temp_dir.path(), "root.jpg", b"a");
        create_file(&nested, "nested.mp4", b"b");

        let inventory = InventoryBuilder::new().build(temp_dir.path()).unwrap();

        assert_eq!(inventory.records.len(), 2);
    }

    #[test]
    fn max_depth_limits_walk() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("deep");
        fs::create_dir_all(&nested).unwrap();
        create_file(temp_dir.path(), "top.jpg", b"a");
        create_file(&nested, "deep.jpg", b"b");

        let inventory = InventoryBuilder::new()
            .max_depth(1)
            .build(temp_dir.path())
            .unwrap();

        assert_eq!(inventory.records.len(), 1);
    }

    #[test]
    fn missing_root_is_fatal() {
        let result = InventoryBuilder::new().build(Path::new("/nonexistent/export/12345"));
        assert!(matches!(result, Err(InventoryError::RootNotFound { .. })));
    }

    #[test]
    fn file_root_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_file(temp_dir.path(), "file.jpg", b"a");

        let result = InventoryBuilder::new().build(&path);

        assert!(matches!(result, Err(InventoryError::NotADirectory { .. })));
    }

    #[test]
    fn containers_record_their_track_layout() {
        let temp_dir = TempDir::new().unwrap();
        let clip = create_file(
            temp_dir.path(),
            "clip.mp4",
            &container::tests::mp4_with_handlers(&[b"vide", b"soun"]),
        );
        let memo = create_file(
            temp_dir.path(),
            "memo.MP4",
            &container::tests::mp4_with_handlers(&[b"soun"]),
        );
        let photo = create_file(temp_dir.path(), "photo.jpg", b"jpeg");

        let inventory = InventoryBuilder::new().build(temp_dir.path()).unwrap();

        assert_eq!(inventory.records[&clip].has_video_track, Some(true));
        assert_eq!(inventory.records[&memo].has_video_track, Some(false));
        assert_eq!(inventory.records[&photo].has_video_track, None);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let target = create_file(temp_dir.path(), "real.jpg", b"a");
        std::os::unix::fs::symlink(&target, temp_dir.path().join("link.jpg")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("loop")).unwrap();

        let inventory = InventoryBuilder::new().build(temp_dir.path()).unwrap();

        assert_eq!(inventory.records.len(), 1);
        assert!(inventory.records.contains_key(&target));
    }
}
