//! # Dedup Module
//!
//! Collapses byte-identical media into one canonical record per group.
//!
//! ## Algorithm
//! 1. Fingerprint every `media` / `voice-memo` record in parallel (rayon
//!    pool bounded by `concurrency_limit`). Each file is streamed, so a
//!    worker holds one chunk at a time.
//! 2. Insert into a sharded [`DashMap`] keyed by `(fingerprint, kind)`;
//!    concurrent inserts into the same group only contend on that shard.
//! 3. Pick the canonical member of each group and list the rest as discards.
//!
//! ## Canonical choice
//! Prefer a filename with a parseable timestamp, then the shortest
//! filename, then the lexicographically smallest filename, then path.

use crate::core::classifier::FileKind;
use crate::core::config::CompiledConfig;
use crate::core::fingerprint::{ContentFingerprint, FingerprintHasher};
use crate::core::inventory::FileRecord;
use crate::core::media::Discard;
use crate::core::report::{Anomaly, Warning};
use crate::core::timestamp;
use crate::error::HashError;
use crate::events::{null_sender, Event, EventSender, HashEvent, HashProgress};
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Records sharing one fingerprint and kind
#[derive(Debug, Clone)]
pub struct MediaGroup {
    pub fingerprint: ContentFingerprint,
    pub kind: FileKind,
    /// The surviving record
    pub canonical: FileRecord,
    /// Byte-identical copies, listed for deletion
    pub alternates: Vec<FileRecord>,
}

impl MediaGroup {
    /// Bytes freed by deleting the alternates
    pub fn reclaimable_bytes(&self) -> u64 {
        self.alternates.iter().map(|r| r.size_bytes).sum()
    }
}

/// Output of the dedup stage
#[derive(Debug, Default)]
pub struct DedupResult {
    /// One record per distinct content, in path order
    pub canonical: Vec<FileRecord>,
    /// Groups that had more than one member
    pub groups: Vec<MediaGroup>,
    /// Alternates of every group
    pub discards: Vec<Discard>,
    /// Missing files, hash failures and extension mismatches
    pub warnings: Vec<Warning>,
}

impl DedupResult {
    /// Bytes freed by deleting every duplicate
    pub fn reclaimable_bytes(&self) -> u64 {
        self.groups.iter().map(MediaGroup::reclaimable_bytes).sum()
    }
}

enum HashOutcome {
    Hashed(ContentFingerprint, FileRecord),
    /// Unreadable for a reason other than disappearing; kept unhashed
    Unhashed(FileRecord, Warning),
    Missing(Warning),
}

/// Content deduplicator
pub struct Deduplicator<'a> {
    config: &'a CompiledConfig,
    hasher: FingerprintHasher,
}

impl<'a> Deduplicator<'a> {
    pub fn new(config: &'a CompiledConfig) -> Self {
        Self {
            config,
            hasher: FingerprintHasher::from_config(config),
        }
    }

    /// Deduplicate records without progress reporting
    pub fn deduplicate(&self, records: Vec<FileRecord>) -> Result<DedupResult, HashError> {
        self.deduplicate_with_events(records, &null_sender())
    }

    /// Deduplicate records, reporting hashing progress
    pub fn deduplicate_with_events(
        &self,
        records: Vec<FileRecord>,
        events: &EventSender,
    ) -> Result<DedupResult, HashError> {
        let total = records.len();
        events.send(Event::Hash(HashEvent::Started { total_files: total }));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency_limit)
            .build()
            .map_err(|e| HashError::WorkerPool(e.to_string()))?;

        let table: DashMap<(ContentFingerprint, FileKind), Vec<FileRecord>> = DashMap::new();
        let completed = AtomicUsize::new(0);

        let leftovers: Vec<HashOutcome> = pool.install(|| {
            records
                .into_par_iter()
                .filter_map(|record| {
                    let outcome = self.hash_record(record);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                    match outcome {
                        HashOutcome::Hashed(fingerprint, record) => {
                            if events.is_connected() {
                                events.send(Event::Hash(HashEvent::Progress(HashProgress {
                                    completed: done,
                                    total,
                                    current_path: record.path.clone(),
                                })));
                            }
                            table
                                .entry((fingerprint, record.kind))
                                .or_default()
                                .push(record);
                            None
                        }
                        other => Some(other),
                    }
                })
                .collect()
        });

        let mut result = DedupResult::default();

        for outcome in leftovers {
            match outcome {
                HashOutcome::Unhashed(record, warning) => {
                    self.report(events, &warning);
                    result.warnings.push(warning);
                    result.canonical.push(record);
                }
                HashOutcome::Missing(warning) => {
                    self.report(events, &warning);
                    result.warnings.push(warning);
                }
                HashOutcome::Hashed(..) => {}
            }
        }

        let total_hashed = table.len();
        for ((fingerprint, kind), members) in table.into_iter() {
            let group = build_group(fingerprint, kind, members);
            result.canonical.push(group.canonical.clone());

            if group.alternates.is_empty() {
                continue;
            }

            debug!(
                canonical = %group.canonical.path.display(),
                copies = group.alternates.len(),
                reclaimable = group.reclaimable_bytes(),
                "duplicate group"
            );
            for alternate in &group.alternates {
                if alternate.extension != group.canonical.extension {
                    let anomaly = Anomaly::ExtensionMismatch {
                        canonical: group.canonical.path.clone(),
                        duplicate: alternate.path.clone(),
                    };
                    warn!("{}", anomaly);
                    result.warnings.push(Warning::Anomaly(anomaly));
                }
                result
                    .discards
                    .push(Discard::duplicate(alternate, &group.canonical.path));
            }
            result.groups.push(group);
        }

        // DashMap iteration order is arbitrary
        result.canonical.sort_by(|a, b| a.path.cmp(&b.path));
        result
            .groups
            .sort_by(|a, b| a.canonical.path.cmp(&b.canonical.path));
        result.discards.sort_by(|a, b| a.path.cmp(&b.path));
        result.warnings.sort_by(|a, b| a.path().cmp(b.path()));

        info!(
            hashed = completed.load(Ordering::SeqCst),
            distinct = total_hashed,
            discards = result.discards.len(),
            reclaimable = result.reclaimable_bytes(),
            "dedup complete"
        );
        events.send(Event::Hash(HashEvent::Completed {
            total_hashed: completed.load(Ordering::SeqCst),
            duplicate_groups: result.groups.len(),
        }));

        Ok(result)
    }

    fn hash_record(&self, record: FileRecord) -> HashOutcome {
        let allow_sampling =
            record.kind == FileKind::Media && self.config.is_video_extension(&record.extension);

        match self.hasher.fingerprint(&record.path, allow_sampling) {
            Ok(fingerprint) => HashOutcome::Hashed(fingerprint, record),
            Err(HashError::Missing { path }) => HashOutcome::Missing(Warning::MissingFile { path }),
            Err(e) => {
                let warning = Warning::HashFailed {
                    path: record.path.clone(),
                    reason: e.to_string(),
                };
                HashOutcome::Unhashed(record, warning)
            }
        }
    }

    fn report(&self, events: &EventSender, warning: &Warning) {
        warn!("{}", warning);
        events.send(Event::Hash(HashEvent::Error {
            path: warning.path().to_path_buf(),
            message: warning.to_string(),
        }));
    }
}

/// Order members by canonical preference and split off the winner
fn build_group(
    fingerprint: ContentFingerprint,
    kind: FileKind,
    mut members: Vec<FileRecord>,
) -> MediaGroup {
    members.sort_by_cached_key(|r| {
        (
            timestamp::parse_filename(&r.raw_filename).is_none(),
            r.raw_filename.chars().count(),
            r.raw_filename.clone(),
            r.path.clone(),
        )
    });
    let canonical = members.remove(0);

    MediaGroup {
        fingerprint,
        kind,
        canonical,
        alternates: members,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ReconcileConfig;
    use crate::core::media::DiscardReason;
    use crate::events::EventChannel;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn media(dir: &Path, name: &str, content: &[u8]) -> FileRecord {
        let path = dir.join(name);
        File::create(&path).unwrap().write_all(content).unwrap();
        FileRecord::new(path, content.len() as u64, SystemTime::UNIX_EPOCH)
            .with_kind(FileKind::Media)
    }

    fn config() -> CompiledConfig {
        ReconcileConfig::default().compile().unwrap()
    }

    #[test]
    fn identical_files_collapse_to_one() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            media(dir.path(), "img_20230501_1200.jpg", b"pixels"),
            media(dir.path(), "img_20230501_1200(1).jpg", b"pixels"),
            media(dir.path(), "other.jpg", b"different"),
        ];
        let config = config();

        let result = Deduplicator::new(&config).deduplicate(records).unwrap();

        assert_eq!(result.canonical.len(), 2);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.discards.len(), 1);
        assert_eq!(
            result.groups[0].canonical.raw_filename,
            "img_20230501_1200.jpg"
        );
        assert!(result.discards[0]
            .path
            .ends_with("img_20230501_1200(1).jpg"));
    }

    #[test]
    fn timestamped_name_beats_shorter_name() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            media(dir.path(), "a.jpg", b"same"),
            media(dir.path(), "IMG_20230501_134502.jpg", b"same"),
        ];
        let config = config();

        let result = Deduplicator::new(&config).deduplicate(records).unwrap();

        assert_eq!(result.canonical.len(), 1);
        assert_eq!(result.canonical[0].raw_filename, "IMG_20230501_134502.jpg");
    }

    #[test]
    fn shortest_then_lexicographic_name_wins() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            media(dir.path(), "bb.jpg", b"same"),
            media(dir.path(), "aa.jpg", b"same"),
            media(dir.path(), "c-copy.jpg", b"same"),
        ];
        let config = config();

        let result = Deduplicator::new(&config).deduplicate(records).unwrap();

        assert_eq!(result.canonical[0].raw_filename, "aa.jpg");
        assert_eq!(result.groups[0].alternates.len(), 2);
    }

    #[test]
    fn reclaimable_bytes_count_only_alternates() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            media(dir.path(), "a.jpg", b"twelve bytes"),
            media(dir.path(), "a(1).jpg", b"twelve bytes"),
            media(dir.path(), "a(2).jpg", b"twelve bytes"),
            media(dir.path(), "b.jpg", b"four"),
            media(dir.path(), "b(1).jpg", b"four"),
            media(dir.path(), "unique.jpg", b"not counted"),
        ];
        let config = config();

        let result = Deduplicator::new(&config).deduplicate(records).unwrap();

        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups[0].reclaimable_bytes(), 24);
        assert_eq!(result.groups[1].reclaimable_bytes(), 4);
        assert_eq!(result.reclaimable_bytes(), 28);
    }

    #[test]
    fn kinds_do_not_merge() {
        let dir = TempDir::new().unwrap();
        let memo = media(dir.path(), "voice-memo.mp4", b"same").with_kind(FileKind::VoiceMemo);
        let clip = media(dir.path(), "clip.mp4", b"same");
        let config = config();

        let result = Deduplicator::new(&config)
            .deduplicate(vec![memo, clip])
            .unwrap();

        assert_eq!(result.canonical.len(), 2);
        assert!(result.discards.is_empty());
    }

    #[test]
    fn extension_mismatch_is_an_anomaly_not_a_blocker() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            media(dir.path(), "a.jpg", b"same"),
            media(dir.path(), "a.png", b"same"),
        ];
        let config = config();

        let result = Deduplicator::new(&config).deduplicate(records).unwrap();

        assert_eq!(result.canonical.len(), 1);
        assert_eq!(result.discards.len(), 1);
        assert!(matches!(
            result.warnings[0],
            Warning::Anomaly(Anomaly::ExtensionMismatch { .. })
        ));
    }

    #[test]
    fn vanished_file_is_dropped_with_warning() {
        let dir = TempDir::new().unwrap();
        let kept = media(dir.path(), "kept.jpg", b"here");
        let gone = media(dir.path(), "gone.jpg", b"soon gone");
        fs::remove_file(&gone.path).unwrap();
        let config = config();

        let result = Deduplicator::new(&config)
            .deduplicate(vec![kept, gone])
            .unwrap();

        assert_eq!(result.canonical.len(), 1);
        assert_eq!(result.canonical[0].raw_filename, "kept.jpg");
        assert!(matches!(result.warnings[0], Warning::MissingFile { .. }));
    }

    #[test]
    fn discards_name_their_canonical() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            media(dir.path(), "a.jpg", b"x"),
            media(dir.path(), "a(1).jpg", b"x"),
        ];
        let config = config();

        let result = Deduplicator::new(&config).deduplicate(records).unwrap();

        match &result.discards[0].reason {
            DiscardReason::Duplicate { canonical } => assert!(canonical.ends_with("a.jpg")),
            other => panic!("unexpected reason {:?}", other),
        }
    }

    #[test]
    fn concurrency_limit_is_respected() {
        let dir = TempDir::new().unwrap();
        let records: Vec<_> = (0..20)
            .map(|i| media(dir.path(), &format!("f{i}.jpg"), &[i as u8 % 5]))
            .collect();
        let config = ReconcileConfig {
            concurrency_limit: 2,
            ..Default::default()
        }
        .compile()
        .unwrap();

        let result = Deduplicator::new(&config).deduplicate(records).unwrap();

        assert_eq!(result.canonical.len(), 5);
        assert_eq!(result.discards.len(), 15);
    }

    #[test]
    fn emits_progress_for_every_file() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            media(dir.path(), "a.jpg", b"1"),
            media(dir.path(), "b.jpg", b"2"),
        ];
        let config = config();
        let (sender, receiver) = EventChannel::new();

        Deduplicator::new(&config)
            .deduplicate_with_events(records, &sender)
            .unwrap();
        drop(sender);

        let progress = receiver
            .iter()
            .filter(|e| matches!(e, Event::Hash(HashEvent::Progress(_))))
            .count();
        assert_eq!(progress, 2);
    }

    #[test]
    fn result_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let make = || {
            vec![
                media(dir.path(), "x.jpg", b"dup"),
                media(dir.path(), "y.jpg", b"dup"),
                media(dir.path(), "z.jpg", b"solo"),
            ]
        };
        let config = config();
        let dedup = Deduplicator::new(&config);

        let first = dedup.deduplicate(make()).unwrap();
        let second = dedup.deduplicate(make()).unwrap();

        assert_eq!(first.canonical, second.canonical);
        assert_eq!(first.discards, second.discards);
    }
}
