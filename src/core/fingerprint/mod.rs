//! # Fingerprint Module
//!
//! Content digests used as the deduplication key.
//!
//! Files are streamed through xxh3-128 in fixed-size chunks, so peak memory
//! is one chunk per worker regardless of file size. Large videos can be
//! sampled: only a prefix of `sample_threshold` bytes is hashed, and the
//! full size is folded into the fingerprint so differently sized files never
//! collide on a shared prefix.

use crate::core::config::CompiledConfig;
use crate::error::HashError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

/// Content-derived digest of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentFingerprint {
    /// xxh3-128 of the hashed bytes
    pub digest: u128,
    /// Size of the file when it was hashed
    pub size_bytes: u64,
    /// Whether only a prefix was hashed
    pub sampled: bool,
}

impl ContentFingerprint {
    /// Get the fingerprint as a hexadecimal string
    pub fn to_hex(&self) -> String {
        format!("{:032x}", self.digest)
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())?;
        if self.sampled {
            write!(f, " (sampled, {} bytes)", self.size_bytes)?;
        }
        Ok(())
    }
}

/// Streaming content hasher
#[derive(Debug, Clone)]
pub struct FingerprintHasher {
    chunk_size: usize,
    sample_threshold: u64,
}

impl FingerprintHasher {
    /// Create a hasher reading `chunk_size` bytes at a time
    pub fn new(chunk_size: usize, sample_threshold: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            sample_threshold,
        }
    }

    /// Create a hasher from the compiled configuration
    pub fn from_config(config: &CompiledConfig) -> Self {
        Self::new(config.hash_chunk_size, config.hash_sample_threshold)
    }

    /// Fingerprint the file at `path`.
    ///
    /// When `allow_sampling` is set and the file is larger than the sample
    /// threshold, only the prefix is hashed.
    pub fn fingerprint(
        &self,
        path: &Path,
        allow_sampling: bool,
    ) -> Result<ContentFingerprint, HashError> {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        let size_bytes = file.metadata().map_err(|e| io_error(path, e))?.len();

        let sampled = allow_sampling && size_bytes > self.sample_threshold;
        let limit = if sampled { self.sample_threshold } else { u64::MAX };

        let mut reader = file.take(limit);
        let mut hasher = Xxh3::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_error(path, e)),
            };
            hasher.update(&buffer[..read]);
        }

        if sampled {
            hasher.update(&size_bytes.to_le_bytes());
        }

        Ok(ContentFingerprint {
            digest: hasher.digest128(),
            size_bytes,
            sampled,
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> HashError {
    if source.kind() == ErrorKind::NotFound {
        HashError::Missing {
            path: path.to_path_buf(),
        }
    } else {
        HashError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
