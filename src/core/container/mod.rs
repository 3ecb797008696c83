//! # Container Module
//!
//! Reads the track layout of ISO base media files (`.mp4`, `.mov`, ...).
//!
//! Exports wrap some voice memos in a video container with no picture, so
//! the extension alone cannot tell a clip from a recording. Only the `moov`
//! header is parsed; sample data is skipped.

use mp4::{Mp4Reader, TrackType};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Extensions whose files are ISO base media containers
const ISO_BMFF_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "3gp"];

/// Whether files with `extension` (lowercase, no dot) are worth inspecting
pub fn is_iso_bmff_extension(extension: &str) -> bool {
    ISO_BMFF_EXTENSIONS.contains(&extension)
}

/// Whether the container at `path` carries a video track.
///
/// `None` when the file cannot be opened or its header does not parse.
pub fn has_video_track(path: &Path) -> Option<bool> {
    let file = File::open(path).ok()?;
    let size = file.metadata().ok()?.len();
    let reader = BufReader::new(file);

    let mp4 = match Mp4Reader::read_header(reader, size) {
        Ok(mp4) => mp4,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "container header unreadable");
            return None;
        }
    };

    let video = mp4
        .tracks()
        .values()
        .any(|track| matches!(track.track_type(), Ok(TrackType::Video)));
    Some(video)
}
