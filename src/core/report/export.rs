//! Export functionality for reconciliation plans.
//!
//! Supports CSV for spreadsheets and JSON for tooling.

use crate::core::media::{Discard, DiscardReason, MediaItem};
use serde::Serialize;
use std::io::Write;

/// Export items and discards to CSV format
///
/// CSV columns: Action, Category, Capture Time, Time Source, Path, Overlay Path,
/// Size (bytes), Flags, Detail
pub fn export_csv<W: Write>(
    items: &[MediaItem],
    discards: &[Discard],
    mut writer: W,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "Action,Category,Capture Time,Time Source,Path,Overlay Path,Size (bytes),Flags,Detail"
    )?;

    for item in items {
        let capture_time = item
            .capture_time
            .map(|t| t.to_string())
            .unwrap_or_default();
        let time_source = item
            .time_source
            .map(|s| format!("{:?}", s))
            .unwrap_or_default();
        let overlay = item
            .overlay
            .as_ref()
            .map(|o| o.path.display().to_string())
            .unwrap_or_default();
        let flags = item
            .flags
            .iter()
            .map(|f| format!("{:?}", f))
            .collect::<Vec<_>>()
            .join(";");

        writeln!(
            writer,
            "keep,{},{},{},{},{},{},{},",
            csv_field(&item.category.to_string()),
            capture_time,
            time_source,
            csv_field(&item.base.path.display().to_string()),
            csv_field(&overlay),
            item.size_bytes(),
            flags
        )?;
    }

    for discard in discards {
        let detail = match &discard.reason {
            DiscardReason::Duplicate { canonical } => {
                format!("duplicate of {}", canonical.display())
            }
            DiscardReason::Thumbnail => "thumbnail".to_string(),
        };

        writeln!(
            writer,
            "discard,,,,{},,{},,{}",
            csv_field(&discard.path.display().to_string()),
            discard.size_bytes,
            csv_field(&detail)
        )?;
    }

    Ok(())
}

/// Export any serializable report value as pretty JSON
pub fn export_json<T: Serialize, W: Write>(value: &T, mut writer: W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)
}

/// Quote a field if it contains separators or quotes
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
