//! Embedded capture dates.
//!
//! EXIF `DateTimeOriginal` is typically found in JPEG, TIFF and HEIF
//! files. Export tools often strip it, so a miss is normal, not an error.

use crate::core::timestamp::Timestamp;
use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read the original capture time embedded in a photo file
pub fn read_capture_time(path: &Path) -> Option<Timestamp> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(&file);
    let exif_reader = Reader::new().read_from_container(&mut bufreader).ok()?;

    let field = exif_reader.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    // EXIF date format: "YYYY:MM:DD HH:MM:SS"
    let raw = get_string_value(&field.value)?;
    let local = NaiveDateTime::parse_from_str(&raw, "%Y:%m:%d %H:%M:%S").ok()?;

    let mut timestamp = Timestamp::naive(local);
    timestamp.offset_seconds = exif_reader
        .get_field(Tag::OffsetTimeOriginal, In::PRIMARY)
        .and_then(|f| get_string_value(&f.value))
        .and_then(|s| parse_exif_offset(&s));
    Some(timestamp)
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

/// Parse an EXIF offset string such as `+02:00`
fn parse_exif_offset(raw: &str) -> Option<i32> {
    let sign = match raw.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let (hours, minutes) = raw.get(1..)?.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::TempDir;

    /// Minimal JPEG whose only segment is an EXIF block with DateTimeOriginal
    pub(crate) fn jpeg_with_date(date: &str) -> Vec<u8> {
        assert_eq!(date.len(), 19);
        let mut tiff: Vec<u8> = vec![0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
        // IFD0: one entry pointing at the Exif IFD at offset 26
        tiff.extend_from_slice(&[0x00, 0x01]);
        tiff.extend_from_slice(&[0x87, 0x69, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x1A]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        // Exif IFD: DateTimeOriginal, 20 ASCII bytes at offset 44
        tiff.extend_from_slice(&[0x00, 0x01]);
        tiff.extend_from_slice(&[0x90, 0x03, 0x00, 0x02, 0x00, 0x00, 0x00, 0x14]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x2C]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        tiff.extend_from_slice(date.as_bytes());
        tiff.push(0);

        let segment_len = (2 + 6 + tiff.len()) as u16;
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    #[test]
    fn reads_date_time_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beach.jpg");
        File::create(&path)
            .unwrap()
            .write_all(&jpeg_with_date("2019:08:15 09:30:00"))
            .unwrap();

        let timestamp = read_capture_time(&path).unwrap();

        assert_eq!(
            timestamp.local,
            NaiveDate::from_ymd_opt(2019, 8, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        );
        assert_eq!(timestamp.offset_seconds, None);
    }

    #[test]
    fn file_without_exif_has_no_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.jpg");
        File::create(&path).unwrap().write_all(b"not a jpeg").unwrap();

        assert!(read_capture_time(&path).is_none());
    }

    #[test]
    fn nonexistent_file_has_no_date() {
        assert!(read_capture_time(Path::new("/nonexistent/file.jpg")).is_none());
    }

    #[test]
    fn exif_offsets() {
        assert_eq!(parse_exif_offset("+02:00"), Some(7200));
        assert_eq!(parse_exif_offset("-03:30"), Some(-12600));
        assert_eq!(parse_exif_offset("   :  "), None);
    }
}
