//! # Timestamp Module
//!
//! Parses capture times out of export filenames.
//!
//! ## Formats (tried in order, first valid match wins)
//! | Name            | Example                       | Precision |
//! |-----------------|-------------------------------|-----------|
//! | `iso-datetime`  | `2023-05-01_12-00-00`         | second    |
//! | `compact-secs`  | `IMG_20230501_120000`         | second    |
//! | `compact-mins`  | `img_20230501_1200`           | minute    |
//! | `date-only`     | `2023-05-01_<uuid>-main`      | day       |
//!
//! Digit groups must not be embedded in longer digit runs, and the parsed
//! fields must form a real calendar date and time. A trailing `Z` or
//! `+hh:mm` (or `+hhmm`) zone marker on `iso-datetime` is kept when it ends
//! the digit run and names a real offset; otherwise it is read as a copy
//! counter and the time stays naive local time.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::SystemTime;

/// Earliest year accepted from a filename
const MIN_YEAR: i32 = 1970;
/// Latest year accepted from a filename
const MAX_YEAR: i32 = 2100;

/// How much of the timestamp was actually encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPrecision {
    Day,
    Minute,
    Second,
}

/// A wall-clock capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Wall-clock time as encoded
    pub local: NaiveDateTime,
    /// Offset east of UTC in seconds, when the source encodes a zone
    pub offset_seconds: Option<i32>,
    pub precision: TimestampPrecision,
}

impl Timestamp {
    /// A naive timestamp with second precision
    pub fn naive(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset_seconds: None,
            precision: TimestampPrecision::Second,
        }
    }

    /// Local wall-clock time of a filesystem timestamp
    pub fn from_system_time(time: SystemTime) -> Self {
        let local: DateTime<Local> = time.into();
        Self::naive(local.naive_local())
    }

    /// Convert to an absolute instant. Naive values are read as local time.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        match self.offset_seconds {
            Some(seconds) => {
                let offset = chrono::FixedOffset::east_opt(seconds)?;
                let dt = offset.from_local_datetime(&self.local).single()?;
                Some(dt.into())
            }
            None => {
                let dt = Local.from_local_datetime(&self.local).earliest()?;
                Some(dt.into())
            }
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%dT%H:%M:%S"))?;
        match self.offset_seconds {
            Some(0) => write!(f, "Z"),
            Some(seconds) => {
                let sign = if seconds < 0 { '-' } else { '+' };
                let abs = seconds.abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
            }
            None => Ok(()),
        }
    }
}

/// A filename timestamp convention
#[derive(Debug)]
pub struct FilenameFormat {
    pub name: &'static str,
    pattern: Regex,
    precision: TimestampPrecision,
}

impl FilenameFormat {
    fn new(name: &'static str, pattern: &str, precision: TimestampPrecision) -> Self {
        Self {
            name,
            // Patterns are fixed literals covered by tests
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad {name} pattern: {e}")),
            precision,
        }
    }

    /// First occurrence in `text` that forms a valid timestamp
    pub fn parse(&self, text: &str) -> Option<Timestamp> {
        let mut start = 0;
        while let Some(caps) = self.pattern.captures_at(text, start) {
            let whole = caps.get(0)?;
            let offset = zone_offset(text, &caps);
            // A rejected zone is read as a counter after a naive time
            let end = match (caps.name("tz"), offset) {
                (Some(tz), None) => tz.start(),
                _ => whole.end(),
            };
            let bounded = !digit_before(text, whole.start()) && !digit_after(text, end);
            if bounded {
                if let Some(timestamp) = self.build(&caps, offset) {
                    return Some(timestamp);
                }
            }
            // Retry one character later so overlapping candidates are seen
            start = whole.start()
                + text[whole.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
        None
    }

    fn build(&self, caps: &Captures<'_>, offset_seconds: Option<i32>) -> Option<Timestamp> {
        let field = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());

        let year = field("y")? as i32;
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(year, field("mo")?, field("d")?)?;
        let time = NaiveTime::from_hms_opt(
            field("h").unwrap_or(0),
            field("mi").unwrap_or(0),
            field("s").unwrap_or(0),
        )?;

        Some(Timestamp {
            local: date.and_time(time),
            offset_seconds,
            precision: self.precision,
        })
    }
}

fn digit_before(text: &str, idx: usize) -> bool {
    text[..idx]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_digit())
}

fn digit_after(text: &str, idx: usize) -> bool {
    text[idx..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Offset of the zone marker, if it ends the digit run and names a real zone
fn zone_offset(text: &str, caps: &Captures<'_>) -> Option<i32> {
    let tz = caps.name("tz")?;
    if digit_after(text, tz.end()) {
        return None;
    }
    parse_offset(tz.as_str())
}

fn parse_offset(marker: &str) -> Option<i32> {
    if marker.eq_ignore_ascii_case("z") {
        return Some(0);
    }
    let sign = if marker.starts_with('-') { -1 } else { 1 };
    let body = marker.get(1..)?;
    let (hours, minutes) = match body.split_once(':') {
        Some(parts) => parts,
        None => (body.get(..2)?, body.get(2..)?),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    // Real zones sit on the hour, half hour or quarter hour
    if hours > 14 || !matches!(minutes, 0 | 15 | 30 | 45) {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// The built-in formats in evaluation order
pub fn filename_formats() -> &'static [FilenameFormat] {
    static FORMATS: OnceLock<Vec<FilenameFormat>> = OnceLock::new();
    FORMATS.get_or_init(|| {
        vec![
            FilenameFormat::new(
                "iso-datetime",
                r"(?P<y>\d{4})-(?P<mo>\d{2})-(?P<d>\d{2})[ _T](?P<h>\d{2})[-:.](?P<mi>\d{2})[-:.](?P<s>\d{2})(?P<tz>[Zz]|[+-]\d{2}:?\d{2})?",
                TimestampPrecision::Second,
            ),
            FilenameFormat::new(
                "compact-secs",
                r"(?P<y>\d{4})(?P<mo>\d{2})(?P<d>\d{2})[_-]?(?P<h>\d{2})(?P<mi>\d{2})(?P<s>\d{2})",
                TimestampPrecision::Second,
            ),
            FilenameFormat::new(
                "compact-mins",
                r"(?P<y>\d{4})(?P<mo>\d{2})(?P<d>\d{2})[_-](?P<h>\d{2})(?P<mi>\d{2})",
                TimestampPrecision::Minute,
            ),
            FilenameFormat::new(
                "date-only",
                r"(?P<y>\d{4})[-_.](?P<mo>\d{2})[-_.](?P<d>\d{2})",
                TimestampPrecision::Day,
            ),
        ]
    })
}

/// Parse a capture time from a filename (the extension is ignored)
pub fn parse_filename(filename: &str) -> Option<Timestamp> {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    filename_formats().iter().find_map(|format| format.parse(stem))
}
