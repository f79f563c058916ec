//! Modification times recovered from file names
//!
//! The site prefixes uploaded file names with the Unix time of the upload.
//! When that prefix is plausible it becomes the file's mtime.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::fs::{File, FileTimes};
use std::path::Path;
use std::time::SystemTime;

/// Earliest year accepted for a recovered timestamp
const MIN_YEAR: i32 = 2000;

/// Number of digits in the timestamp prefix
const PREFIX_DIGITS: usize = 10;

/// Recovers the upload time encoded in a file name
///
/// Returns `None` unless the name starts with exactly 10 digits that decode
/// to a time between the year 2000 and `now`.
pub fn recover_timestamp(filename: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let digits = filename.bytes().take_while(u8::is_ascii_digit).count();
    if digits != PREFIX_DIGITS {
        return None;
    }

    let seconds: i64 = filename[..PREFIX_DIGITS].parse().ok()?;
    let timestamp = Utc.timestamp_opt(seconds, 0).single()?;

    if timestamp.year() < MIN_YEAR {
        tracing::debug!("Ignoring timestamp {} in {}: too old", timestamp, filename);
        return None;
    }
    if timestamp > now {
        tracing::debug!("Ignoring timestamp {} in {}: in the future", timestamp, filename);
        return None;
    }

    Some(timestamp)
}

/// Sets the access and modification time of `path`
pub fn apply_timestamp(path: &Path, timestamp: DateTime<Utc>) -> std::io::Result<()> {
    let time = SystemTime::from(timestamp);
    let file = File::options().write(true).open(path)?;
    file.set_times(FileTimes::new().set_accessed(time).set_modified(time))
}
