//! Pure helpers: input validation, date cursors, log formatting.
//!
//! Nothing in here prompts or touches the network, so everything is
//! unit-testable without a terminal.

use crate::error::ValidationError;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Date format used for user input and in page URLs.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

static URL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}/\d{2}/\d{2})/?$").expect("static regex"));

/// Parse a `yyyy/mm/dd` string.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::DateFormat(s.trim().to_string()))
}

/// Parse `s` and check `lower <= date <= upper`.
///
/// # Errors
///
/// [`ValidationError::DateFormat`] when `s` is not `yyyy/mm/dd`,
/// [`ValidationError::DateOutOfRange`] when it falls outside the bounds.
pub fn validate_date(s: &str, lower: NaiveDate, upper: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let date = parse_date(s)?;
    if date < lower || date > upper {
        return Err(ValidationError::DateOutOfRange {
            input: s.trim().to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
        });
    }
    Ok(date)
}

/// Move `date` off the excluded weekday by one day.
///
/// Only applies to the initial cursor; the chain itself never links to the
/// excluded day.
pub fn skip_weekday(date: NaiveDate, excluded: Weekday) -> NaiveDate {
    if date.weekday() == excluded {
        info!(%date, weekday = ?excluded, "Start date falls on an excluded day; starting the next day");
        next_day(date)
    } else {
        date
    }
}

/// `date` plus one day, saturating at the calendar maximum.
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Date embedded at the end of a URL as `yyyy/mm/dd`, with or without a
/// trailing slash.
pub fn date_from_url(url: &str) -> Option<NaiveDate> {
    let caps = URL_DATE.captures(url)?;
    NaiveDate::parse_from_str(&caps[1], DATE_FORMAT).ok()
}

/// Cursor part of a catalog label: everything before the first `_`.
///
/// `20230101_clinical.zip` gives `20230101`.
pub fn cursor_from_label(label: &str) -> Option<&str> {
    let head = label.trim().split('_').next()?;
    (!head.is_empty()).then_some(head)
}

/// Check that `path` is an existing, writable directory.
///
/// Writability is tested by creating and removing a scratch file, since
/// permission bits alone do not account for read-only mounts.
///
/// # Returns
///
/// The path, unchanged, ready to use as a storage root.
///
/// # Errors
///
/// [`ValidationError::FolderNotFound`], [`ValidationError::NotADirectory`]
/// or [`ValidationError::NotWritable`].
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn validate_folder(path: impl AsRef<Path>) -> Result<PathBuf, ValidationError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(ValidationError::Empty);
    }
    let meta = stdfs::metadata(path).map_err(|_| ValidationError::FolderNotFound(path.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(ValidationError::NotADirectory(path.to_path_buf()));
    }
    let scratch = path.join("..__write_check__");
    match stdfs::File::create(&scratch) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch);
            info!("Output directory is writable");
            Ok(path.to_path_buf())
        }
        Err(e) => Err(ValidationError::NotWritable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backing off to a char boundary) with
/// `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_validate_date_in_range() {
        let got = validate_date("2011/05/08", d(2001, 10, 29), d(2024, 1, 1)).unwrap();
        assert_eq!(got, d(2011, 5, 8));
    }

    #[test]
    fn test_validate_date_bounds_inclusive() {
        assert!(validate_date("2001/10/29", d(2001, 10, 29), d(2024, 1, 1)).is_ok());
        assert!(validate_date("2024/01/01", d(2001, 10, 29), d(2024, 1, 1)).is_ok());
    }

    #[test]
    fn test_validate_date_out_of_range() {
        let err = validate_date("2001/10/28", d(2001, 10, 29), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ValidationError::DateOutOfRange { .. }));
        let err = validate_date("2024/01/02", d(2001, 10, 29), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ValidationError::DateOutOfRange { .. }));
    }

    #[test]
    fn test_validate_date_bad_format() {
        for bad in ["2011-05-08", "05/08/2011", "2011/13/01", "", "tomorrow"] {
            let err = validate_date(bad, d(2001, 10, 29), d(2024, 1, 1)).unwrap_err();
            assert!(matches!(err, ValidationError::DateFormat(_)), "{bad}");
        }
    }

    #[test]
    fn test_skip_sunday() {
        // 2018-10-14 was a Sunday.
        assert_eq!(skip_weekday(d(2018, 10, 14), Weekday::Sun), d(2018, 10, 15));
        assert_eq!(skip_weekday(d(2018, 10, 13), Weekday::Sun), d(2018, 10, 13));
    }

    #[test]
    fn test_date_from_url() {
        let url = "https://www.puzzlesociety.com/daily-commuter/2011/05/09";
        assert_eq!(date_from_url(url), Some(d(2011, 5, 9)));
        assert_eq!(date_from_url(&format!("{url}/")), Some(d(2011, 5, 9)));
        assert_eq!(date_from_url("https://www.puzzlesociety.com/daily-commuter"), None);
        assert_eq!(date_from_url("https://x/2011/02/30"), None);
    }

    #[test]
    fn test_cursor_from_label() {
        assert_eq!(cursor_from_label("20230101_clinical.zip"), Some("20230101"));
        assert_eq!(cursor_from_label("  20230101_a_b.zip "), Some("20230101"));
        assert_eq!(cursor_from_label("plain.zip"), Some("plain.zip"));
        assert_eq!(cursor_from_label("_x.zip"), None);
    }

    #[test]
    fn test_validate_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(validate_folder(dir.path()).unwrap(), dir.path());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());

        let missing = dir.path().join("missing");
        assert!(matches!(validate_folder(&missing), Err(ValidationError::FolderNotFound(_))));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(validate_folder(&file), Err(ValidationError::NotADirectory(_))));

        assert_eq!(validate_folder(""), Err(ValidationError::Empty));
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_char_boundary() {
        let result = truncate_for_log("ééé", 3);
        assert!(result.starts_with('é'));
    }
}
