//! Deployed-version identifiers.
//!
//! A deploy is named `<timestamp>_<short git sha>` where the timestamp is
//! `%Y%m%d%H%M%S`. The fixed-width numeric format means directory names
//! sort lexicographically in deploy order, which `rollback`/`latest`
//! rely on.

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error::VersionError;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Format a timestamp for version ids and backup-directory suffixes.
pub fn timestamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Build a dated and revision-stamped version string.
pub fn version_stamp(now: DateTime<Local>, revision: &str) -> String {
    format!("{}_{}", timestamp(now), revision)
}

/// Split a deploy directory name back into its timestamp and revision.
pub fn parse_version(name: &str) -> Result<(NaiveDateTime, String), VersionError> {
    let (stamp, revision) = name.split_once('_').ok_or_else(|| VersionError::Malformed {
        name: name.to_string(),
    })?;

    if revision.is_empty() {
        return Err(VersionError::Malformed {
            name: name.to_string(),
        });
    }

    let date = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|e| {
        VersionError::BadTimestamp {
            name: name.to_string(),
            message: e.to_string(),
        }
    })?;

    Ok((date, revision.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_version_stamps_are_ordered_and_distinct() {
        let t1 = Local.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let t2 = Local.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let v1 = version_stamp(t1, "abc123");
        let v2 = version_stamp(t2, "abc123");
        assert!(v1 < v2);
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_parse_version_round_trip() {
        let t = Local.with_ymd_and_hms(2023, 6, 15, 12, 30, 45).unwrap();
        let stamp = version_stamp(t, "def456");
        let (date, revision) = parse_version(&stamp).unwrap();
        assert_eq!(date, t.naive_local());
        assert_eq!(revision, "def456");
    }

    #[test]
    fn test_parse_version_rejects_malformed_names() {
        assert!(parse_version("no-separator").is_err());
        assert!(parse_version("20230101000000_").is_err());
        assert!(parse_version("notadate_abc123").is_err());
    }
}
