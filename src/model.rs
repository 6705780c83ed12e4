use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InsightsError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileModification {
    pub path: String,
    pub added_lines: u32,
    pub deleted_lines: u32,
    pub complexity: Option<u32>,
}

impl FileModification {
    pub fn lines_changed(&self) -> u64 {
        self.added_lines as u64 + self.deleted_lines as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<FileModification>,
}

impl CommitRecord {
    pub fn insertions(&self) -> u64 {
        self.files.iter().map(|f| f.added_lines as u64).sum()
    }

    pub fn deletions(&self) -> u64 {
        self.files.iter().map(|f| f.deleted_lines as u64).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Open,
    Closed,
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrStatus::Open => f.write_str("open"),
            PrStatus::Closed => f.write_str("closed"),
        }
    }
}

/// A pull request as returned by the search endpoint.
///
/// `closed_at` is always `None` for open pull requests. Timestamps the
/// platform sent in an unparseable form are also `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: Option<DateTime<Utc>>,
    pub status: PrStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeRecord {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    pub pr_number: u64,
}

/// Inclusive calendar-day window: `since` 00:00:00 UTC through `until` 23:59:59 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl DateWindow {
    pub fn new(since: NaiveDate, until: NaiveDate) -> Result<Self> {
        if until <= since {
            return Err(InsightsError::InvalidInput(format!(
                "end date ({}) must be after start date ({})",
                until.format(DATE_FORMAT),
                since.format(DATE_FORMAT)
            )));
        }
        Ok(Self { since, until })
    }

    pub fn parse(since: &str, until: &str) -> Result<Self> {
        Self::new(parse_date(since)?, parse_date(until)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.since.and_time(NaiveTime::MIN))
    }

    pub fn end(&self) -> DateTime<Utc> {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&self.until.and_time(last_second))
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        *timestamp >= self.start() && *timestamp <= self.end()
    }

    /// `YYYY-MM-DD..YYYY-MM-DD`, the range syntax of the search API.
    pub fn query_range(&self) -> String {
        format!(
            "{}..{}",
            self.since.format(DATE_FORMAT),
            self.until.format(DATE_FORMAT)
        )
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.since.format(DATE_FORMAT),
            self.until.format(DATE_FORMAT)
        )
    }
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| {
        InsightsError::InvalidInput(format!(
            "invalid date '{input}', expected YYYY-MM-DD"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn window_rejects_end_before_start() {
        assert!(DateWindow::parse("2023-02-08", "2023-02-01").is_err());
        assert!(DateWindow::parse("2023-02-01", "2023-02-01").is_err());
    }

    #[test]
    fn window_rejects_bad_format() {
        let err = DateWindow::parse("02/01/2023", "2023-02-08").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn window_is_inclusive_of_both_days() {
        let window = DateWindow::parse("2023-02-01", "2023-02-08").unwrap();
        let first = Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2023, 2, 8, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2023, 2, 9, 0, 0, 0).unwrap();
        assert!(window.contains(&first));
        assert!(window.contains(&last));
        assert!(!window.contains(&after));
        assert_eq!(window.query_range(), "2023-02-01..2023-02-08");
    }
}
