//! ISO-8601 week keys and period selection over attempt records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;
use crate::model::AttemptRecord;

/// ISO week key (`YYYY-Www`) for a calendar date.
///
/// The date is shifted to the Thursday of its Monday-based week; that
/// Thursday's year owns the week, and the week number is
/// `ceil((days since Jan 1 + 1) / 7)`.
pub fn week_key_for_date(date: NaiveDate) -> String {
    let weekday = date.weekday().number_from_monday() as i64;
    let thursday = date + Duration::days(4 - weekday);
    let week = (thursday.ordinal0() + 1).div_ceil(7);
    format!("{}-W{:02}", thursday.year(), week)
}

/// ISO week key of the UTC calendar date of a timestamp.
pub fn iso_week_key(at: DateTime<Utc>) -> String {
    week_key_for_date(at.date_naive())
}

/// The half-open UTC interval `[start, end)` covered by one ISO week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    /// Monday 00:00 UTC.
    pub start: DateTime<Utc>,
    /// The following Monday 00:00 UTC.
    pub end: DateTime<Utc>,
}

impl WeekRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Parse a `YYYY-Www` key into the interval it covers.
pub fn parse_week_key(key: &str) -> Result<WeekRange, InvalidInput> {
    let malformed = || InvalidInput::MalformedPeriodKey(key.to_string());

    let (year, week) = key.split_once("-W").ok_or_else(malformed)?;
    if year.len() != 4 || week.len() != 2 {
        return Err(malformed());
    }
    if !year.bytes().chain(week.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let year: i32 = year.parse().map_err(|_| malformed())?;
    let week: u32 = week.parse().map_err(|_| malformed())?;

    let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(malformed)?;
    let start = monday.and_time(chrono::NaiveTime::MIN).and_utc();
    Ok(WeekRange {
        start,
        end: start + Duration::days(7),
    })
}

/// Group records into ISO-week buckets keyed by `YYYY-Www`.
///
/// Each bucket is ordered by start time. Keys sort chronologically because
/// they are year-first and zero-padded.
pub fn group_by_iso_week(records: &[AttemptRecord]) -> BTreeMap<String, Vec<&AttemptRecord>> {
    let mut weeks: BTreeMap<String, Vec<&AttemptRecord>> = BTreeMap::new();
    for r in records {
        weeks.entry(iso_week_key(r.start_time)).or_default().push(r);
    }
    for bucket in weeks.values_mut() {
        bucket.sort_by_key(|r| r.start_time);
    }
    weeks
}

/// Which slice of a learner's history a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMode {
    /// The most recent ISO week that has any attempts.
    Weekly,
    /// Every record, unfiltered.
    All,
    /// One named ISO week (`YYYY-Www`).
    Week(String),
}

impl fmt::Display for PeriodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodMode::Weekly => write!(f, "weekly"),
            PeriodMode::All => write!(f, "all"),
            PeriodMode::Week(key) => write!(f, "{key}"),
        }
    }
}

impl FromStr for PeriodMode {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "week" => Ok(PeriodMode::Weekly),
            "all" => Ok(PeriodMode::All),
            other if other.contains("-w") => {
                let key = other.to_uppercase();
                parse_week_key(&key)?;
                Ok(PeriodMode::Week(key))
            }
            _ => Err(InvalidInput::UnknownPeriodMode(s.to_string())),
        }
    }
}

/// The latest week key present in `records`, if any.
pub fn latest_week_key(records: &[AttemptRecord]) -> Option<String> {
    records.iter().map(|r| iso_week_key(r.start_time)).max()
}

/// Select the records a period covers.
///
/// An empty result means "no attempts in range"; it is not an error.
pub fn select_period<'a>(records: &'a [AttemptRecord], mode: &PeriodMode) -> Vec<&'a AttemptRecord> {
    match mode {
        PeriodMode::All => records.iter().collect(),
        PeriodMode::Weekly => group_by_iso_week(records)
            .into_iter()
            .next_back()
            .map(|(_, bucket)| bucket)
            .unwrap_or_default(),
        PeriodMode::Week(key) => {
            let mut selected: Vec<&AttemptRecord> = records
                .iter()
                .filter(|r| iso_week_key(r.start_time) == *key)
                .collect();
            selected.sort_by_key(|r| r.start_time);
            selected
        }
    }
}

/// Records whose start time falls in `[from, to)`, ordered by start time.
pub fn within(
    records: &[AttemptRecord],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<&AttemptRecord> {
    let mut selected: Vec<&AttemptRecord> = records
        .iter()
        .filter(|r| from <= r.start_time && r.start_time < to)
        .collect();
    selected.sort_by_key(|r| r.start_time);
    selected
}
