//! Display decoration for fetched records: relative date buckets, time and
//! size labels, and grouping by bucket.

use crate::prelude::*;

use crate::base::record::TransferRecord;
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::fmt;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Relative age of a record, counted in started 24-hour windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "bucket", content = "value", rename_all = "snake_case")]
pub enum DateBucket {
    Today,
    Yesterday,
    /// Between 2 and 6 days ago inclusive.
    DaysAgo(u32),
    Date(NaiveDate),
}

impl DateBucket {
    /// Bucket `created_at` relative to `now`. The distance is absolute, so
    /// records stamped slightly ahead of a skewed local clock still land in
    /// `Today`.
    pub fn classify(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let diff_ms = (now - created_at).num_milliseconds().unsigned_abs();
        let days = diff_ms.div_ceil(MILLIS_PER_DAY as u64);
        match days {
            0 | 1 => DateBucket::Today,
            2 => DateBucket::Yesterday,
            3..=7 => DateBucket::DaysAgo((days - 1) as u32),
            _ => DateBucket::Date(created_at.date_naive()),
        }
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBucket::Today => f.write_str("Today"),
            DateBucket::Yesterday => f.write_str("Yesterday"),
            DateBucket::DaysAgo(n) => write!(f, "{n} days ago"),
            DateBucket::Date(date) => write!(f, "{}", date.format("%d/%m/%Y")),
        }
    }
}

pub fn format_file_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecoratedRecord {
    #[serde(flatten)]
    pub record: TransferRecord,
    pub bucket: DateBucket,
    pub date_label: String,
    pub time_label: String,
    /// Present for binary kinds only.
    pub size_label: Option<String>,
}

impl DecoratedRecord {
    pub fn new(record: TransferRecord, now: DateTime<Utc>) -> Self {
        let bucket = DateBucket::classify(record.created_at, now);
        Self {
            date_label: bucket.to_string(),
            time_label: format_time(record.created_at),
            size_label: record.file_size().map(format_file_size),
            bucket,
            record,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateGroup {
    pub label: String,
    pub records: Vec<DecoratedRecord>,
}

/// Decorate and group records by date label.
///
/// Groups appear in order of their first record and each group keeps input
/// order, so newest-first input stays newest-first across and within groups.
pub fn group_by_date(records: Vec<TransferRecord>, now: DateTime<Utc>) -> Vec<DateGroup> {
    let mut groups: IndexMap<String, Vec<DecoratedRecord>> = IndexMap::new();
    for record in records {
        let decorated = DecoratedRecord::new(record, now);
        groups
            .entry(decorated.date_label.clone())
            .or_default()
            .push(decorated);
    }
    groups
        .into_iter()
        .map(|(label, records)| DateGroup { label, records })
        .collect()
}
