//! Completions per calendar month (UTC)

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use crate::storage::{HafalanRecord, PartialHafalan, PartialStatus, StorageResult, Store};

pub const DEFAULT_MONTHS: u32 = 6;
pub const MAX_MONTHS: u32 = 36;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyPoint {
    /// YYYY-MM
    pub month: String,
    pub kaca_completed: u64,
    pub partials_completed: u64,
}

/// Months since year 0, so consecutive months differ by one
fn month_index(year: i32, month0: u32) -> i64 {
    year as i64 * 12 + month0 as i64
}

fn index_of_millis(ms: i64) -> Option<i64> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| month_index(dt.year(), dt.month0()))
}

fn label(index: i64) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

/// Completions for the `months` calendar months ending with the month of
/// `now`, oldest first. Months without activity are present with zeros.
pub fn monthly_trend(
    records: &[HafalanRecord],
    partials: &[PartialHafalan],
    months: u32,
    now: DateTime<Utc>,
) -> Vec<MonthlyPoint> {
    let months = months.clamp(1, MAX_MONTHS) as i64;
    let last = month_index(now.year(), now.month0());
    let first = last - months + 1;

    let mut points: Vec<MonthlyPoint> = (first..=last)
        .map(|i| MonthlyPoint {
            month: label(i),
            kaca_completed: 0,
            partials_completed: 0,
        })
        .collect();

    let slot = |ms: i64| -> Option<usize> {
        let i = index_of_millis(ms)?;
        (first..=last).contains(&i).then(|| (i - first) as usize)
    };

    for record in records.iter().filter(|r| r.status.is_complete()) {
        if let Some(i) = record.completed_at.and_then(slot) {
            points[i].kaca_completed += 1;
        }
    }
    for partial in partials
        .iter()
        .filter(|p| p.status == PartialStatus::Completed)
    {
        if let Some(i) = partial.completed_at.and_then(slot) {
            points[i].partials_completed += 1;
        }
    }

    points
}

impl Store {
    pub fn monthly_report(&self, months: u32) -> StorageResult<Vec<MonthlyPoint>> {
        let records = self.all_hafalan()?;
        let partials = self.all_partials()?;
        Ok(monthly_trend(&records, &partials, months, Utc::now()))
    }
}
