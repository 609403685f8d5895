//! CSV export of santri progress

use std::io::Write;

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::reports::progress::SantriProgress;
use crate::reports::{ReportError, ReportResult};

#[derive(Serialize)]
struct CsvRow<'a> {
    nis: &'a str,
    name: &'a str,
    class_name: &'a str,
    guru: &'a str,
    completed_kaca: u64,
    rechecked_kaca: u64,
    in_progress_kaca: u64,
    memorized_ayat: u64,
    total_kaca: u64,
    completion_percent: f64,
    active_partials: u64,
    last_activity: String,
}

impl<'a> From<&'a SantriProgress> for CsvRow<'a> {
    fn from(p: &'a SantriProgress) -> Self {
        Self {
            nis: &p.nis,
            name: &p.name,
            class_name: p.class_name.as_deref().unwrap_or(""),
            guru: p.guru_name.as_deref().unwrap_or(""),
            completed_kaca: p.completed_kaca,
            rechecked_kaca: p.rechecked_kaca,
            in_progress_kaca: p.in_progress_kaca,
            memorized_ayat: p.memorized_ayat,
            total_kaca: p.total_kaca,
            completion_percent: p.completion_percent,
            active_partials: p.active_partials,
            last_activity: p
                .last_activity
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

/// Write `rows` as CSV with a header row
pub fn write_progress_csv<W: Write>(rows: &[SantriProgress], writer: W) -> ReportResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record([
            "nis",
            "name",
            "class_name",
            "guru",
            "completed_kaca",
            "rechecked_kaca",
            "in_progress_kaca",
            "memorized_ayat",
            "total_kaca",
            "completion_percent",
            "active_partials",
            "last_activity",
        ])?;
    }
    for row in rows {
        wtr.serialize(CsvRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn progress_csv(rows: &[SantriProgress]) -> ReportResult<String> {
    let mut buf = Vec::new();
    write_progress_csv(rows, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ReportError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SantriProgress {
        SantriProgress {
            santri_id: 1,
            name: "Abdullah, Jr".to_string(),
            nis: "NIS-1".to_string(),
            class_name: Some("7A".to_string()),
            guru_name: None,
            completed_kaca: 2,
            rechecked_kaca: 1,
            in_progress_kaca: 1,
            memorized_ayat: 12,
            total_kaca: 4,
            completion_percent: 50.0,
            active_partials: 0,
            last_activity: Some(0),
        }
    }

    #[test]
    fn test_csv_has_header_and_quotes() {
        let csv = progress_csv(&[row()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "nis,name,class_name,guru,completed_kaca,rechecked_kaca,in_progress_kaca,memorized_ayat,total_kaca,completion_percent,active_partials,last_activity"
        );
        assert_eq!(
            lines.next().unwrap(),
            "NIS-1,\"Abdullah, Jr\",7A,,2,1,1,12,4,50.0,0,1970-01-01T00:00:00+00:00"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let csv = progress_csv(&[]).unwrap();
        assert!(csv.starts_with("nis,name,"));
        assert_eq!(csv.lines().count(), 1);
    }
}
