//! Progress Reports
//!
//! Read-only rollups over the store:
//!
//! - **progress**: Per-santri progress, guru and wali rollups
//! - **dashboard**: Store counters plus the leading students
//! - **monthly**: Completions per calendar month
//! - **export**: CSV rendering of progress rows
//!
//! The computations are pure functions over loaded rows; the `Store`
//! methods here only load and delegate.

pub mod dashboard;
pub mod export;
pub mod monthly;
pub mod progress;

pub use dashboard::{Dashboard, DEFAULT_TOP_SANTRI};
pub use export::{progress_csv, write_progress_csv};
pub use monthly::{monthly_trend, MonthlyPoint, DEFAULT_MONTHS, MAX_MONTHS};
pub use progress::{progress_for, santri_progress, GuruReport, SantriProgress, WaliReport};

use crate::storage::StorageError;

/// Errors that can occur while building a report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type ReportResult<T> = Result<T, ReportError>;
