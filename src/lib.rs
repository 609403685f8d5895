//! # Hafalan
//!
//! Qur'an memorization tracker - a REST backend that records, page by page
//! (kaca), which ayat each student (santri) has memorized.
//!
//! ## Features
//!
//! - **Embedded storage**: a single SQLite file, no external database server
//! - **Ayat locking**: an unfinished partial ayat blocks later ayat on its page
//! - **Recheck workflow**: completed pages wait for a teacher's confirmation
//! - **Reports**: per-student progress, dashboards, monthly trends and CSV export
//!
//! ## Modules
//!
//! - [`storage`]: SQLite store for users, pages, records and partials
//! - [`lock`]: Ayat lock resolver
//! - [`reports`]: Progress aggregation and CSV export
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hafalan::storage::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open(std::path::Path::new("./hafalan.db"))?;
//!
//!     let kaca = store.create_kaca(NewKaca {
//!         page_number: 1,
//!         juz: 1,
//!         surah_name: "Al-Fatihah".to_string(),
//!         ayat_start: 1,
//!         ayat_end: 7,
//!         description: None,
//!     })?;
//!
//!     println!("Kaca {} holds {} ayat", kaca.page_number, kaca.ayat_count());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod lock;
pub mod reports;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    HafalanRecord, HafalanStatus, Kaca, Page, Paged, PartialHafalan, PartialStatus, Role, Santri,
    StorageError, StorageResult, Store, StoreStats, User,
};

pub use lock::{ayat_lock_type, kaca_lock_map, AyatLock, KacaLockMap, LockType};

pub use reports::{Dashboard, MonthlyPoint, ReportError, SantriProgress};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, StorageConfig};
