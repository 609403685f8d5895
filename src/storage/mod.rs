//! Hafalan Store
//!
//! SQLite persistence for the memorization tracker:
//!
//! - **types**: Rows and enums (User, Guru, Santri, Kaca, HafalanRecord, PartialHafalan)
//! - **store**: Connection handling, schema, transaction helpers
//! - **users / guru / santri**: People and their profiles
//! - **kaca**: The mushaf page catalogue
//! - **hafalan**: Completed-ayat checklists and the recheck flow
//! - **partial**: Partial hafalan and ayat locks
//! - **stats**: Dashboard counters
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use hafalan::storage::{HafalanInput, NewKaca, Store};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open(std::path::Path::new("./data/hafalan.db"))?;
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
//!     store.upsert_hafalan(HafalanInput {
//!         santri_id: 1,
//!         kaca_id: kaca.id,
//!         guru_id: None,
//!         completed_verses: vec![1, 2, 3],
//!         notes: None,
//!     })?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
mod guru;
mod hafalan;
mod kaca;
mod partial;
mod santri;
mod stats;
mod store;
pub mod types;
mod users;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{StorageError, StorageResult};
pub use stats::StoreStats;
pub use store::Store;
pub use types::*;
