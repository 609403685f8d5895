//! Admin dashboard

use serde::Serialize;

use crate::reports::progress::SantriProgress;
use crate::storage::{StorageResult, Store, StoreStats};

/// Number of students listed on the dashboard by default
pub const DEFAULT_TOP_SANTRI: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: StoreStats,
    pub top_santri: Vec<SantriProgress>,
}

/// The `n` students furthest along: completion, then memorized ayat, then name
pub fn top_santri(mut rows: Vec<SantriProgress>, n: usize) -> Vec<SantriProgress> {
    rows.sort_by(|a, b| {
        b.completion_percent
            .total_cmp(&a.completion_percent)
            .then(b.memorized_ayat.cmp(&a.memorized_ayat))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(n);
    rows
}

impl Store {
    pub fn dashboard(&self, top: usize) -> StorageResult<Dashboard> {
        let stats = self.stats()?;
        let rows = self.progress_rows(None)?;
        Ok(Dashboard {
            stats,
            top_santri: top_santri(rows, top),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{seed_kaca, seed_santri};
    use crate::storage::HafalanInput;

    fn row(name: &str, percent: f64, ayat: u64) -> SantriProgress {
        SantriProgress {
            santri_id: 0,
            name: name.to_string(),
            nis: String::new(),
            class_name: None,
            guru_name: None,
            completed_kaca: 0,
            rechecked_kaca: 0,
            in_progress_kaca: 0,
            memorized_ayat: ayat,
            total_kaca: 0,
            completion_percent: percent,
            active_partials: 0,
            last_activity: None,
        }
    }

    #[test]
    fn test_top_santri_ordering() {
        let rows = vec![
            row("Chalid", 10.0, 4),
            row("Bariq", 50.0, 2),
            row("Abdullah", 10.0, 9),
            row("Dawud", 10.0, 4),
        ];
        let names: Vec<String> = top_santri(rows, 3).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Bariq", "Abdullah", "Chalid"]);
    }

    #[test]
    fn test_dashboard() {
        let store = Store::open_in_memory().unwrap();
        let a = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        seed_santri(&store, "Bariq", "NIS-2", None, None);
        let kaca = seed_kaca(&store, 1, 1, 2);
        store
            .upsert_hafalan(HafalanInput {
                santri_id: a.id,
                kaca_id: kaca.id,
                guru_id: None,
                completed_verses: vec![1, 2],
                notes: None,
            })
            .unwrap();

        let dashboard = store.dashboard(1).unwrap();
        assert_eq!(dashboard.stats.total_users, 2);
        assert_eq!(dashboard.top_santri.len(), 1);
        assert_eq!(dashboard.top_santri[0].santri_id, a.id);
        assert_eq!(dashboard.top_santri[0].completion_percent, 100.0);
    }
}
