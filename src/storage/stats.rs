//! Store-wide counters for the dashboard

use serde::Serialize;

use crate::storage::error::StorageResult;
use crate::storage::store::{Store, WhereClause};
use crate::storage::types::{HafalanStatus, Role};

/// Row counts across the store
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoreStats {
    pub users_by_role: Vec<(Role, u64)>,
    pub total_users: u64,
    pub total_kaca: u64,
    pub hafalan_by_status: Vec<(HafalanStatus, u64)>,
    pub active_partials: u64,
}

impl StoreStats {
    pub fn users_with_role(&self, role: Role) -> u64 {
        self.users_by_role
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn hafalan_with_status(&self, status: HafalanStatus) -> u64 {
        self.hafalan_by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

impl Store {
    pub fn count_kaca(&self) -> StorageResult<u64> {
        self.with_conn(|conn| WhereClause::new().count(conn, "kaca"))
    }

    pub fn stats(&self) -> StorageResult<StoreStats> {
        let users_by_role = self.count_users_by_role()?;
        let total_users = users_by_role.iter().map(|(_, n)| n).sum();

        Ok(StoreStats {
            users_by_role,
            total_users,
            total_kaca: self.count_kaca()?,
            hafalan_by_status: self.count_hafalan_by_status()?,
            active_partials: self.count_active_partials()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{new_partial, seed_guru, seed_kaca, seed_santri, seed_wali};
    use crate::storage::HafalanInput;

    #[test]
    fn test_empty_store_stats() {
        let store = Store::open_in_memory().unwrap();
        let stats = store.stats().unwrap();

        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.total_kaca, 0);
        assert_eq!(stats.active_partials, 0);
        assert_eq!(stats.users_by_role.len(), 4);
        assert_eq!(stats.hafalan_by_status.len(), 3);
    }

    #[test]
    fn test_stats_counts() {
        let store = Store::open_in_memory().unwrap();
        let guru = seed_guru(&store, "Ustadz Hamid");
        seed_wali(&store, "Pak Salman");
        let santri = seed_santri(&store, "Abdullah", "NIS-1", Some(guru.id), None);
        let k1 = seed_kaca(&store, 1, 1, 2);
        let k2 = seed_kaca(&store, 2, 1, 5);

        store
            .upsert_hafalan(HafalanInput {
                santri_id: santri.id,
                kaca_id: k1.id,
                guru_id: Some(guru.id),
                completed_verses: vec![1, 2],
                notes: None,
            })
            .unwrap();
        store.create_partial(new_partial(santri.id, k2.id, 1)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.users_with_role(Role::Santri), 1);
        assert_eq!(stats.users_with_role(Role::Admin), 0);
        assert_eq!(stats.total_kaca, 2);
        assert_eq!(
            stats.hafalan_with_status(HafalanStatus::CompleteWaitingRecheck),
            1
        );
        assert_eq!(stats.active_partials, 1);
    }
}
