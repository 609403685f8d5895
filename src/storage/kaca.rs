//! Kaca (mushaf page) catalogue

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::hafalan::{records_for_kaca, save_record};
use crate::storage::store::{now_millis, Store, WhereClause};
use crate::storage::types::{validate_kaca_fields, Kaca, KacaUpdate, NewKaca, Page, Paged};

const KACA_COLUMNS: &str =
    "k.id, k.page_number, k.juz, k.surah_name, k.ayat_start, k.ayat_end, k.description, k.created_at, k.updated_at";

fn kaca_from_row(row: &Row<'_>) -> rusqlite::Result<Kaca> {
    Ok(Kaca {
        id: row.get(0)?,
        page_number: row.get(1)?,
        juz: row.get(2)?,
        surah_name: row.get(3)?,
        ayat_start: row.get(4)?,
        ayat_end: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub(crate) fn load_kaca(conn: &Connection, id: i64) -> StorageResult<Kaca> {
    conn.query_row(
        &format!("SELECT {} FROM kaca k WHERE k.id = ?", KACA_COLUMNS),
        params![id],
        kaca_from_row,
    )
    .optional()?
    .ok_or_else(|| StorageError::NotFound(format!("Kaca {}", id)))
}

impl Store {
    pub fn create_kaca(&self, kaca: NewKaca) -> StorageResult<Kaca> {
        kaca.validate()?;
        self.with_tx(|tx| {
            let now = now_millis();
            tx.execute(
                "INSERT INTO kaca (page_number, juz, surah_name, ayat_start, ayat_end, description, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    kaca.page_number,
                    kaca.juz,
                    kaca.surah_name,
                    kaca.ayat_start,
                    kaca.ayat_end,
                    kaca.description,
                    now,
                    now
                ],
            )?;
            let id = tx.last_insert_rowid();
            tracing::debug!(kaca_id = id, page = kaca.page_number, "Inserted kaca");
            load_kaca(tx, id)
        })
    }

    pub fn get_kaca(&self, id: i64) -> StorageResult<Kaca> {
        self.with_conn(|conn| load_kaca(conn, id))
    }

    /// Pages ordered by page number, optionally within one juz
    pub fn list_kaca(&self, juz: Option<u32>, page: Page) -> StorageResult<Paged<Kaca>> {
        let mut w = WhereClause::new();
        if let Some(juz) = juz {
            w.push("k.juz = ?", juz);
        }

        self.with_conn(|conn| {
            let total = w.count(conn, "kaca k")?;
            let sql = format!(
                "SELECT {} FROM kaca k{} ORDER BY k.page_number LIMIT ? OFFSET ?",
                KACA_COLUMNS,
                w.sql()
            );
            let args = w.paged_args(page.limit, page.offset());
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params_from_iter(args.iter()), kaca_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Paged {
                items,
                total,
                page: page.page,
                limit: page.limit,
            })
        })
    }

    /// The whole catalogue, ordered by page number
    pub fn all_kaca(&self) -> StorageResult<Vec<Kaca>> {
        self.list_kaca(None, Page::all()).map(|p| p.items)
    }

    /// Update a page. Shrinking the ayat range is refused while recorded
    /// verses or partials fall outside the new range; records whose coverage
    /// changes with the range get their status recomputed.
    pub fn update_kaca(&self, id: i64, update: KacaUpdate) -> StorageResult<Kaca> {
        self.with_tx(|tx| {
            let mut kaca = load_kaca(tx, id)?;
            if let Some(v) = update.page_number {
                kaca.page_number = v;
            }
            if let Some(v) = update.juz {
                kaca.juz = v;
            }
            if let Some(v) = &update.surah_name {
                kaca.surah_name = v.clone();
            }
            if let Some(v) = update.ayat_start {
                kaca.ayat_start = v;
            }
            if let Some(v) = update.ayat_end {
                kaca.ayat_end = v;
            }
            if let Some(v) = &update.description {
                kaca.description = Some(v.clone()).filter(|d| !d.is_empty());
            }
            validate_kaca_fields(
                kaca.page_number,
                kaca.juz,
                &kaca.surah_name,
                kaca.ayat_start,
                kaca.ayat_end,
            )?;

            let outside: i64 = tx.query_row(
                "SELECT COUNT(*) FROM partial_hafalan
                 WHERE kaca_id = ? AND (ayat_number < ? OR ayat_number > ?)",
                params![id, kaca.ayat_start, kaca.ayat_end],
                |row| row.get(0),
            )?;
            let records = records_for_kaca(tx, id)?;
            let verses_outside = records
                .iter()
                .any(|r| r.completed_verses.iter().any(|a| !kaca.contains_ayat(*a)));
            if outside > 0 || verses_outside {
                return Err(StorageError::InvalidState(format!(
                    "Kaca {} has recorded ayat outside {}..={}",
                    id, kaca.ayat_start, kaca.ayat_end
                )));
            }

            kaca.updated_at = now_millis();
            tx.execute(
                "UPDATE kaca SET page_number = ?, juz = ?, surah_name = ?, ayat_start = ?, ayat_end = ?,
                 description = ?, updated_at = ? WHERE id = ?",
                params![
                    kaca.page_number,
                    kaca.juz,
                    kaca.surah_name,
                    kaca.ayat_start,
                    kaca.ayat_end,
                    kaca.description,
                    kaca.updated_at,
                    id
                ],
            )?;

            // Coverage depends on the range, so existing statuses are recomputed
            for mut record in records {
                let previous = record.status;
                let verses = record.completed_verses.clone();
                record.apply_verses(&kaca, verses, kaca.updated_at);
                if record.status != previous {
                    save_record(tx, &record)?;
                    tracing::debug!(
                        hafalan_id = record.id,
                        kaca_id = id,
                        from = %previous,
                        to = %record.status,
                        "Recomputed hafalan status after kaca range change"
                    );
                }
            }
            Ok(kaca)
        })
    }

    /// Delete a page; refused (constraint) while hafalan rows reference it
    pub fn delete_kaca(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM kaca WHERE id = ?", params![id])?;
            if deleted == 0 {
                return Err(StorageError::NotFound(format!("Kaca {}", id)));
            }
            tracing::debug!(kaca_id = id, "Deleted kaca");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{new_kaca, seed_kaca, seed_santri};
    use crate::storage::{HafalanInput, HafalanStatus};

    #[test]
    fn test_create_and_get_kaca() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 1, 1, 7);

        assert_eq!(kaca.page_number, 1);
        assert_eq!(kaca.ayat_count(), 7);
        assert_eq!(store.get_kaca(kaca.id).unwrap(), kaca);
    }

    #[test]
    fn test_invalid_kaca_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.create_kaca(new_kaca(2, 10, 5)),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_page_is_constraint() {
        let store = Store::open_in_memory().unwrap();
        seed_kaca(&store, 5, 1, 5);
        assert!(matches!(
            store.create_kaca(new_kaca(5, 6, 10)),
            Err(StorageError::Constraint(_))
        ));
    }

    #[test]
    fn test_list_kaca_ordered_and_filtered() {
        let store = Store::open_in_memory().unwrap();
        seed_kaca(&store, 3, 16, 24);
        seed_kaca(&store, 1, 1, 7);
        seed_kaca(&store, 2, 1, 5);
        let mut juz2 = new_kaca(22, 142, 145);
        juz2.juz = 2;
        store.create_kaca(juz2).unwrap();

        let all = store.all_kaca().unwrap();
        let pages: Vec<u32> = all.iter().map(|k| k.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3, 22]);

        let juz1 = store.list_kaca(Some(1), Page::new(Some(1), Some(2), 50)).unwrap();
        assert_eq!(juz1.total, 3);
        assert_eq!(juz1.items.len(), 2);
    }

    #[test]
    fn test_update_kaca() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 5);

        let updated = store
            .update_kaca(
                kaca.id,
                KacaUpdate {
                    ayat_end: Some(6),
                    description: Some("Opening of Al-Baqarah".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.ayat_end, 6);
        assert_eq!(updated.description.as_deref(), Some("Opening of Al-Baqarah"));
    }

    #[test]
    fn test_shrinking_range_below_recorded_verse_is_refused() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 5);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        store
            .upsert_hafalan(HafalanInput {
                santri_id: santri.id,
                kaca_id: kaca.id,
                guru_id: None,
                completed_verses: vec![1, 5],
                notes: None,
            })
            .unwrap();

        let err = store
            .update_kaca(
                kaca.id,
                KacaUpdate {
                    ayat_end: Some(4),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidState(_)));
    }

    #[test]
    fn test_widening_range_reopens_complete_records() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 3);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        let record = store
            .upsert_hafalan(HafalanInput {
                santri_id: santri.id,
                kaca_id: kaca.id,
                guru_id: None,
                completed_verses: vec![1, 2, 3],
                notes: None,
            })
            .unwrap();
        assert_eq!(record.status, HafalanStatus::CompleteWaitingRecheck);
        store.recheck_hafalan(record.id, None).unwrap();

        store
            .update_kaca(
                kaca.id,
                KacaUpdate {
                    ayat_end: Some(10),
                    ..Default::default()
                },
            )
            .unwrap();

        let reopened = store.get_hafalan(record.id).unwrap();
        assert_eq!(reopened.status, HafalanStatus::Progress);
        assert_eq!(reopened.completed_verses, vec![1, 2, 3]);
        assert_eq!(reopened.completed_at, None);
        assert_eq!(reopened.rechecked_at, None);
        assert_eq!(reopened.rechecked_by, None);
    }

    #[test]
    fn test_narrowing_range_completes_covered_records() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 5);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        let record = store
            .upsert_hafalan(HafalanInput {
                santri_id: santri.id,
                kaca_id: kaca.id,
                guru_id: None,
                completed_verses: vec![1, 2, 3, 4],
                notes: None,
            })
            .unwrap();
        assert_eq!(record.status, HafalanStatus::Progress);

        store
            .update_kaca(
                kaca.id,
                KacaUpdate {
                    ayat_end: Some(4),
                    ..Default::default()
                },
            )
            .unwrap();

        let completed = store.get_hafalan(record.id).unwrap();
        assert_eq!(completed.status, HafalanStatus::CompleteWaitingRecheck);
        assert!(completed.completed_at.is_some());
    }

    #[test]
    fn test_ayat_end_beyond_longest_surah_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.create_kaca(new_kaca(2, 1, 4_000_000_000)),
            Err(StorageError::Validation(_))
        ));

        let kaca = seed_kaca(&store, 2, 1, 5);
        assert!(matches!(
            store.update_kaca(
                kaca.id,
                KacaUpdate {
                    ayat_end: Some(287),
                    ..Default::default()
                },
            ),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_referenced_kaca_is_constraint() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 5);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        store
            .upsert_hafalan(HafalanInput {
                santri_id: santri.id,
                kaca_id: kaca.id,
                guru_id: None,
                completed_verses: vec![1],
                notes: None,
            })
            .unwrap();

        assert!(matches!(
            store.delete_kaca(kaca.id),
            Err(StorageError::Constraint(_))
        ));

        let unused = seed_kaca(&store, 3, 6, 10);
        store.delete_kaca(unused.id).unwrap();
        assert!(matches!(
            store.delete_kaca(unused.id),
            Err(StorageError::NotFound(_))
        ));
    }
}
