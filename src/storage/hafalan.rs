//! Hafalan records: a student's completed-ayat checklist per kaca

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::lock::ayat_lock_type;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::guru::ensure_guru_exists;
use crate::storage::kaca::load_kaca;
use crate::storage::partial::active_partials;
use crate::storage::santri::ensure_santri_exists;
use crate::storage::store::{now_millis, Store, WhereClause};
use crate::storage::types::{
    HafalanFilter, HafalanInput, HafalanRecord, HafalanStatus, Kaca, Page, Paged,
};

const RECORD_COLUMNS: &str = "h.id, h.santri_id, h.kaca_id, h.guru_id, h.status, h.completed_verses,
        h.notes, h.completed_at, h.rechecked_at, h.rechecked_by, h.created_at, h.updated_at";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HafalanRecord> {
    let verses: String = row.get(5)?;
    let completed_verses = serde_json::from_str(&verses).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(HafalanRecord {
        id: row.get(0)?,
        santri_id: row.get(1)?,
        kaca_id: row.get(2)?,
        guru_id: row.get(3)?,
        status: row.get(4)?,
        completed_verses,
        notes: row.get(6)?,
        completed_at: row.get(7)?,
        rechecked_at: row.get(8)?,
        rechecked_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn query_records(conn: &Connection, w: WhereClause, page: Page) -> StorageResult<Vec<HafalanRecord>> {
    let sql = format!(
        "SELECT {} FROM hafalan_records h{} ORDER BY h.updated_at DESC, h.id DESC LIMIT ? OFFSET ?",
        RECORD_COLUMNS,
        w.sql()
    );
    let args = w.paged_args(page.limit, page.offset());
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn load_record(conn: &Connection, id: i64) -> StorageResult<HafalanRecord> {
    let mut w = WhereClause::new();
    w.push("h.id = ?", id);
    query_records(conn, w, Page::all())?
        .into_iter()
        .next()
        .ok_or_else(|| StorageError::NotFound(format!("Hafalan {}", id)))
}

pub(crate) fn find_record(
    conn: &Connection,
    santri_id: i64,
    kaca_id: i64,
) -> StorageResult<Option<HafalanRecord>> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM hafalan_records WHERE santri_id = ? AND kaca_id = ?",
            params![santri_id, kaca_id],
            |row| row.get(0),
        )
        .optional()?;
    id.map(|id| load_record(conn, id)).transpose()
}

pub(crate) fn records_for_kaca(conn: &Connection, kaca_id: i64) -> StorageResult<Vec<HafalanRecord>> {
    let mut w = WhereClause::new();
    w.push("h.kaca_id = ?", kaca_id);
    query_records(conn, w, Page::all())
}

/// Insert `record` when its id is 0, otherwise overwrite it. Returns the id.
pub(crate) fn save_record(conn: &Connection, record: &HafalanRecord) -> StorageResult<i64> {
    let verses = serde_json::to_string(&record.completed_verses)?;
    if record.id == 0 {
        conn.execute(
            "INSERT INTO hafalan_records (santri_id, kaca_id, guru_id, status, completed_verses, notes,
                completed_at, rechecked_at, rechecked_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.santri_id,
                record.kaca_id,
                record.guru_id,
                record.status,
                verses,
                record.notes,
                record.completed_at,
                record.rechecked_at,
                record.rechecked_by,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(conn.last_insert_rowid())
    } else {
        conn.execute(
            "UPDATE hafalan_records SET guru_id = ?, status = ?, completed_verses = ?, notes = ?,
                completed_at = ?, rechecked_at = ?, rechecked_by = ?, updated_at = ?
             WHERE id = ?",
            params![
                record.guru_id,
                record.status,
                verses,
                record.notes,
                record.completed_at,
                record.rechecked_at,
                record.rechecked_by,
                record.updated_at,
                record.id
            ],
        )?;
        Ok(record.id)
    }
}

fn validate_verses(kaca: &Kaca, verses: &[u32]) -> StorageResult<()> {
    if let Some(bad) = verses.iter().find(|a| !kaca.contains_ayat(**a)) {
        return Err(StorageError::Validation(format!(
            "Ayat {} is outside kaca {} ({}..={})",
            bad, kaca.page_number, kaca.ayat_start, kaca.ayat_end
        )));
    }
    Ok(())
}

impl Store {
    /// Record the completed-ayat checklist of a student for one kaca.
    ///
    /// Ayat newly added to the checklist must not be locked by a partial
    /// hafalan; ayat already on the record stay regardless.
    pub fn upsert_hafalan(&self, input: HafalanInput) -> StorageResult<HafalanRecord> {
        self.with_tx(|tx| {
            let kaca = load_kaca(tx, input.kaca_id)?;
            ensure_santri_exists(tx, input.santri_id)?;
            if let Some(guru_id) = input.guru_id {
                ensure_guru_exists(tx, guru_id)?;
            }
            validate_verses(&kaca, &input.completed_verses)?;

            let now = now_millis();
            let mut record = find_record(tx, input.santri_id, input.kaca_id)?
                .unwrap_or_else(|| HafalanRecord::empty(input.santri_id, input.kaca_id, now));

            let partials = active_partials(tx, input.santri_id, input.kaca_id)?;
            for ayat in &input.completed_verses {
                if record.has_verse(*ayat) {
                    continue;
                }
                if let Some(lock) = ayat_lock_type(&partials, kaca.id, *ayat) {
                    return Err(StorageError::AyatLocked { ayat: *ayat, lock });
                }
            }

            if input.guru_id.is_some() {
                record.guru_id = input.guru_id;
            }
            if input.notes.is_some() {
                record.notes = input.notes.clone();
            }
            record.apply_verses(&kaca, input.completed_verses.clone(), now);

            let id = save_record(tx, &record)?;
            tracing::debug!(
                hafalan_id = id,
                santri_id = input.santri_id,
                kaca_id = input.kaca_id,
                status = %record.status,
                verses = record.completed_verses.len(),
                "Saved hafalan record"
            );
            load_record(tx, id)
        })
    }

    pub fn get_hafalan(&self, id: i64) -> StorageResult<HafalanRecord> {
        self.with_conn(|conn| load_record(conn, id))
    }

    /// Records, most recently updated first
    pub fn list_hafalan(
        &self,
        filter: &HafalanFilter,
        page: Page,
    ) -> StorageResult<Paged<HafalanRecord>> {
        let mut w = WhereClause::new();
        if let Some(santri_id) = filter.santri_id {
            w.push("h.santri_id = ?", santri_id);
        }
        if let Some(kaca_id) = filter.kaca_id {
            w.push("h.kaca_id = ?", kaca_id);
        }
        if let Some(status) = filter.status {
            w.push("h.status = ?", status);
        }

        self.with_conn(|conn| {
            let total = w.count(conn, "hafalan_records h")?;
            let items = query_records(conn, w, page)?;
            Ok(Paged {
                items,
                total,
                page: page.page,
                limit: page.limit,
            })
        })
    }

    /// Every record, unpaginated (reports)
    pub fn all_hafalan(&self) -> StorageResult<Vec<HafalanRecord>> {
        self.with_conn(|conn| query_records(conn, WhereClause::new(), Page::all()))
    }

    /// A teacher confirms a fully memorized page
    pub fn recheck_hafalan(&self, id: i64, guru_id: Option<i64>) -> StorageResult<HafalanRecord> {
        self.with_tx(|tx| {
            if let Some(g) = guru_id {
                ensure_guru_exists(tx, g)?;
            }
            let mut record = load_record(tx, id)?;
            record.recheck(guru_id, now_millis())?;
            save_record(tx, &record)?;
            tracing::info!(hafalan_id = id, guru_id = ?guru_id, "Rechecked hafalan");
            Ok(record)
        })
    }

    pub fn delete_hafalan(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM hafalan_records WHERE id = ?", params![id])?;
            if deleted == 0 {
                return Err(StorageError::NotFound(format!("Hafalan {}", id)));
            }
            Ok(())
        })
    }

    /// Number of records per status, every status present
    pub fn count_hafalan_by_status(&self) -> StorageResult<Vec<(HafalanStatus, u64)>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM hafalan_records GROUP BY status")?;
            let counted = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, HafalanStatus>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(HafalanStatus::all()
                .iter()
                .map(|status| {
                    let n = counted
                        .iter()
                        .find(|(s, _)| s == status)
                        .map(|(_, n)| *n as u64)
                        .unwrap_or(0);
                    (*status, n)
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockType;
    use crate::storage::test_support::{new_partial, seed_guru, seed_kaca, seed_santri};

    fn input(santri_id: i64, kaca_id: i64, verses: Vec<u32>) -> HafalanInput {
        HafalanInput {
            santri_id,
            kaca_id,
            guru_id: None,
            completed_verses: verses,
            notes: None,
        }
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 5);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);

        let first = store.upsert_hafalan(input(santri.id, kaca.id, vec![2, 1])).unwrap();
        assert_eq!(first.completed_verses, vec![1, 2]);
        assert_eq!(first.status, HafalanStatus::Progress);

        let second = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![1, 2, 3, 4, 5]))
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, HafalanStatus::CompleteWaitingRecheck);
        assert!(second.completed_at.is_some());

        let page = store.list_hafalan(&HafalanFilter::default(), Page::default()).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_out_of_range_verse_rejected() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 5);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);

        let err = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![6]))
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_locked_verses_rejected() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 7);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        store.create_partial(new_partial(santri.id, kaca.id, 3)).unwrap();

        let err = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![1, 3]))
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::AyatLocked {
                ayat: 3,
                lock: LockType::Partial
            }
        ));

        let err = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![1, 2, 6]))
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::AyatLocked {
                ayat: 6,
                lock: LockType::Sequential
            }
        ));

        // Ayat below the partial are free
        let ok = store.upsert_hafalan(input(santri.id, kaca.id, vec![1, 2])).unwrap();
        assert_eq!(ok.completed_verses, vec![1, 2]);
    }

    #[test]
    fn test_partials_of_other_santri_do_not_lock() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 2, 1, 7);
        let a = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        let b = seed_santri(&store, "Bariq", "NIS-2", None, None);
        store.create_partial(new_partial(a.id, kaca.id, 2)).unwrap();

        let record = store.upsert_hafalan(input(b.id, kaca.id, vec![1, 2, 3])).unwrap();
        assert_eq!(record.completed_verses, vec![1, 2, 3]);
    }

    #[test]
    fn test_recheck_flow() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 1, 1, 3);
        let guru = seed_guru(&store, "Ustadz Hamid");
        let santri = seed_santri(&store, "Abdullah", "NIS-1", Some(guru.id), None);

        let partial = store.upsert_hafalan(input(santri.id, kaca.id, vec![1])).unwrap();
        assert!(matches!(
            store.recheck_hafalan(partial.id, Some(guru.id)),
            Err(StorageError::InvalidState(_))
        ));

        let full = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![1, 2, 3]))
            .unwrap();
        let rechecked = store.recheck_hafalan(full.id, Some(guru.id)).unwrap();
        assert_eq!(rechecked.status, HafalanStatus::Rechecked);
        assert_eq!(rechecked.rechecked_by, Some(guru.id));
        assert_eq!(store.get_hafalan(full.id).unwrap(), rechecked);

        let counts = store.count_hafalan_by_status().unwrap();
        assert!(counts.contains(&(HafalanStatus::Rechecked, 1)));
        assert!(counts.contains(&(HafalanStatus::Progress, 0)));
    }

    #[test]
    fn test_dropping_verse_from_rechecked_record_reopens_it() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 1, 1, 3);
        let guru = seed_guru(&store, "Ustadz Hamid");
        let santri = seed_santri(&store, "Abdullah", "NIS-1", Some(guru.id), None);

        let full = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![1, 2, 3]))
            .unwrap();
        store.recheck_hafalan(full.id, Some(guru.id)).unwrap();

        // Re-saving the same checklist keeps the confirmation
        let same = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![3, 2, 1]))
            .unwrap();
        assert_eq!(same.status, HafalanStatus::Rechecked);
        assert_eq!(same.rechecked_by, Some(guru.id));

        let reopened = store
            .upsert_hafalan(input(santri.id, kaca.id, vec![1, 3]))
            .unwrap();
        assert_eq!(reopened.id, full.id);
        assert_eq!(reopened.status, HafalanStatus::Progress);
        assert_eq!(reopened.completed_verses, vec![1, 3]);
        assert_eq!(reopened.completed_at, None);
        assert_eq!(reopened.rechecked_at, None);
        assert_eq!(reopened.rechecked_by, None);
        assert_eq!(store.get_hafalan(full.id).unwrap(), reopened);
    }

    #[test]
    fn test_delete_hafalan() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 1, 1, 3);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        let record = store.upsert_hafalan(input(santri.id, kaca.id, vec![1])).unwrap();

        store.delete_hafalan(record.id).unwrap();
        assert!(matches!(
            store.get_hafalan(record.id),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_deleting_santri_cascades_records() {
        let store = Store::open_in_memory().unwrap();
        let kaca = seed_kaca(&store, 1, 1, 3);
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);
        store.upsert_hafalan(input(santri.id, kaca.id, vec![1])).unwrap();

        store.delete_santri(santri.id).unwrap();
        assert!(store.all_hafalan().unwrap().is_empty());
    }
}
