//! Partial hafalan: sub-ayat progress that holds back the rest of a kaca

use rusqlite::{params, params_from_iter, Connection, Row};

use crate::lock::{ayat_lock_type, kaca_lock_map, KacaLockMap};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::guru::ensure_guru_exists;
use crate::storage::hafalan::{find_record, load_record, save_record};
use crate::storage::kaca::load_kaca;
use crate::storage::santri::ensure_santri_exists;
use crate::storage::store::{now_millis, Store, WhereClause};
use crate::storage::types::{
    validate_partial_percentage, HafalanRecord, NewPartial, Page, Paged, PartialFilter,
    PartialHafalan, PartialStatus,
};

const PARTIAL_COLUMNS: &str = "p.id, p.santri_id, p.kaca_id, p.ayat_number, p.progress, p.percentage,
        p.status, p.guru_id, p.created_at, p.updated_at, p.completed_at";

fn partial_from_row(row: &Row<'_>) -> rusqlite::Result<PartialHafalan> {
    Ok(PartialHafalan {
        id: row.get(0)?,
        santri_id: row.get(1)?,
        kaca_id: row.get(2)?,
        ayat_number: row.get(3)?,
        progress: row.get(4)?,
        percentage: row.get(5)?,
        status: row.get(6)?,
        guru_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

fn query_partials(
    conn: &Connection,
    w: WhereClause,
    page: Page,
) -> StorageResult<Vec<PartialHafalan>> {
    let sql = format!(
        "SELECT {} FROM partial_hafalan p{} ORDER BY p.kaca_id, p.ayat_number, p.id LIMIT ? OFFSET ?",
        PARTIAL_COLUMNS,
        w.sql()
    );
    let args = w.paged_args(page.limit, page.offset());
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), partial_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn load_partial(conn: &Connection, id: i64) -> StorageResult<PartialHafalan> {
    let mut w = WhereClause::new();
    w.push("p.id = ?", id);
    query_partials(conn, w, Page::all())?
        .into_iter()
        .next()
        .ok_or_else(|| StorageError::NotFound(format!("Partial hafalan {}", id)))
}

fn save_partial(conn: &Connection, p: &PartialHafalan) -> StorageResult<()> {
    conn.execute(
        "UPDATE partial_hafalan SET progress = ?, percentage = ?, status = ?, updated_at = ?,
            completed_at = ? WHERE id = ?",
        params![
            p.progress,
            p.percentage,
            p.status,
            p.updated_at,
            p.completed_at,
            p.id
        ],
    )?;
    Ok(())
}

/// In-progress partials of one student on one kaca
pub(crate) fn active_partials(
    conn: &Connection,
    santri_id: i64,
    kaca_id: i64,
) -> StorageResult<Vec<PartialHafalan>> {
    let mut w = WhereClause::new();
    w.push("p.santri_id = ?", santri_id);
    w.push("p.kaca_id = ?", kaca_id);
    w.push("p.status = ?", PartialStatus::InProgress);
    query_partials(conn, w, Page::all())
}

impl Store {
    /// Start a partial on an ayat that is in range, not yet memorized and
    /// not locked by another partial
    pub fn create_partial(&self, partial: NewPartial) -> StorageResult<PartialHafalan> {
        validate_partial_percentage(partial.percentage)?;

        self.with_tx(|tx| {
            ensure_santri_exists(tx, partial.santri_id)?;
            let kaca = load_kaca(tx, partial.kaca_id)?;
            if let Some(guru_id) = partial.guru_id {
                ensure_guru_exists(tx, guru_id)?;
            }

            let ayat = partial.ayat_number;
            if !kaca.contains_ayat(ayat) {
                return Err(StorageError::Validation(format!(
                    "Ayat {} is outside kaca {} ({}..={})",
                    ayat, kaca.page_number, kaca.ayat_start, kaca.ayat_end
                )));
            }

            if let Some(record) = find_record(tx, partial.santri_id, kaca.id)? {
                if record.has_verse(ayat) {
                    return Err(StorageError::InvalidState(format!(
                        "Ayat {} is already memorized",
                        ayat
                    )));
                }
            }

            let partials = active_partials(tx, partial.santri_id, kaca.id)?;
            if let Some(lock) = ayat_lock_type(&partials, kaca.id, ayat) {
                return Err(StorageError::AyatLocked { ayat, lock });
            }

            let now = now_millis();
            tx.execute(
                "INSERT INTO partial_hafalan (santri_id, kaca_id, ayat_number, progress, percentage,
                    status, guru_id, created_at, updated_at, completed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)",
                params![
                    partial.santri_id,
                    partial.kaca_id,
                    ayat,
                    partial.progress,
                    partial.percentage,
                    PartialStatus::InProgress,
                    partial.guru_id,
                    now,
                    now
                ],
            )?;
            let id = tx.last_insert_rowid();
            tracing::debug!(
                partial_id = id,
                santri_id = partial.santri_id,
                kaca_id = partial.kaca_id,
                ayat,
                "Started partial hafalan"
            );
            load_partial(tx, id)
        })
    }

    pub fn get_partial(&self, id: i64) -> StorageResult<PartialHafalan> {
        self.with_conn(|conn| load_partial(conn, id))
    }

    pub fn list_partials(
        &self,
        filter: &PartialFilter,
        page: Page,
    ) -> StorageResult<Paged<PartialHafalan>> {
        let mut w = WhereClause::new();
        if let Some(santri_id) = filter.santri_id {
            w.push("p.santri_id = ?", santri_id);
        }
        if let Some(kaca_id) = filter.kaca_id {
            w.push("p.kaca_id = ?", kaca_id);
        }
        if let Some(status) = filter.status {
            w.push("p.status = ?", status);
        }

        self.with_conn(|conn| {
            let total = w.count(conn, "partial_hafalan p")?;
            let items = query_partials(conn, w, page)?;
            Ok(Paged {
                items,
                total,
                page: page.page,
                limit: page.limit,
            })
        })
    }

    /// Every partial, unpaginated (reports)
    pub fn all_partials(&self) -> StorageResult<Vec<PartialHafalan>> {
        self.with_conn(|conn| query_partials(conn, WhereClause::new(), Page::all()))
    }

    pub fn update_partial(
        &self,
        id: i64,
        progress: Option<String>,
        percentage: Option<u8>,
    ) -> StorageResult<PartialHafalan> {
        self.with_tx(|tx| {
            let mut partial = load_partial(tx, id)?;
            partial.update_progress(progress, percentage, now_millis())?;
            save_partial(tx, &partial)?;
            Ok(partial)
        })
    }

    /// Finish a partial and add its ayat to the student's record for the
    /// kaca, creating the record when needed
    pub fn complete_partial(&self, id: i64) -> StorageResult<(PartialHafalan, HafalanRecord)> {
        self.with_tx(|tx| {
            let now = now_millis();
            let mut partial = load_partial(tx, id)?;
            partial.complete(now)?;
            save_partial(tx, &partial)?;

            let kaca = load_kaca(tx, partial.kaca_id)?;
            let mut record = find_record(tx, partial.santri_id, partial.kaca_id)?
                .unwrap_or_else(|| HafalanRecord::empty(partial.santri_id, partial.kaca_id, now));
            if record.guru_id.is_none() {
                record.guru_id = partial.guru_id;
            }
            let mut verses = record.completed_verses.clone();
            verses.push(partial.ayat_number);
            record.apply_verses(&kaca, verses, now);
            let record_id = save_record(tx, &record)?;

            tracing::info!(
                partial_id = id,
                hafalan_id = record_id,
                ayat = partial.ayat_number,
                status = %record.status,
                "Completed partial hafalan"
            );
            Ok((partial, load_record(tx, record_id)?))
        })
    }

    pub fn cancel_partial(&self, id: i64) -> StorageResult<PartialHafalan> {
        self.with_tx(|tx| {
            let mut partial = load_partial(tx, id)?;
            partial.cancel(now_millis())?;
            save_partial(tx, &partial)?;
            tracing::debug!(partial_id = id, "Cancelled partial hafalan");
            Ok(partial)
        })
    }

    pub fn delete_partial(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM partial_hafalan WHERE id = ?", params![id])?;
            if deleted == 0 {
                return Err(StorageError::NotFound(format!("Partial hafalan {}", id)));
            }
            Ok(())
        })
    }

    /// Lock state of every ayat on a kaca for one student
    pub fn ayat_locks(&self, santri_id: i64, kaca_id: i64) -> StorageResult<KacaLockMap> {
        self.with_conn(|conn| {
            ensure_santri_exists(conn, santri_id)?;
            let kaca = load_kaca(conn, kaca_id)?;
            let partials = active_partials(conn, santri_id, kaca_id)?;
            let verses = find_record(conn, santri_id, kaca_id)?
                .map(|r| r.completed_verses)
                .unwrap_or_default();
            Ok(kaca_lock_map(&partials, &kaca, &verses))
        })
    }

    pub fn count_active_partials(&self) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let mut w = WhereClause::new();
            w.push("status = ?", PartialStatus::InProgress);
            w.count(conn, "partial_hafalan")
        })
    }
}
