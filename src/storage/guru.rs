//! Teacher (guru) profiles and their santri assignments

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::santri::load_santri_where;
use crate::storage::store::{Store, WhereClause};
use crate::storage::types::{Guru, GuruUpdate, NewGuru, NewUser, Page, Paged, Role, Santri};
use crate::storage::users::{apply_user_update, insert_user, user_from_row, USER_COLUMNS};

const GURU_SELECT: &str = "SELECT g.id, g.nip,
        (SELECT COUNT(*) FROM santri_profiles s WHERE s.guru_id = g.id)";

const GURU_FROM: &str = "guru_profiles g JOIN users u ON u.id = g.user_id";

fn guru_from_row(row: &Row<'_>) -> rusqlite::Result<Guru> {
    Ok(Guru {
        id: row.get(0)?,
        nip: row.get(1)?,
        santri_count: row.get(2)?,
        user: user_from_row(row, 3)?,
    })
}

pub(crate) fn load_guru(conn: &Connection, id: i64) -> StorageResult<Guru> {
    conn.query_row(
        &format!("{}, {} FROM {} WHERE g.id = ?", GURU_SELECT, USER_COLUMNS, GURU_FROM),
        params![id],
        guru_from_row,
    )
    .optional()?
    .ok_or_else(|| StorageError::NotFound(format!("Guru {}", id)))
}

pub(crate) fn ensure_guru_exists(conn: &Connection, id: i64) -> StorageResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM guru_profiles WHERE id = ?",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| StorageError::NotFound(format!("Guru {}", id)))
}

fn user_id_of_guru(conn: &Connection, id: i64) -> StorageResult<i64> {
    conn.query_row(
        "SELECT user_id FROM guru_profiles WHERE id = ?",
        params![id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StorageError::NotFound(format!("Guru {}", id)))
}

impl Store {
    /// Create a teacher: the user row and its profile in one transaction
    pub fn create_guru(&self, guru: NewGuru) -> StorageResult<Guru> {
        self.with_tx(|tx| {
            let user_id = insert_user(
                tx,
                &NewUser {
                    name: guru.name.clone(),
                    email: guru.email.clone(),
                    role: Role::Guru,
                    phone: guru.phone.clone(),
                },
            )?;
            tx.execute(
                "INSERT INTO guru_profiles (user_id, nip) VALUES (?, ?)",
                params![user_id, guru.nip],
            )?;
            let id = tx.last_insert_rowid();
            tracing::debug!(guru_id = id, user_id, "Inserted guru");
            load_guru(tx, id)
        })
    }

    pub fn get_guru(&self, id: i64) -> StorageResult<Guru> {
        self.with_conn(|conn| load_guru(conn, id))
    }

    pub fn list_gurus(&self, search: Option<&str>, page: Page) -> StorageResult<Paged<Guru>> {
        let mut w = WhereClause::new();
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            w.push_repeated(
                "(LOWER(u.name) LIKE ? OR LOWER(COALESCE(g.nip, '')) LIKE ?)",
                pattern,
                2,
            );
        }

        self.with_conn(|conn| {
            let total = w.count(conn, GURU_FROM)?;
            let sql = format!(
                "{}, {} FROM {}{} ORDER BY u.name, g.id LIMIT ? OFFSET ?",
                GURU_SELECT,
                USER_COLUMNS,
                GURU_FROM,
                w.sql()
            );
            let args = w.paged_args(page.limit, page.offset());
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params_from_iter(args.iter()), guru_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Paged {
                items,
                total,
                page: page.page,
                limit: page.limit,
            })
        })
    }

    pub fn update_guru(&self, id: i64, update: GuruUpdate) -> StorageResult<Guru> {
        self.with_tx(|tx| {
            let user_id = user_id_of_guru(tx, id)?;
            apply_user_update(tx, user_id, &update.user)?;
            if let Some(nip) = &update.nip {
                let nip = if nip.is_empty() { None } else { Some(nip) };
                tx.execute(
                    "UPDATE guru_profiles SET nip = ? WHERE id = ?",
                    params![nip, id],
                )?;
            }
            load_guru(tx, id)
        })
    }

    /// Delete a teacher; their santri become unassigned
    pub fn delete_guru(&self, id: i64) -> StorageResult<()> {
        self.with_tx(|tx| {
            let user_id = user_id_of_guru(tx, id)?;
            tx.execute("DELETE FROM users WHERE id = ?", params![user_id])?;
            tracing::debug!(guru_id = id, user_id, "Deleted guru");
            Ok(())
        })
    }

    /// Santri currently assigned to a teacher
    pub fn guru_santri(&self, id: i64) -> StorageResult<Vec<Santri>> {
        self.with_conn(|conn| {
            ensure_guru_exists(conn, id)?;
            let mut w = WhereClause::new();
            w.push("s.guru_id = ?", id);
            load_santri_where(conn, w)
        })
    }

    /// Replace the set of santri assigned to a teacher.
    ///
    /// Santri missing from `santri_ids` lose the assignment; listed santri
    /// move to this teacher even if another teacher had them.
    pub fn assign_santri(&self, id: i64, santri_ids: &[i64]) -> StorageResult<Vec<Santri>> {
        self.with_tx(|tx| {
            ensure_guru_exists(tx, id)?;

            for santri_id in santri_ids {
                let found: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM santri_profiles WHERE id = ?",
                        params![santri_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if found.is_none() {
                    return Err(StorageError::NotFound(format!("Santri {}", santri_id)));
                }
            }

            tx.execute(
                "UPDATE santri_profiles SET guru_id = NULL WHERE guru_id = ?",
                params![id],
            )?;
            {
                let mut stmt =
                    tx.prepare_cached("UPDATE santri_profiles SET guru_id = ? WHERE id = ?")?;
                for santri_id in santri_ids {
                    stmt.execute(params![id, santri_id])?;
                }
            }

            tracing::info!(guru_id = id, assigned = santri_ids.len(), "Reassigned santri");

            let mut w = WhereClause::new();
            w.push("s.guru_id = ?", id);
            load_santri_where(tx, w)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{seed_guru, seed_santri};

    #[test]
    fn test_create_and_get_guru() {
        let store = Store::open_in_memory().unwrap();
        let guru = seed_guru(&store, "Ustadz Hamid");

        assert_eq!(guru.user.role, Role::Guru);
        assert_eq!(guru.santri_count, 0);
        assert_eq!(store.get_guru(guru.id).unwrap(), guru);
    }

    #[test]
    fn test_update_guru() {
        let store = Store::open_in_memory().unwrap();
        let guru = seed_guru(&store, "Ustadz Hamid");

        let updated = store
            .update_guru(
                guru.id,
                GuruUpdate {
                    nip: Some("NIP-77".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.nip.as_deref(), Some("NIP-77"));
        assert_eq!(updated.user.name, "Ustadz Hamid");
    }

    #[test]
    fn test_list_gurus_counts_santri() {
        let store = Store::open_in_memory().unwrap();
        let a = seed_guru(&store, "Ustadz Ahmad");
        seed_guru(&store, "Ustadz Yusuf");
        seed_santri(&store, "Santri One", "S-1", Some(a.id), None);
        seed_santri(&store, "Santri Two", "S-2", Some(a.id), None);

        let page = store.list_gurus(None, Page::default()).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, a.id);
        assert_eq!(page.items[0].santri_count, 2);
        assert_eq!(page.items[1].santri_count, 0);

        let found = store.list_gurus(Some("yusuf"), Page::default()).unwrap();
        assert_eq!(found.total, 1);
    }

    #[test]
    fn test_assign_santri_replaces_set() {
        let store = Store::open_in_memory().unwrap();
        let a = seed_guru(&store, "Ustadz Ahmad");
        let b = seed_guru(&store, "Ustadz Yusuf");
        let s1 = seed_santri(&store, "Santri One", "S-1", Some(a.id), None);
        let s2 = seed_santri(&store, "Santri Two", "S-2", Some(b.id), None);
        let s3 = seed_santri(&store, "Santri Three", "S-3", None, None);

        let assigned = store.assign_santri(a.id, &[s2.id, s3.id]).unwrap();
        let ids: Vec<i64> = assigned.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&s2.id));
        assert!(ids.contains(&s3.id));

        assert_eq!(store.get_santri(s1.id).unwrap().guru_id, None);
        assert!(store.guru_santri(b.id).unwrap().is_empty());
    }

    #[test]
    fn test_assign_unknown_santri_rolls_back() {
        let store = Store::open_in_memory().unwrap();
        let a = seed_guru(&store, "Ustadz Ahmad");
        let s1 = seed_santri(&store, "Santri One", "S-1", Some(a.id), None);

        let err = store.assign_santri(a.id, &[999]).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(store.get_santri(s1.id).unwrap().guru_id, Some(a.id));
    }

    #[test]
    fn test_delete_guru_unassigns_santri() {
        let store = Store::open_in_memory().unwrap();
        let a = seed_guru(&store, "Ustadz Ahmad");
        let s1 = seed_santri(&store, "Santri One", "S-1", Some(a.id), None);

        store.delete_guru(a.id).unwrap();
        assert!(matches!(store.get_guru(a.id), Err(StorageError::NotFound(_))));
        assert!(matches!(
            store.get_user(a.user.id),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(store.get_santri(s1.id).unwrap().guru_id, None);
    }
}
