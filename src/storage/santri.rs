//! Student (santri) profiles

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::guru::ensure_guru_exists;
use crate::storage::store::{Store, WhereClause};
use crate::storage::types::{
    NewSantri, NewUser, Page, Paged, Role, Santri, SantriFilter, SantriUpdate,
};
use crate::storage::users::{
    apply_user_update, insert_user, load_user, user_from_row, USER_COLUMNS, USER_COLUMN_COUNT,
};

const SANTRI_COLUMNS: &str = "s.id, s.nis, s.class_name, s.guru_id, gu.name, s.wali_id, w.name,
        s.birth_date, s.active";

const SANTRI_FROM: &str = "santri_profiles s
        JOIN users u ON u.id = s.user_id
        LEFT JOIN guru_profiles g ON g.id = s.guru_id
        LEFT JOIN users gu ON gu.id = g.user_id
        LEFT JOIN users w ON w.id = s.wali_id";

fn santri_from_row(row: &Row<'_>) -> rusqlite::Result<Santri> {
    let o = USER_COLUMN_COUNT;
    Ok(Santri {
        user: user_from_row(row, 0)?,
        id: row.get(o)?,
        nis: row.get(o + 1)?,
        class_name: row.get(o + 2)?,
        guru_id: row.get(o + 3)?,
        guru_name: row.get(o + 4)?,
        wali_id: row.get(o + 5)?,
        wali_name: row.get(o + 6)?,
        birth_date: row.get(o + 7)?,
        active: row.get(o + 8)?,
    })
}

fn select_sql(w: &WhereClause) -> String {
    format!(
        "SELECT {}, {} FROM {}{} ORDER BY u.name, s.id",
        USER_COLUMNS,
        SANTRI_COLUMNS,
        SANTRI_FROM,
        w.sql()
    )
}

/// All santri matching `w`, ordered by name
pub(crate) fn load_santri_where(conn: &Connection, w: WhereClause) -> StorageResult<Vec<Santri>> {
    let sql = select_sql(&w);
    let args = w.paged_args(u32::MAX, 0);
    let mut stmt = conn.prepare(&format!("{} LIMIT ? OFFSET ?", sql))?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), santri_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn load_santri(conn: &Connection, id: i64) -> StorageResult<Santri> {
    let mut w = WhereClause::new();
    w.push("s.id = ?", id);
    load_santri_where(conn, w)?
        .into_iter()
        .next()
        .ok_or_else(|| StorageError::NotFound(format!("Santri {}", id)))
}

pub(crate) fn ensure_santri_exists(conn: &Connection, id: i64) -> StorageResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM santri_profiles WHERE id = ?",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| StorageError::NotFound(format!("Santri {}", id)))
}

/// A guardian reference must point at a user with role WALI
fn ensure_wali(conn: &Connection, user_id: i64) -> StorageResult<()> {
    let user = load_user(conn, user_id)?;
    if user.role != Role::Wali {
        return Err(StorageError::Validation(format!(
            "User {} is {} and cannot be a wali",
            user_id, user.role
        )));
    }
    Ok(())
}

fn validate_birth_date(date: &str) -> StorageResult<()> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| StorageError::Validation(format!("Invalid birth date: {}", date)))
}

fn filter_clause(filter: &SantriFilter) -> WhereClause {
    let mut w = WhereClause::new();
    if let Some(guru_id) = filter.guru_id {
        w.push("s.guru_id = ?", guru_id);
    }
    if let Some(wali_id) = filter.wali_id {
        w.push("s.wali_id = ?", wali_id);
    }
    if let Some(class_name) = &filter.class_name {
        w.push("s.class_name = ?", class_name.clone());
    }
    if let Some(active) = filter.active {
        w.push("s.active = ?", active);
    }
    w
}

impl Store {
    /// Create a student: the user row and its profile in one transaction
    pub fn create_santri(&self, santri: NewSantri) -> StorageResult<Santri> {
        if santri.nis.trim().is_empty() {
            return Err(StorageError::Validation("NIS cannot be empty".to_string()));
        }
        if let Some(date) = &santri.birth_date {
            validate_birth_date(date)?;
        }

        self.with_tx(|tx| {
            if let Some(guru_id) = santri.guru_id {
                ensure_guru_exists(tx, guru_id)?;
            }
            if let Some(wali_id) = santri.wali_id {
                ensure_wali(tx, wali_id)?;
            }

            let user_id = insert_user(
                tx,
                &NewUser {
                    name: santri.name.clone(),
                    email: santri.email.clone(),
                    role: Role::Santri,
                    phone: santri.phone.clone(),
                },
            )?;
            tx.execute(
                "INSERT INTO santri_profiles (user_id, nis, class_name, guru_id, wali_id, birth_date, active)
                 VALUES (?, ?, ?, ?, ?, ?, 1)",
                params![
                    user_id,
                    santri.nis,
                    santri.class_name,
                    santri.guru_id,
                    santri.wali_id,
                    santri.birth_date
                ],
            )?;
            let id = tx.last_insert_rowid();
            tracing::debug!(santri_id = id, user_id, "Inserted santri");
            load_santri(tx, id)
        })
    }

    pub fn get_santri(&self, id: i64) -> StorageResult<Santri> {
        self.with_conn(|conn| load_santri(conn, id))
    }

    pub fn list_santri(&self, filter: &SantriFilter, page: Page) -> StorageResult<Paged<Santri>> {
        let w = filter_clause(filter);
        self.with_conn(|conn| {
            let total = w.count(conn, SANTRI_FROM)?;
            let sql = format!("{} LIMIT ? OFFSET ?", select_sql(&w));
            let args = w.paged_args(page.limit, page.offset());
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params_from_iter(args.iter()), santri_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Paged {
                items,
                total,
                page: page.page,
                limit: page.limit,
            })
        })
    }

    /// Every santri matching `filter`, unpaginated (reports)
    pub fn all_santri(&self, filter: &SantriFilter) -> StorageResult<Vec<Santri>> {
        self.with_conn(|conn| load_santri_where(conn, filter_clause(filter)))
    }

    /// Children of a guardian
    pub fn wali_santri(&self, wali_id: i64) -> StorageResult<Vec<Santri>> {
        self.with_conn(|conn| {
            ensure_wali(conn, wali_id)?;
            let mut w = WhereClause::new();
            w.push("s.wali_id = ?", wali_id);
            load_santri_where(conn, w)
        })
    }

    pub fn update_santri(&self, id: i64, update: SantriUpdate) -> StorageResult<Santri> {
        if let Some(nis) = &update.nis {
            if nis.trim().is_empty() {
                return Err(StorageError::Validation("NIS cannot be empty".to_string()));
            }
        }
        if let Some(date) = update.birth_date.as_deref().filter(|d| !d.is_empty()) {
            validate_birth_date(date)?;
        }

        self.with_tx(|tx| {
            let mut santri = load_santri(tx, id)?;
            apply_user_update(tx, santri.user.id, &update.user)?;

            if let Some(nis) = &update.nis {
                santri.nis = nis.clone();
            }
            if let Some(class_name) = &update.class_name {
                santri.class_name = Some(class_name.clone()).filter(|c| !c.is_empty());
            }
            if let Some(guru_id) = update.guru_id {
                if let Some(g) = guru_id {
                    ensure_guru_exists(tx, g)?;
                }
                santri.guru_id = guru_id;
            }
            if let Some(wali_id) = update.wali_id {
                if let Some(w) = wali_id {
                    ensure_wali(tx, w)?;
                }
                santri.wali_id = wali_id;
            }
            if let Some(birth_date) = &update.birth_date {
                santri.birth_date = Some(birth_date.clone()).filter(|d| !d.is_empty());
            }
            if let Some(active) = update.active {
                santri.active = active;
            }

            tx.execute(
                "UPDATE santri_profiles
                 SET nis = ?, class_name = ?, guru_id = ?, wali_id = ?, birth_date = ?, active = ?
                 WHERE id = ?",
                params![
                    santri.nis,
                    santri.class_name,
                    santri.guru_id,
                    santri.wali_id,
                    santri.birth_date,
                    santri.active,
                    id
                ],
            )?;
            load_santri(tx, id)
        })
    }

    /// Delete a student with all of their hafalan and partial records
    pub fn delete_santri(&self, id: i64) -> StorageResult<()> {
        self.with_tx(|tx| {
            let user_id: i64 = tx
                .query_row(
                    "SELECT user_id FROM santri_profiles WHERE id = ?",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| StorageError::NotFound(format!("Santri {}", id)))?;
            tx.execute("DELETE FROM users WHERE id = ?", params![user_id])?;
            tracing::debug!(santri_id = id, user_id, "Deleted santri");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{new_santri, seed_guru, seed_santri, seed_wali};

    #[test]
    fn test_create_santri_with_guru_and_wali() {
        let store = Store::open_in_memory().unwrap();
        let guru = seed_guru(&store, "Ustadz Hamid");
        let wali = seed_wali(&store, "Pak Salman");

        let santri = seed_santri(&store, "Zainab", "NIS-1", Some(guru.id), Some(wali.id));

        assert_eq!(santri.user.role, Role::Santri);
        assert_eq!(santri.guru_name.as_deref(), Some("Ustadz Hamid"));
        assert_eq!(santri.wali_name.as_deref(), Some("Pak Salman"));
        assert!(santri.active);
        assert_eq!(store.get_santri(santri.id).unwrap(), santri);
    }

    #[test]
    fn test_wali_must_have_wali_role() {
        let store = Store::open_in_memory().unwrap();
        let guru = seed_guru(&store, "Ustadz Hamid");

        let mut input = new_santri("Zainab", "NIS-1");
        input.wali_id = Some(guru.user.id);
        let err = store.create_santri(input).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_unknown_guru_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let mut input = new_santri("Zainab", "NIS-1");
        input.guru_id = Some(42);
        assert!(matches!(
            store.create_santri(input),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_birth_date() {
        let store = Store::open_in_memory().unwrap();
        let mut input = new_santri("Zainab", "NIS-1");
        input.birth_date = Some("12/01/2012".to_string());
        assert!(matches!(
            store.create_santri(input),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_nis_is_constraint() {
        let store = Store::open_in_memory().unwrap();
        seed_santri(&store, "Zainab", "NIS-1", None, None);
        let mut input = new_santri("Maryam", "NIS-1");
        input.email = "maryam@example.com".to_string();
        assert!(matches!(
            store.create_santri(input),
            Err(StorageError::Constraint(_))
        ));
    }

    #[test]
    fn test_list_santri_filters() {
        let store = Store::open_in_memory().unwrap();
        let guru = seed_guru(&store, "Ustadz Hamid");
        let wali = seed_wali(&store, "Pak Salman");
        seed_santri(&store, "Abdullah", "NIS-1", Some(guru.id), Some(wali.id));
        seed_santri(&store, "Bariq", "NIS-2", Some(guru.id), None);
        seed_santri(&store, "Chalid", "NIS-3", None, None);

        let by_guru = store
            .list_santri(
                &SantriFilter {
                    guru_id: Some(guru.id),
                    ..Default::default()
                },
                Page::default(),
            )
            .unwrap();
        assert_eq!(by_guru.total, 2);
        assert_eq!(by_guru.items[0].user.name, "Abdullah");

        let children = store.wali_santri(wali.id).unwrap();
        assert_eq!(children.len(), 1);

        let all = store.all_santri(&SantriFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_update_santri_clears_guru() {
        let store = Store::open_in_memory().unwrap();
        let guru = seed_guru(&store, "Ustadz Hamid");
        let santri = seed_santri(&store, "Abdullah", "NIS-1", Some(guru.id), None);

        let updated = store
            .update_santri(
                santri.id,
                SantriUpdate {
                    guru_id: Some(None),
                    class_name: Some("7B".to_string()),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.guru_id, None);
        assert_eq!(updated.guru_name, None);
        assert_eq!(updated.class_name.as_deref(), Some("7B"));
        assert!(!updated.active);
    }

    #[test]
    fn test_delete_santri_removes_user() {
        let store = Store::open_in_memory().unwrap();
        let santri = seed_santri(&store, "Abdullah", "NIS-1", None, None);

        store.delete_santri(santri.id).unwrap();
        assert!(matches!(
            store.get_santri(santri.id),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.get_user(santri.user.id),
            Err(StorageError::NotFound(_))
        ));
    }
}
