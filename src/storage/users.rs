//! User rows
//!
//! Plain users cover admins and guardians; teachers and students get a
//! profile row on top (see `guru.rs` and `santri.rs`).

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::store::{now_millis, Store, WhereClause};
use crate::storage::types::{NewUser, Page, Paged, Role, User, UserFilter, UserUpdate};

/// Columns read by [`user_from_row`], aliased `u`
pub(crate) const USER_COLUMNS: &str =
    "u.id, u.name, u.email, u.role, u.phone, u.created_at, u.updated_at";

/// Number of columns in [`USER_COLUMNS`]
pub(crate) const USER_COLUMN_COUNT: usize = 7;

/// Read a user starting at column `offset`
pub(crate) fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        role: row.get(offset + 3)?,
        phone: row.get(offset + 4)?,
        created_at: row.get(offset + 5)?,
        updated_at: row.get(offset + 6)?,
    })
}

pub(crate) fn load_user(conn: &Connection, id: i64) -> StorageResult<User> {
    conn.query_row(
        &format!("SELECT {} FROM users u WHERE u.id = ?", USER_COLUMNS),
        params![id],
        |row| user_from_row(row, 0),
    )
    .optional()?
    .ok_or_else(|| StorageError::NotFound(format!("User {}", id)))
}

pub(crate) fn insert_user(conn: &Connection, user: &NewUser) -> StorageResult<i64> {
    let now = now_millis();
    conn.execute(
        "INSERT INTO users (name, email, role, phone, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![user.name, user.email, user.role, user.phone, now, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn apply_user_update(
    conn: &Connection,
    id: i64,
    update: &UserUpdate,
) -> StorageResult<User> {
    let mut user = load_user(conn, id)?;
    if let Some(name) = &update.name {
        user.name = name.clone();
    }
    if let Some(email) = &update.email {
        user.email = email.clone();
    }
    if let Some(phone) = &update.phone {
        user.phone = if phone.is_empty() {
            None
        } else {
            Some(phone.clone())
        };
    }
    user.updated_at = now_millis();

    conn.execute(
        "UPDATE users SET name = ?, email = ?, phone = ?, updated_at = ? WHERE id = ?",
        params![user.name, user.email, user.phone, user.updated_at, id],
    )?;
    Ok(user)
}

impl Store {
    /// Create a user. Teachers and students go through
    /// [`create_guru`](Store::create_guru) / [`create_santri`](Store::create_santri)
    /// so they get a profile.
    pub fn create_user(&self, user: NewUser) -> StorageResult<User> {
        if matches!(user.role, Role::Guru | Role::Santri) {
            return Err(StorageError::Validation(format!(
                "Users with role {} need a profile; use the {} endpoint",
                user.role,
                user.role.as_str().to_lowercase()
            )));
        }

        self.with_tx(|tx| {
            let id = insert_user(tx, &user)?;
            tracing::debug!(user_id = id, role = %user.role, "Inserted user");
            load_user(tx, id)
        })
    }

    pub fn get_user(&self, id: i64) -> StorageResult<User> {
        self.with_conn(|conn| load_user(conn, id))
    }

    pub fn list_users(&self, filter: &UserFilter, page: Page) -> StorageResult<Paged<User>> {
        let mut w = WhereClause::new();
        if let Some(role) = filter.role {
            w.push("u.role = ?", role);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            w.push_repeated("(LOWER(u.name) LIKE ? OR LOWER(u.email) LIKE ?)", pattern, 2);
        }

        self.with_conn(|conn| {
            let total = w.count(conn, "users u")?;
            let sql = format!(
                "SELECT {} FROM users u{} ORDER BY u.name, u.id LIMIT ? OFFSET ?",
                USER_COLUMNS,
                w.sql()
            );
            let args = w.paged_args(page.limit, page.offset());
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params_from_iter(args.iter()), |row| user_from_row(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Paged {
                items,
                total,
                page: page.page,
                limit: page.limit,
            })
        })
    }

    pub fn update_user(&self, id: i64, update: UserUpdate) -> StorageResult<User> {
        self.with_tx(|tx| apply_user_update(tx, id, &update))
    }

    /// Delete a user; profiles and a student's records go with it
    pub fn delete_user(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?", params![id])?;
            if deleted == 0 {
                return Err(StorageError::NotFound(format!("User {}", id)));
            }
            tracing::debug!(user_id = id, "Deleted user");
            Ok(())
        })
    }

    /// Number of users per role, every role present
    pub fn count_users_by_role(&self) -> StorageResult<Vec<(Role, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT role, COUNT(*) FROM users GROUP BY role")?;
            let counted = stmt
                .query_map([], |row| Ok((row.get::<_, Role>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Role::all()
                .iter()
                .map(|role| {
                    let n = counted
                        .iter()
                        .find(|(r, _)| r == role)
                        .map(|(_, n)| *n as u64)
                        .unwrap_or(0);
                    (*role, n)
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, role: Role) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            phone: None,
        }
    }

    #[test]
    fn test_create_and_get_user() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user(new_user("Aisyah", Role::Wali)).unwrap();

        assert!(user.id > 0);
        assert_eq!(user.role, Role::Wali);
        assert_eq!(store.get_user(user.id).unwrap(), user);
    }

    #[test]
    fn test_profile_roles_rejected() {
        let store = Store::open_in_memory().unwrap();
        let err = store.create_user(new_user("Umar", Role::Guru)).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_duplicate_email_is_constraint() {
        let store = Store::open_in_memory().unwrap();
        store.create_user(new_user("Ali", Role::Admin)).unwrap();
        let err = store.create_user(new_user("Ali", Role::Wali)).unwrap_err();
        assert!(matches!(err, StorageError::Constraint(_)));
    }

    #[test]
    fn test_list_filters_and_paginates() {
        let store = Store::open_in_memory().unwrap();
        for name in ["Ahmad", "Bilal", "Fatimah"] {
            store.create_user(new_user(name, Role::Wali)).unwrap();
        }
        store.create_user(new_user("Zaid", Role::Admin)).unwrap();

        let walis = store
            .list_users(
                &UserFilter {
                    role: Some(Role::Wali),
                    search: None,
                },
                Page::new(Some(1), Some(2), 100),
            )
            .unwrap();
        assert_eq!(walis.total, 3);
        assert_eq!(walis.items.len(), 2);
        assert_eq!(walis.items[0].name, "Ahmad");

        let second = store
            .list_users(
                &UserFilter {
                    role: Some(Role::Wali),
                    search: None,
                },
                Page::new(Some(2), Some(2), 100),
            )
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name, "Fatimah");

        let found = store
            .list_users(
                &UserFilter {
                    role: None,
                    search: Some("BIL".to_string()),
                },
                Page::default(),
            )
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].name, "Bilal");
    }

    #[test]
    fn test_update_and_delete_user() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user(new_user("Hasan", Role::Admin)).unwrap();

        let updated = store
            .update_user(
                user.id,
                UserUpdate {
                    name: Some("Hasan Basri".to_string()),
                    email: None,
                    phone: Some("0812".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Hasan Basri");
        assert_eq!(updated.email, user.email);
        assert_eq!(updated.phone.as_deref(), Some("0812"));

        store.delete_user(user.id).unwrap();
        assert!(matches!(
            store.get_user(user.id),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_user(user.id),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_count_users_by_role() {
        let store = Store::open_in_memory().unwrap();
        store.create_user(new_user("A", Role::Admin)).unwrap();
        store.create_user(new_user("B", Role::Wali)).unwrap();
        store.create_user(new_user("C", Role::Wali)).unwrap();

        let counts = store.count_users_by_role().unwrap();
        assert_eq!(counts.len(), 4);
        assert!(counts.contains(&(Role::Admin, 1)));
        assert!(counts.contains(&(Role::Wali, 2)));
        assert!(counts.contains(&(Role::Guru, 0)));
    }
}
