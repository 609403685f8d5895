//! SQLite-backed store
//!
//! One rusqlite `Connection` behind a `std::sync::Mutex` (SQLite handles are
//! not `Sync`). Every multi-row mutation runs in a single transaction.
//!
//! Entity operations live in sibling modules as further `impl Store` blocks.

use crate::storage::error::{StorageError, StorageResult};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql, Transaction};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL,
    phone TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

CREATE TABLE IF NOT EXISTS guru_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    nip TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS santri_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    nis TEXT NOT NULL UNIQUE,
    class_name TEXT,
    guru_id INTEGER REFERENCES guru_profiles(id) ON DELETE SET NULL,
    wali_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    birth_date TEXT,
    active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_santri_guru ON santri_profiles(guru_id);
CREATE INDEX IF NOT EXISTS idx_santri_wali ON santri_profiles(wali_id);

CREATE TABLE IF NOT EXISTS kaca (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_number INTEGER NOT NULL UNIQUE,
    juz INTEGER NOT NULL,
    surah_name TEXT NOT NULL,
    ayat_start INTEGER NOT NULL,
    ayat_end INTEGER NOT NULL,
    description TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_kaca_juz ON kaca(juz);

CREATE TABLE IF NOT EXISTS hafalan_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    santri_id INTEGER NOT NULL REFERENCES santri_profiles(id) ON DELETE CASCADE,
    kaca_id INTEGER NOT NULL REFERENCES kaca(id) ON DELETE RESTRICT,
    guru_id INTEGER REFERENCES guru_profiles(id) ON DELETE SET NULL,
    status TEXT NOT NULL,
    completed_verses TEXT NOT NULL,
    notes TEXT,
    completed_at INTEGER,
    rechecked_at INTEGER,
    rechecked_by INTEGER REFERENCES guru_profiles(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (santri_id, kaca_id)
);
CREATE INDEX IF NOT EXISTS idx_hafalan_status ON hafalan_records(status);

CREATE TABLE IF NOT EXISTS partial_hafalan (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    santri_id INTEGER NOT NULL REFERENCES santri_profiles(id) ON DELETE CASCADE,
    kaca_id INTEGER NOT NULL REFERENCES kaca(id) ON DELETE RESTRICT,
    ayat_number INTEGER NOT NULL,
    progress TEXT NOT NULL,
    percentage INTEGER NOT NULL,
    status TEXT NOT NULL,
    guru_id INTEGER REFERENCES guru_profiles(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    completed_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_partial_santri_kaca ON partial_hafalan(santri_id, kaca_id);
";

/// Persistent store for users, kaca and hafalan progress
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        let store = Self::init(conn, Some(path.to_path_buf()))?;
        tracing::info!(path = %path.display(), "Opened hafalan database");
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Cheap round-trip used by readiness checks
    pub fn ping(&self) -> bool {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .is_ok()
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Lock("database connection mutex poisoned".to_string()))?;
        f(&mut conn)
    }

    /// Run `f` inside a transaction, committing only when it succeeds
    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }
}

/// Current time in Unix milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Incrementally built `WHERE` clause with positional arguments
#[derive(Default)]
pub(crate) struct WhereClause {
    clauses: Vec<String>,
    args: Vec<Box<dyn ToSql>>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition using exactly one `?` placeholder
    pub fn push(&mut self, clause: &str, value: impl ToSql + 'static) {
        self.clauses.push(clause.to_string());
        self.args.push(Box::new(value));
    }

    /// Add a condition using the same value for several placeholders
    pub fn push_repeated(&mut self, clause: &str, value: String, times: usize) {
        self.clauses.push(clause.to_string());
        for _ in 0..times {
            self.args.push(Box::new(value.clone()));
        }
    }

    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Row count for `SELECT COUNT(*) FROM <from><where>`
    pub fn count(&self, conn: &Connection, from: &str) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}{}", from, self.sql());
        let total: i64 = conn.query_row(&sql, params_from_iter(self.args.iter()), |row| {
            row.get(0)
        })?;
        Ok(total as u64)
    }

    /// Arguments followed by `LIMIT ? OFFSET ?` values
    pub fn paged_args(self, limit: u32, offset: u64) -> Vec<Box<dyn ToSql>> {
        let mut args = self.args;
        args.push(Box::new(limit as i64));
        args.push(Box::new(offset as i64));
        args
    }
}
