//! Core data types for the hafalan store
//!
//! This module defines the rows persisted by [`Store`](super::Store):
//! - `User` with its `Role`, plus the `GuruProfile` / `SantriProfile` extensions
//! - `Kaca`: one mushaf page and its ayat range
//! - `HafalanRecord`: a student's completed-ayat checklist for one kaca
//! - `PartialHafalan`: in-progress work on a single ayat
//!
//! Timestamps are Unix milliseconds.

use crate::storage::error::{StorageError, StorageResult};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of pages in the standard Madinah mushaf
pub const MAX_KACA_PAGE: u32 = 604;

/// Number of juz in the Qur'an
pub const MAX_JUZ: u32 = 30;

/// Ayat count of the longest surah (Al-Baqarah)
pub const MAX_AYAT: u32 = 286;

/// Error returned when a stored or submitted enum string is unknown
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Stores an enum as its wire string in a TEXT column
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: ParseEnumError| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ============================================
// USERS
// ============================================

/// Role a user acts under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    /// Teacher
    Guru,
    /// Guardian
    Wali,
    /// Student
    Santri,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Admin, Role::Guru, Role::Wali, Role::Santri]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Guru => "GURU",
            Role::Wali => "WALI",
            Role::Santri => "SANTRI",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "guru" | "teacher" => Ok(Role::Guru),
            "wali" | "guardian" => Ok(Role::Wali),
            "santri" | "student" => Ok(Role::Santri),
            _ => Err(ParseEnumError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

sql_text_enum!(Role);

/// A login-bearing person in the school
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields for a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Editable user fields; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// List filter for users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Case-insensitive substring of name or email
    pub search: Option<String>,
}

/// Teacher profile joined with its user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Guru {
    /// Profile id (used by santri.guru_id)
    pub id: i64,
    pub user: User,
    pub nip: Option<String>,
    pub santri_count: u32,
}

#[derive(Debug, Clone)]
pub struct NewGuru {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nip: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GuruUpdate {
    pub user: UserUpdate,
    pub nip: Option<String>,
}

/// Student profile joined with its user and the names of its guru and wali
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Santri {
    /// Profile id
    pub id: i64,
    pub user: User,
    pub nis: String,
    pub class_name: Option<String>,
    pub guru_id: Option<i64>,
    pub guru_name: Option<String>,
    /// User id of the guardian
    pub wali_id: Option<i64>,
    pub wali_name: Option<String>,
    /// YYYY-MM-DD
    pub birth_date: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewSantri {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nis: String,
    pub class_name: Option<String>,
    pub guru_id: Option<i64>,
    pub wali_id: Option<i64>,
    pub birth_date: Option<String>,
}

/// Editable santri fields. The nested options on `guru_id` / `wali_id`
/// distinguish "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct SantriUpdate {
    pub user: UserUpdate,
    pub nis: Option<String>,
    pub class_name: Option<String>,
    pub guru_id: Option<Option<i64>>,
    pub wali_id: Option<Option<i64>>,
    pub birth_date: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SantriFilter {
    pub guru_id: Option<i64>,
    pub wali_id: Option<i64>,
    pub class_name: Option<String>,
    pub active: Option<bool>,
}

// ============================================
// KACA
// ============================================

/// One page of the mushaf
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kaca {
    pub id: i64,
    pub page_number: u32,
    pub juz: u32,
    pub surah_name: String,
    pub ayat_start: u32,
    pub ayat_end: u32,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Kaca {
    /// Number of ayat on this page
    pub fn ayat_count(&self) -> u32 {
        self.ayat_end.saturating_sub(self.ayat_start) + 1
    }

    pub fn contains_ayat(&self, ayat: u32) -> bool {
        (self.ayat_start..=self.ayat_end).contains(&ayat)
    }

    /// All ayat numbers on this page, ascending
    pub fn ayat_numbers(&self) -> impl Iterator<Item = u32> {
        self.ayat_start..=self.ayat_end
    }

    /// True when `verses` covers every ayat on the page
    pub fn is_fully_covered(&self, verses: &[u32]) -> bool {
        let covered = verses.iter().filter(|a| self.contains_ayat(**a)).count();
        covered as u32 == self.ayat_count()
    }
}

#[derive(Debug, Clone)]
pub struct NewKaca {
    pub page_number: u32,
    pub juz: u32,
    pub surah_name: String,
    pub ayat_start: u32,
    pub ayat_end: u32,
    pub description: Option<String>,
}

impl NewKaca {
    pub fn validate(&self) -> StorageResult<()> {
        validate_kaca_fields(
            self.page_number,
            self.juz,
            &self.surah_name,
            self.ayat_start,
            self.ayat_end,
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct KacaUpdate {
    pub page_number: Option<u32>,
    pub juz: Option<u32>,
    pub surah_name: Option<String>,
    pub ayat_start: Option<u32>,
    pub ayat_end: Option<u32>,
    pub description: Option<String>,
}

pub(crate) fn validate_kaca_fields(
    page_number: u32,
    juz: u32,
    surah_name: &str,
    ayat_start: u32,
    ayat_end: u32,
) -> StorageResult<()> {
    if !(1..=MAX_KACA_PAGE).contains(&page_number) {
        return Err(StorageError::Validation(format!(
            "Page number must be between 1 and {}",
            MAX_KACA_PAGE
        )));
    }
    if !(1..=MAX_JUZ).contains(&juz) {
        return Err(StorageError::Validation(format!(
            "Juz must be between 1 and {}",
            MAX_JUZ
        )));
    }
    if surah_name.trim().is_empty() {
        return Err(StorageError::Validation(
            "Surah name cannot be empty".to_string(),
        ));
    }
    if ayat_start == 0 {
        return Err(StorageError::Validation(
            "Ayat numbers start at 1".to_string(),
        ));
    }
    if ayat_end < ayat_start {
        return Err(StorageError::Validation(
            "ayat_end must not be lower than ayat_start".to_string(),
        ));
    }
    if ayat_end > MAX_AYAT {
        return Err(StorageError::Validation(format!(
            "ayat_end must not exceed {}",
            MAX_AYAT
        )));
    }
    Ok(())
}

// ============================================
// HAFALAN
// ============================================

/// Progress of a student's checklist for one kaca
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HafalanStatus {
    /// Some ayat still missing
    Progress,
    /// Every ayat done, waiting for a teacher to recheck
    CompleteWaitingRecheck,
    /// A teacher confirmed the page
    Rechecked,
}

impl HafalanStatus {
    pub fn all() -> &'static [HafalanStatus] {
        &[
            HafalanStatus::Progress,
            HafalanStatus::CompleteWaitingRecheck,
            HafalanStatus::Rechecked,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HafalanStatus::Progress => "PROGRESS",
            HafalanStatus::CompleteWaitingRecheck => "COMPLETE_WAITING_RECHECK",
            HafalanStatus::Rechecked => "RECHECKED",
        }
    }

    /// Whether the page counts as memorized
    pub fn is_complete(&self) -> bool {
        !matches!(self, HafalanStatus::Progress)
    }
}

impl FromStr for HafalanStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PROGRESS" => Ok(HafalanStatus::Progress),
            "COMPLETE_WAITING_RECHECK" => Ok(HafalanStatus::CompleteWaitingRecheck),
            "RECHECKED" => Ok(HafalanStatus::Rechecked),
            _ => Err(ParseEnumError {
                kind: "hafalan status",
                value: s.to_string(),
            }),
        }
    }
}

sql_text_enum!(HafalanStatus);

/// A student's memorization checklist for one kaca
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HafalanRecord {
    pub id: i64,
    pub santri_id: i64,
    pub kaca_id: i64,
    pub guru_id: Option<i64>,
    pub status: HafalanStatus,
    /// Sorted, deduplicated ayat numbers
    pub completed_verses: Vec<u32>,
    pub notes: Option<String>,
    pub completed_at: Option<i64>,
    pub rechecked_at: Option<i64>,
    pub rechecked_by: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl HafalanRecord {
    /// A fresh record with nothing memorized yet (id 0 until inserted)
    pub fn empty(santri_id: i64, kaca_id: i64, now: i64) -> Self {
        Self {
            id: 0,
            santri_id,
            kaca_id,
            guru_id: None,
            status: HafalanStatus::Progress,
            completed_verses: Vec::new(),
            notes: None,
            completed_at: None,
            rechecked_at: None,
            rechecked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_verse(&self, ayat: u32) -> bool {
        self.completed_verses.binary_search(&ayat).is_ok()
    }

    /// Replace the checklist and recompute the status.
    ///
    /// A complete page moves to `CompleteWaitingRecheck` when it becomes
    /// complete; an unchanged complete page keeps its status and stamps.
    pub fn apply_verses(&mut self, kaca: &Kaca, mut verses: Vec<u32>, now: i64) {
        verses.sort_unstable();
        verses.dedup();

        let changed = verses != self.completed_verses;
        self.completed_verses = verses;

        if !kaca.is_fully_covered(&self.completed_verses) {
            self.status = HafalanStatus::Progress;
            self.completed_at = None;
            self.rechecked_at = None;
            self.rechecked_by = None;
        } else if changed || self.status == HafalanStatus::Progress {
            self.status = HafalanStatus::CompleteWaitingRecheck;
            self.completed_at = Some(now);
            self.rechecked_at = None;
            self.rechecked_by = None;
        }

        self.updated_at = now;
    }

    /// Mark a complete page as confirmed by a teacher
    pub fn recheck(&mut self, guru_id: Option<i64>, now: i64) -> StorageResult<()> {
        if self.status != HafalanStatus::CompleteWaitingRecheck {
            return Err(StorageError::InvalidState(format!(
                "Hafalan {} is {} and cannot be rechecked",
                self.id, self.status
            )));
        }
        self.status = HafalanStatus::Rechecked;
        self.rechecked_at = Some(now);
        self.rechecked_by = guru_id;
        self.updated_at = now;
        Ok(())
    }
}

/// Checklist submission for (santri, kaca)
#[derive(Debug, Clone)]
pub struct HafalanInput {
    pub santri_id: i64,
    pub kaca_id: i64,
    pub guru_id: Option<i64>,
    pub completed_verses: Vec<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HafalanFilter {
    pub santri_id: Option<i64>,
    pub kaca_id: Option<i64>,
    pub status: Option<HafalanStatus>,
}

// ============================================
// PARTIAL HAFALAN
// ============================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartialStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl PartialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartialStatus::InProgress => "IN_PROGRESS",
            PartialStatus::Completed => "COMPLETED",
            PartialStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for PartialStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IN_PROGRESS" => Ok(PartialStatus::InProgress),
            "COMPLETED" => Ok(PartialStatus::Completed),
            "CANCELLED" => Ok(PartialStatus::Cancelled),
            _ => Err(ParseEnumError {
                kind: "partial status",
                value: s.to_string(),
            }),
        }
    }
}

sql_text_enum!(PartialStatus);

/// Sub-ayat progress on a single ayat; blocks the ayat (and the ones after it)
/// until completed or cancelled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartialHafalan {
    pub id: i64,
    pub santri_id: i64,
    pub kaca_id: i64,
    pub ayat_number: u32,
    /// Free-text position, e.g. "up to word 5"
    pub progress: String,
    pub percentage: u8,
    pub status: PartialStatus,
    pub guru_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

impl PartialHafalan {
    pub fn is_active(&self) -> bool {
        self.status == PartialStatus::InProgress
    }

    fn ensure_active(&self, action: &str) -> StorageResult<()> {
        if !self.is_active() {
            return Err(StorageError::InvalidState(format!(
                "Partial hafalan {} is {} and cannot be {}",
                self.id, self.status, action
            )));
        }
        Ok(())
    }

    /// Finish the ayat. Percentage is forced to 100.
    pub fn complete(&mut self, now: i64) -> StorageResult<()> {
        self.ensure_active("completed")?;
        self.status = PartialStatus::Completed;
        self.percentage = 100;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: i64) -> StorageResult<()> {
        self.ensure_active("cancelled")?;
        self.status = PartialStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_progress(
        &mut self,
        progress: Option<String>,
        percentage: Option<u8>,
        now: i64,
    ) -> StorageResult<()> {
        self.ensure_active("updated")?;
        if let Some(p) = percentage {
            validate_partial_percentage(p)?;
            self.percentage = p;
        }
        if let Some(text) = progress {
            self.progress = text;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// An open partial stays below 100; reaching 100 goes through `complete`
pub(crate) fn validate_partial_percentage(percentage: u8) -> StorageResult<()> {
    if percentage >= 100 {
        return Err(StorageError::Validation(
            "Percentage must be below 100; complete the partial hafalan instead".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewPartial {
    pub santri_id: i64,
    pub kaca_id: i64,
    pub ayat_number: u32,
    pub progress: String,
    pub percentage: u8,
    pub guru_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct PartialFilter {
    pub santri_id: Option<i64>,
    pub kaca_id: Option<i64>,
    pub status: Option<PartialStatus>,
}

// ============================================
// PAGINATION
// ============================================

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;

    /// Build a page request, clamping `limit` into `1..=max_limit`
    pub fn new(page: Option<u32>, limit: Option<u32>, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, max_limit),
        }
    }

    /// A single page large enough for every row
    pub fn all() -> Self {
        Self {
            page: 1,
            limit: u32::MAX,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kaca(start: u32, end: u32) -> Kaca {
        Kaca {
            id: 1,
            page_number: 2,
            juz: 1,
            surah_name: "Al-Baqarah".to_string(),
            ayat_start: start,
            ayat_end: end,
            description: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn partial(percentage: u8) -> PartialHafalan {
        PartialHafalan {
            id: 9,
            santri_id: 1,
            kaca_id: 1,
            ayat_number: 3,
            progress: "up to word 4".to_string(),
            percentage,
            status: PartialStatus::InProgress,
            guru_id: None,
            created_at: 0,
            updated_at: 0,
            completed_at: None,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("guru".parse::<Role>().unwrap(), Role::Guru);
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Guru);
        assert_eq!("SANTRI".parse::<Role>().unwrap(), Role::Santri);
        assert!("janitor".parse::<Role>().is_err());
        assert_eq!(Role::Wali.to_string(), "WALI");
    }

    #[test]
    fn test_status_serde_uses_wire_names() {
        let json = serde_json::to_string(&HafalanStatus::CompleteWaitingRecheck).unwrap();
        assert_eq!(json, "\"COMPLETE_WAITING_RECHECK\"");
        let json = serde_json::to_string(&PartialStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn test_kaca_coverage() {
        let k = kaca(6, 16);
        assert_eq!(k.ayat_count(), 11);
        assert!(k.contains_ayat(6));
        assert!(k.contains_ayat(16));
        assert!(!k.contains_ayat(17));
        assert!(!k.is_fully_covered(&[6, 7, 8]));
        assert!(k.is_fully_covered(&(6..=16).collect::<Vec<_>>()));
    }

    #[test]
    fn test_kaca_validation() {
        assert!(validate_kaca_fields(1, 1, "Al-Fatihah", 1, 7).is_ok());
        assert!(validate_kaca_fields(0, 1, "Al-Fatihah", 1, 7).is_err());
        assert!(validate_kaca_fields(605, 30, "An-Nas", 1, 6).is_err());
        assert!(validate_kaca_fields(1, 31, "Al-Fatihah", 1, 7).is_err());
        assert!(validate_kaca_fields(1, 1, "  ", 1, 7).is_err());
        assert!(validate_kaca_fields(1, 1, "Al-Fatihah", 0, 7).is_err());
        assert!(validate_kaca_fields(1, 1, "Al-Fatihah", 8, 7).is_err());
        assert!(validate_kaca_fields(49, 3, "Al-Baqarah", 283, MAX_AYAT).is_ok());
        assert!(validate_kaca_fields(2, 1, "Al-Baqarah", 1, MAX_AYAT + 1).is_err());
        assert!(validate_kaca_fields(2, 1, "Al-Baqarah", 1, 4_000_000_000).is_err());
    }

    #[test]
    fn test_apply_verses_status_transitions() {
        let k = kaca(1, 3);
        let mut record = HafalanRecord::empty(1, 1, 0);

        record.apply_verses(&k, vec![2, 1, 2], 10);
        assert_eq!(record.completed_verses, vec![1, 2]);
        assert_eq!(record.status, HafalanStatus::Progress);
        assert_eq!(record.completed_at, None);

        record.apply_verses(&k, vec![1, 2, 3], 20);
        assert_eq!(record.status, HafalanStatus::CompleteWaitingRecheck);
        assert_eq!(record.completed_at, Some(20));

        record.recheck(Some(4), 30).unwrap();
        assert_eq!(record.status, HafalanStatus::Rechecked);

        // Same set again keeps the recheck
        record.apply_verses(&k, vec![3, 2, 1], 40);
        assert_eq!(record.status, HafalanStatus::Rechecked);
        assert_eq!(record.completed_at, Some(20));

        // Removing a verse reopens the page
        record.apply_verses(&k, vec![1, 3], 50);
        assert_eq!(record.status, HafalanStatus::Progress);
        assert_eq!(record.rechecked_at, None);
        assert_eq!(record.rechecked_by, None);
    }

    #[test]
    fn test_recheck_requires_waiting_status() {
        let mut record = HafalanRecord::empty(1, 1, 0);
        let err = record.recheck(None, 5).unwrap_err();
        assert!(matches!(err, StorageError::InvalidState(_)));
    }

    #[test]
    fn test_complete_forces_full_percentage() {
        for start in [0, 40, 99] {
            let mut p = partial(start);
            p.complete(100).unwrap();
            assert_eq!(p.percentage, 100);
            assert_eq!(p.status, PartialStatus::Completed);
            assert_eq!(p.completed_at, Some(100));
        }
    }

    #[test]
    fn test_closed_partial_rejects_transitions() {
        let mut p = partial(10);
        p.cancel(1).unwrap();
        assert_eq!(p.status, PartialStatus::Cancelled);
        assert!(p.complete(2).is_err());
        assert!(p.cancel(3).is_err());
        assert!(p.update_progress(None, Some(20), 4).is_err());
    }

    #[test]
    fn test_update_progress() {
        let mut p = partial(10);
        p.update_progress(Some("up to word 9".to_string()), Some(60), 7)
            .unwrap();
        assert_eq!(p.percentage, 60);
        assert_eq!(p.progress, "up to word 9");
        assert!(p.update_progress(None, Some(100), 8).is_err());
    }

    #[test]
    fn test_page_clamping() {
        let page = Page::new(None, None, 100);
        assert_eq!(page, Page { page: 1, limit: 20 });

        let page = Page::new(Some(0), Some(500), 100);
        assert_eq!(page, Page { page: 1, limit: 100 });

        let page = Page::new(Some(3), Some(10), 100);
        assert_eq!(page.offset(), 20);
    }
}
