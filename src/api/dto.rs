//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.
//! Timestamps leave the API as RFC 3339 strings.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::reports::SantriProgress;
use crate::storage::{
    Guru, HafalanRecord, HafalanStatus, Kaca, PartialHafalan, PartialStatus, Role, Santri,
    StoreStats, User,
};

/// Unix milliseconds as RFC 3339
pub fn format_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn format_opt(ms: Option<i64>) -> Option<String> {
    ms.map(format_timestamp)
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================
// USER DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            phone: u.phone,
            created_at: format_timestamp(u.created_at),
            updated_at: format_timestamp(u.updated_at),
        }
    }
}

// ============================================
// GURU DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct GuruQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGuruRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub nip: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGuruRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub nip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuruResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nip: Option<String>,
    pub santri_count: u32,
}

impl From<Guru> for GuruResponse {
    fn from(g: Guru) -> Self {
        Self {
            id: g.id,
            user_id: g.user.id,
            name: g.user.name,
            email: g.user.email,
            phone: g.user.phone,
            nip: g.nip,
            santri_count: g.santri_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignSantriRequest {
    pub santri_ids: Vec<i64>,
}

// ============================================
// SANTRI DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct SantriQuery {
    pub guru_id: Option<i64>,
    pub wali_id: Option<i64>,
    pub class_name: Option<String>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSantriRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub nis: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub guru_id: Option<i64>,
    #[serde(default)]
    pub wali_id: Option<i64>,
    /// YYYY-MM-DD
    #[serde(default)]
    pub birth_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSantriRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub nis: Option<String>,
    pub class_name: Option<String>,
    /// `null` unassigns the teacher
    #[serde(default, deserialize_with = "double_option")]
    pub guru_id: Option<Option<i64>>,
    /// `null` clears the guardian
    #[serde(default, deserialize_with = "double_option")]
    pub wali_id: Option<Option<i64>>,
    pub birth_date: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SantriResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nis: String,
    pub class_name: Option<String>,
    pub guru_id: Option<i64>,
    pub guru_name: Option<String>,
    pub wali_id: Option<i64>,
    pub wali_name: Option<String>,
    pub birth_date: Option<String>,
    pub active: bool,
}

impl From<Santri> for SantriResponse {
    fn from(s: Santri) -> Self {
        Self {
            id: s.id,
            user_id: s.user.id,
            name: s.user.name,
            email: s.user.email,
            phone: s.user.phone,
            nis: s.nis,
            class_name: s.class_name,
            guru_id: s.guru_id,
            guru_name: s.guru_name,
            wali_id: s.wali_id,
            wali_name: s.wali_name,
            birth_date: s.birth_date,
            active: s.active,
        }
    }
}

// ============================================
// KACA DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct KacaQuery {
    pub juz: Option<u32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateKacaRequest {
    pub page_number: u32,
    pub juz: u32,
    pub surah_name: String,
    pub ayat_start: u32,
    pub ayat_end: u32,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateKacaRequest {
    pub page_number: Option<u32>,
    pub juz: Option<u32>,
    pub surah_name: Option<String>,
    pub ayat_start: Option<u32>,
    pub ayat_end: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KacaResponse {
    pub id: i64,
    pub page_number: u32,
    pub juz: u32,
    pub surah_name: String,
    pub ayat_start: u32,
    pub ayat_end: u32,
    pub ayat_count: u32,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Kaca> for KacaResponse {
    fn from(k: Kaca) -> Self {
        Self {
            ayat_count: k.ayat_count(),
            id: k.id,
            page_number: k.page_number,
            juz: k.juz,
            surah_name: k.surah_name,
            ayat_start: k.ayat_start,
            ayat_end: k.ayat_end,
            description: k.description,
            created_at: format_timestamp(k.created_at),
            updated_at: format_timestamp(k.updated_at),
        }
    }
}

// ============================================
// HAFALAN DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct HafalanQuery {
    pub santri_id: Option<i64>,
    pub kaca_id: Option<i64>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Upsert of a santri's checklist for one kaca
#[derive(Debug, Deserialize)]
pub struct HafalanRequest {
    pub santri_id: i64,
    pub kaca_id: i64,
    #[serde(default)]
    pub guru_id: Option<i64>,
    pub completed_verses: Vec<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecheckRequest {
    #[serde(default)]
    pub guru_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HafalanResponse {
    pub id: i64,
    pub santri_id: i64,
    pub kaca_id: i64,
    pub guru_id: Option<i64>,
    pub status: HafalanStatus,
    pub completed_verses: Vec<u32>,
    pub notes: Option<String>,
    pub completed_at: Option<String>,
    pub rechecked_at: Option<String>,
    pub rechecked_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<HafalanRecord> for HafalanResponse {
    fn from(r: HafalanRecord) -> Self {
        Self {
            id: r.id,
            santri_id: r.santri_id,
            kaca_id: r.kaca_id,
            guru_id: r.guru_id,
            status: r.status,
            completed_verses: r.completed_verses,
            notes: r.notes,
            completed_at: format_opt(r.completed_at),
            rechecked_at: format_opt(r.rechecked_at),
            rechecked_by: r.rechecked_by,
            created_at: format_timestamp(r.created_at),
            updated_at: format_timestamp(r.updated_at),
        }
    }
}

// ============================================
// PARTIAL HAFALAN DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct PartialQuery {
    pub santri_id: Option<i64>,
    pub kaca_id: Option<i64>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePartialRequest {
    pub santri_id: i64,
    pub kaca_id: i64,
    pub ayat_number: u32,
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub percentage: u8,
    #[serde(default)]
    pub guru_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePartialRequest {
    pub progress: Option<String>,
    pub percentage: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartialResponse {
    pub id: i64,
    pub santri_id: i64,
    pub kaca_id: i64,
    pub ayat_number: u32,
    pub progress: String,
    pub percentage: u8,
    pub status: PartialStatus,
    pub guru_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl From<PartialHafalan> for PartialResponse {
    fn from(p: PartialHafalan) -> Self {
        Self {
            id: p.id,
            santri_id: p.santri_id,
            kaca_id: p.kaca_id,
            ayat_number: p.ayat_number,
            progress: p.progress,
            percentage: p.percentage,
            status: p.status,
            guru_id: p.guru_id,
            created_at: format_timestamp(p.created_at),
            updated_at: format_timestamp(p.updated_at),
            completed_at: format_opt(p.completed_at),
        }
    }
}

/// Result of completing a partial: the closed partial and the updated record
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletePartialResponse {
    pub partial: PartialResponse,
    pub hafalan: HafalanResponse,
}

// ============================================
// REPORT DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub top: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub guru_id: Option<i64>,
}

/// Santri progress with its last activity as RFC 3339
#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub santri_id: i64,
    pub name: String,
    pub nis: String,
    pub class_name: Option<String>,
    pub guru_name: Option<String>,
    pub completed_kaca: u64,
    pub rechecked_kaca: u64,
    pub in_progress_kaca: u64,
    pub memorized_ayat: u64,
    pub total_kaca: u64,
    pub completion_percent: f64,
    pub active_partials: u64,
    pub last_activity: Option<String>,
}

impl From<SantriProgress> for ProgressResponse {
    fn from(p: SantriProgress) -> Self {
        Self {
            santri_id: p.santri_id,
            name: p.name,
            nis: p.nis,
            class_name: p.class_name,
            guru_name: p.guru_name,
            completed_kaca: p.completed_kaca,
            rechecked_kaca: p.rechecked_kaca,
            in_progress_kaca: p.in_progress_kaca,
            memorized_ayat: p.memorized_ayat,
            total_kaca: p.total_kaca,
            completion_percent: p.completion_percent,
            active_partials: p.active_partials,
            last_activity: format_opt(p.last_activity),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Keyed by role wire name
    pub users: BTreeMap<String, u64>,
    pub total_users: u64,
    pub total_kaca: u64,
    /// Keyed by status wire name
    pub hafalan: BTreeMap<String, u64>,
    pub active_partials: u64,
}

impl From<StoreStats> for StatsResponse {
    fn from(s: StoreStats) -> Self {
        Self {
            users: s
                .users_by_role
                .iter()
                .map(|(r, n)| (r.to_string(), *n))
                .collect(),
            total_users: s.total_users,
            total_kaca: s.total_kaca,
            hafalan: s
                .hafalan_by_status
                .iter()
                .map(|(st, n)| (st.to_string(), *n))
                .collect(),
            active_partials: s.active_partials,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub stats: StatsResponse,
    pub top_santri: Vec<ProgressResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuruReportResponse {
    pub guru: GuruResponse,
    pub average_completion: f64,
    pub santri: Vec<ProgressResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WaliReportResponse {
    pub wali: UserResponse,
    pub children: Vec<ProgressResponse>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Database status: "ok" or "error"
    pub database: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Version string
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_timestamp(1_500), "1970-01-01T00:00:01.500+00:00");
    }

    #[test]
    fn test_update_santri_null_vs_absent() {
        let absent: UpdateSantriRequest = serde_json::from_str(r#"{"class_name": "7A"}"#).unwrap();
        assert_eq!(absent.guru_id, None);

        let cleared: UpdateSantriRequest = serde_json::from_str(r#"{"guru_id": null}"#).unwrap();
        assert_eq!(cleared.guru_id, Some(None));

        let set: UpdateSantriRequest = serde_json::from_str(r#"{"wali_id": 7}"#).unwrap();
        assert_eq!(set.wali_id, Some(Some(7)));
    }

    #[test]
    fn test_create_partial_defaults() {
        let req: CreatePartialRequest =
            serde_json::from_str(r#"{"santri_id": 1, "kaca_id": 2, "ayat_number": 3}"#).unwrap();
        assert_eq!(req.percentage, 0);
        assert_eq!(req.progress, "");
        assert_eq!(req.guru_id, None);
    }
}
