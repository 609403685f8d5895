//! Per-santri progress and the guru / wali rollups built from it

use serde::Serialize;

use crate::storage::{
    Guru, HafalanRecord, HafalanStatus, PartialHafalan, Santri, StorageError, StorageResult, Store,
    User,
};

/// Memorization progress of one student
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SantriProgress {
    pub santri_id: i64,
    pub name: String,
    pub nis: String,
    pub class_name: Option<String>,
    pub guru_name: Option<String>,
    /// Kaca waiting for recheck or rechecked
    pub completed_kaca: u64,
    pub rechecked_kaca: u64,
    pub in_progress_kaca: u64,
    pub memorized_ayat: u64,
    pub total_kaca: u64,
    /// completed / total × 100, one decimal
    pub completion_percent: f64,
    pub active_partials: u64,
    /// Latest update across records and partials (Unix ms)
    pub last_activity: Option<i64>,
}

/// Progress of every santri assigned to a teacher
#[derive(Debug, Clone, Serialize)]
pub struct GuruReport {
    pub guru: Guru,
    pub santri: Vec<SantriProgress>,
    pub average_completion: f64,
}

/// Progress of a guardian's children
#[derive(Debug, Clone, Serialize)]
pub struct WaliReport {
    pub wali: User,
    pub children: Vec<SantriProgress>,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Progress of `santri` from the rows that belong to it. Rows of other
/// students are ignored.
pub fn santri_progress(
    santri: &Santri,
    records: &[HafalanRecord],
    partials: &[PartialHafalan],
    total_kaca: u64,
) -> SantriProgress {
    let mut completed = 0;
    let mut rechecked = 0;
    let mut in_progress = 0;
    let mut memorized = 0;
    let mut last_activity: Option<i64> = None;

    for record in records.iter().filter(|r| r.santri_id == santri.id) {
        match record.status {
            HafalanStatus::Progress => in_progress += 1,
            HafalanStatus::CompleteWaitingRecheck => completed += 1,
            HafalanStatus::Rechecked => {
                completed += 1;
                rechecked += 1;
            }
        }
        memorized += record.completed_verses.len() as u64;
        last_activity = last_activity.max(Some(record.updated_at));
    }

    let mut active_partials = 0;
    for partial in partials.iter().filter(|p| p.santri_id == santri.id) {
        if partial.is_active() {
            active_partials += 1;
        }
        last_activity = last_activity.max(Some(partial.updated_at));
    }

    let completion_percent = if total_kaca == 0 {
        0.0
    } else {
        round1(completed as f64 / total_kaca as f64 * 100.0)
    };

    SantriProgress {
        santri_id: santri.id,
        name: santri.user.name.clone(),
        nis: santri.nis.clone(),
        class_name: santri.class_name.clone(),
        guru_name: santri.guru_name.clone(),
        completed_kaca: completed,
        rechecked_kaca: rechecked,
        in_progress_kaca: in_progress,
        memorized_ayat: memorized,
        total_kaca,
        completion_percent,
        active_partials,
        last_activity,
    }
}

/// Progress for each of `santri`, in the given order
pub fn progress_for(
    santri: &[Santri],
    records: &[HafalanRecord],
    partials: &[PartialHafalan],
    total_kaca: u64,
) -> Vec<SantriProgress> {
    santri
        .iter()
        .map(|s| santri_progress(s, records, partials, total_kaca))
        .collect()
}

fn average_completion(rows: &[SantriProgress]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    round1(rows.iter().map(|r| r.completion_percent).sum::<f64>() / rows.len() as f64)
}

impl Store {
    fn progress_of(&self, santri: &[Santri]) -> StorageResult<Vec<SantriProgress>> {
        let records = self.all_hafalan()?;
        let partials = self.all_partials()?;
        let total = self.count_kaca()?;
        Ok(progress_for(santri, &records, &partials, total))
    }

    pub fn santri_progress_report(&self, santri_id: i64) -> StorageResult<SantriProgress> {
        let santri = self.get_santri(santri_id)?;
        self.progress_of(std::slice::from_ref(&santri))?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound(format!("Santri {}", santri_id)))
    }

    /// Progress of every santri, optionally only those of one teacher
    pub fn progress_rows(&self, guru_id: Option<i64>) -> StorageResult<Vec<SantriProgress>> {
        let santri = match guru_id {
            Some(id) => self.guru_santri(id)?,
            None => self.all_santri(&Default::default())?,
        };
        self.progress_of(&santri)
    }

    pub fn guru_report(&self, guru_id: i64) -> StorageResult<GuruReport> {
        let guru = self.get_guru(guru_id)?;
        let santri = self.progress_rows(Some(guru_id))?;
        Ok(GuruReport {
            average_completion: average_completion(&santri),
            guru,
            santri,
        })
    }

    pub fn wali_report(&self, wali_id: i64) -> StorageResult<WaliReport> {
        let wali = self.get_user(wali_id)?;
        let children = self.wali_santri(wali_id)?;
        Ok(WaliReport {
            children: self.progress_of(&children)?,
            wali,
        })
    }
}
