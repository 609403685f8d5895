//! Ayat Lock Resolver
//!
//! Decides whether an ayat can be recorded for a student, given that
//! student's partial hafalan entries:
//!
//! - **partial**: an `IN_PROGRESS` partial exists for exactly that ayat
//! - **sequential**: an `IN_PROGRESS` partial exists at a strictly lower ayat
//!   on the same kaca, so later ayat wait until it is finished
//! - otherwise the ayat is unlocked
//!
//! Completed and cancelled partials never lock anything.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::{Kaca, PartialHafalan};

/// Why an ayat is locked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    Partial,
    Sequential,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockType::Partial => write!(f, "partial"),
            LockType::Sequential => write!(f, "sequential"),
        }
    }
}

/// Lock state of one ayat on a kaca
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AyatLock {
    pub ayat: u32,
    pub lock: Option<LockType>,
    /// The partial that blocks this ayat, if any
    pub partial_id: Option<i64>,
    pub memorized: bool,
}

/// Lock state of every ayat on a kaca for one student
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KacaLockMap {
    pub kaca_id: i64,
    pub lowest_active_ayat: Option<u32>,
    pub ayat: Vec<AyatLock>,
}

/// The in-progress partial for exactly this ayat on this kaca
pub fn active_partial_for_ayat(
    partials: &[PartialHafalan],
    kaca_id: i64,
    ayat: u32,
) -> Option<&PartialHafalan> {
    partials
        .iter()
        .find(|p| p.kaca_id == kaca_id && p.ayat_number == ayat && p.is_active())
}

/// The lowest ayat number with an in-progress partial on this kaca
pub fn lowest_active_partial_ayat(partials: &[PartialHafalan], kaca_id: i64) -> Option<u32> {
    lowest_active_partial(partials, kaca_id).map(|p| p.ayat_number)
}

fn lowest_active_partial(partials: &[PartialHafalan], kaca_id: i64) -> Option<&PartialHafalan> {
    partials
        .iter()
        .filter(|p| p.kaca_id == kaca_id && p.is_active())
        .min_by_key(|p| p.ayat_number)
}

/// Lock type of an ayat, `None` when it may be recorded
pub fn ayat_lock_type(partials: &[PartialHafalan], kaca_id: i64, ayat: u32) -> Option<LockType> {
    resolve(partials, kaca_id, ayat).map(|(lock, _)| lock)
}

fn resolve(partials: &[PartialHafalan], kaca_id: i64, ayat: u32) -> Option<(LockType, i64)> {
    if let Some(p) = active_partial_for_ayat(partials, kaca_id, ayat) {
        return Some((LockType::Partial, p.id));
    }

    match lowest_active_partial(partials, kaca_id) {
        Some(lowest) if ayat > lowest.ayat_number => Some((LockType::Sequential, lowest.id)),
        _ => None,
    }
}

/// Lock state for every ayat on `kaca`
pub fn kaca_lock_map(
    partials: &[PartialHafalan],
    kaca: &Kaca,
    completed_verses: &[u32],
) -> KacaLockMap {
    let ayat = kaca
        .ayat_numbers()
        .map(|n| {
            let resolved = resolve(partials, kaca.id, n);
            AyatLock {
                ayat: n,
                lock: resolved.map(|(lock, _)| lock),
                partial_id: resolved.map(|(_, id)| id),
                memorized: completed_verses.contains(&n),
            }
        })
        .collect();

    KacaLockMap {
        kaca_id: kaca.id,
        lowest_active_ayat: lowest_active_partial_ayat(partials, kaca.id),
        ayat,
    }
}
