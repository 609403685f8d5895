//! Hafalan Routes
//!
//! - GET /api/hafalan - List records (?santri_id, ?kaca_id, ?status)
//! - POST /api/hafalan - Upsert the checklist for (santri, kaca)
//! - GET /api/hafalan/:id - Get a record
//! - DELETE /api/hafalan/:id - Delete a record
//! - POST /api/hafalan/:id/recheck - Teacher confirms a complete page

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{HafalanQuery, HafalanRequest, HafalanResponse, RecheckRequest};
use crate::api::extract::{optional_json, ApiJson, ApiPath, ApiQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{HafalanFilter, HafalanInput, HafalanStatus, Paged};

/// GET /api/hafalan
pub async fn list_hafalan(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<HafalanQuery>,
) -> ApiResult<Json<Paged<HafalanResponse>>> {
    let filter = HafalanFilter {
        santri_id: query.santri_id,
        kaca_id: query.kaca_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };
    let page = state.page(query.page, query.limit);

    let records = state
        .db(move |store| store.list_hafalan(&filter, page))
        .await?;
    Ok(Json(records.map(HafalanResponse::from)))
}

/// GET /api/hafalan/:id
pub async fn get_hafalan(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<HafalanResponse>> {
    let record = state.db(move |store| store.get_hafalan(id)).await?;
    Ok(Json(record.into()))
}

/// POST /api/hafalan
///
/// Creates or replaces the checklist. Newly added ayat that are locked by
/// a partial hafalan are refused with 409 `AYAT_LOCKED`.
pub async fn upsert_hafalan(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<HafalanRequest>,
) -> ApiResult<Json<HafalanResponse>> {
    let input = HafalanInput {
        santri_id: req.santri_id,
        kaca_id: req.kaca_id,
        guru_id: req.guru_id,
        completed_verses: req.completed_verses,
        notes: req.notes,
    };
    let record = state.db(move |store| store.upsert_hafalan(input)).await?;

    tracing::info!(
        hafalan_id = record.id,
        santri_id = record.santri_id,
        kaca_id = record.kaca_id,
        status = %record.status,
        "Saved hafalan"
    );
    Ok(Json(record.into()))
}

/// DELETE /api/hafalan/:id
pub async fn delete_hafalan(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db(move |store| store.delete_hafalan(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/hafalan/:id/recheck
///
/// Body is optional: `{"guru_id": 3}` records who rechecked. A body that is
/// present but not a valid `RecheckRequest` is a 400.
pub async fn recheck_hafalan(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    body: Bytes,
) -> ApiResult<Json<HafalanResponse>> {
    let guru_id = optional_json::<RecheckRequest>(&body)?.and_then(|req| req.guru_id);
    let record = state
        .db(move |store| store.recheck_hafalan(id, guru_id))
        .await?;
    Ok(Json(record.into()))
}

fn parse_status(s: &str) -> ApiResult<HafalanStatus> {
    s.parse()
        .map_err(|_| ApiError::Validation(format!("Invalid hafalan status: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("progress").unwrap(), HafalanStatus::Progress);
        assert_eq!(
            parse_status("COMPLETE_WAITING_RECHECK").unwrap(),
            HafalanStatus::CompleteWaitingRecheck
        );
        assert!(parse_status("done").is_err());
    }
}
