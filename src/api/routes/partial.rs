//! Partial Hafalan Routes
//!
//! - GET /api/partial-hafalan - List partials (?santri_id, ?kaca_id, ?status)
//! - POST /api/partial-hafalan - Start a partial on an ayat
//! - PUT /api/partial-hafalan/:id - Update progress text / percentage
//! - DELETE /api/partial-hafalan/:id - Delete a partial
//! - POST /api/partial-hafalan/:id/complete - Finish the ayat
//! - POST /api/partial-hafalan/:id/cancel - Abandon the partial

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    CompletePartialResponse, CreatePartialRequest, PartialQuery, PartialResponse,
    UpdatePartialRequest,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{NewPartial, Paged, PartialFilter, PartialStatus};

/// GET /api/partial-hafalan
pub async fn list_partials(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PartialQuery>,
) -> ApiResult<Json<Paged<PartialResponse>>> {
    let filter = PartialFilter {
        santri_id: query.santri_id,
        kaca_id: query.kaca_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };
    let page = state.page(query.page, query.limit);

    let partials = state
        .db(move |store| store.list_partials(&filter, page))
        .await?;
    Ok(Json(partials.map(PartialResponse::from)))
}

/// POST /api/partial-hafalan
pub async fn create_partial(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreatePartialRequest>,
) -> ApiResult<(StatusCode, Json<PartialResponse>)> {
    let new = NewPartial {
        santri_id: req.santri_id,
        kaca_id: req.kaca_id,
        ayat_number: req.ayat_number,
        progress: req.progress.trim().to_string(),
        percentage: req.percentage,
        guru_id: req.guru_id,
    };
    let partial = state.db(move |store| store.create_partial(new)).await?;

    tracing::info!(
        partial_id = partial.id,
        santri_id = partial.santri_id,
        kaca_id = partial.kaca_id,
        ayat = partial.ayat_number,
        "Created partial hafalan"
    );
    Ok((StatusCode::CREATED, Json(partial.into())))
}

/// PUT /api/partial-hafalan/:id
pub async fn update_partial(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdatePartialRequest>,
) -> ApiResult<Json<PartialResponse>> {
    if req.progress.is_none() && req.percentage.is_none() {
        return Err(ApiError::Validation(
            "Nothing to update: provide progress or percentage".to_string(),
        ));
    }
    let partial = state
        .db(move |store| store.update_partial(id, req.progress, req.percentage))
        .await?;
    Ok(Json(partial.into()))
}

/// DELETE /api/partial-hafalan/:id
pub async fn delete_partial(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db(move |store| store.delete_partial(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/partial-hafalan/:id/complete
pub async fn complete_partial(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<CompletePartialResponse>> {
    let (partial, record) = state.db(move |store| store.complete_partial(id)).await?;
    Ok(Json(CompletePartialResponse {
        partial: partial.into(),
        hafalan: record.into(),
    }))
}

/// POST /api/partial-hafalan/:id/cancel
pub async fn cancel_partial(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PartialResponse>> {
    let partial = state.db(move |store| store.cancel_partial(id)).await?;
    Ok(Json(partial.into()))
}

fn parse_status(s: &str) -> ApiResult<PartialStatus> {
    s.parse()
        .map_err(|_| ApiError::Validation(format!("Invalid partial status: {}", s)))
}
