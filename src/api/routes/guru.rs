//! Guru Routes
//!
//! - GET /api/guru - List teachers (?search, ?page, ?limit)
//! - POST /api/guru - Create a teacher
//! - GET /api/guru/:id - Get a teacher
//! - PUT /api/guru/:id - Update a teacher
//! - DELETE /api/guru/:id - Delete a teacher
//! - GET /api/admin/guru/:id/santri - Santri assigned to a teacher
//! - PUT /api/admin/guru/:id/santri - Replace the assigned santri

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    AssignSantriRequest, CreateGuruRequest, GuruQuery, GuruResponse, SantriResponse,
    UpdateGuruRequest,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::users::{non_empty, user_update, validate_email, validate_name};
use crate::api::state::AppState;
use crate::storage::{GuruUpdate, NewGuru, Paged};

/// GET /api/guru
pub async fn list_gurus(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<GuruQuery>,
) -> ApiResult<Json<Paged<GuruResponse>>> {
    let page = state.page(query.page, query.limit);
    let gurus = state
        .db(move |store| store.list_gurus(query.search.as_deref(), page))
        .await?;
    Ok(Json(gurus.map(GuruResponse::from)))
}

/// GET /api/guru/:id
pub async fn get_guru(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<GuruResponse>> {
    let guru = state.db(move |store| store.get_guru(id)).await?;
    Ok(Json(guru.into()))
}

/// POST /api/guru
pub async fn create_guru(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateGuruRequest>,
) -> ApiResult<(StatusCode, Json<GuruResponse>)> {
    validate_name(&req.name)?;
    validate_email(&req.email)?;

    let guru = state
        .db(move |store| {
            store.create_guru(NewGuru {
                name: req.name.trim().to_string(),
                email: req.email.trim().to_lowercase(),
                phone: non_empty(req.phone),
                nip: non_empty(req.nip),
            })
        })
        .await?;

    tracing::info!(guru_id = guru.id, "Created guru");
    Ok((StatusCode::CREATED, Json(guru.into())))
}

/// PUT /api/guru/:id
pub async fn update_guru(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateGuruRequest>,
) -> ApiResult<Json<GuruResponse>> {
    let update = GuruUpdate {
        user: user_update(req.name, req.email, req.phone)?,
        nip: req.nip.map(|n| n.trim().to_string()),
    };
    let guru = state.db(move |store| store.update_guru(id, update)).await?;
    Ok(Json(guru.into()))
}

/// DELETE /api/guru/:id
pub async fn delete_guru(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db(move |store| store.delete_guru(id)).await?;
    tracing::info!(guru_id = id, "Deleted guru");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/guru/:id/santri
pub async fn get_assigned_santri(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<SantriResponse>>> {
    let santri = state.db(move |store| store.guru_santri(id)).await?;
    Ok(Json(santri.into_iter().map(SantriResponse::from).collect()))
}

/// PUT /api/admin/guru/:id/santri
///
/// Santri left out of `santri_ids` lose this teacher.
pub async fn assign_santri(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AssignSantriRequest>,
) -> ApiResult<Json<Vec<SantriResponse>>> {
    let mut ids = req.santri_ids;
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    if ids.len() != before {
        return Err(ApiError::Validation(
            "santri_ids contains duplicates".to_string(),
        ));
    }

    let santri = state
        .db(move |store| store.assign_santri(id, &ids))
        .await?;
    Ok(Json(santri.into_iter().map(SantriResponse::from).collect()))
}
