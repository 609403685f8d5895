//! Santri Routes
//!
//! - GET /api/santri - List students (?guru_id, ?wali_id, ?class_name, ?active)
//! - POST /api/santri - Create a student
//! - GET /api/santri/:id - Get a student
//! - PUT /api/santri/:id - Update a student
//! - DELETE /api/santri/:id - Delete a student and their records
//! - GET /api/santri/:id/kaca/:kaca_id/locks - Ayat lock map for one kaca

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CreateSantriRequest, SantriQuery, SantriResponse, UpdateSantriRequest};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::users::{non_empty, user_update, validate_email, validate_name};
use crate::api::state::AppState;
use crate::lock::KacaLockMap;
use crate::storage::{NewSantri, Paged, SantriFilter, SantriUpdate};

/// GET /api/santri
pub async fn list_santri(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SantriQuery>,
) -> ApiResult<Json<Paged<SantriResponse>>> {
    let filter = SantriFilter {
        guru_id: query.guru_id,
        wali_id: query.wali_id,
        class_name: non_empty(query.class_name),
        active: query.active,
    };
    let page = state.page(query.page, query.limit);

    let santri = state
        .db(move |store| store.list_santri(&filter, page))
        .await?;
    Ok(Json(santri.map(SantriResponse::from)))
}

/// GET /api/santri/:id
pub async fn get_santri(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<SantriResponse>> {
    let santri = state.db(move |store| store.get_santri(id)).await?;
    Ok(Json(santri.into()))
}

/// POST /api/santri
pub async fn create_santri(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateSantriRequest>,
) -> ApiResult<(StatusCode, Json<SantriResponse>)> {
    validate_name(&req.name)?;
    validate_email(&req.email)?;
    let nis = req.nis.trim().to_string();
    if nis.is_empty() {
        return Err(ApiError::Validation("NIS cannot be empty".to_string()));
    }

    let santri = state
        .db(move |store| {
            store.create_santri(NewSantri {
                name: req.name.trim().to_string(),
                email: req.email.trim().to_lowercase(),
                phone: non_empty(req.phone),
                nis,
                class_name: non_empty(req.class_name),
                guru_id: req.guru_id,
                wali_id: req.wali_id,
                birth_date: non_empty(req.birth_date),
            })
        })
        .await?;

    tracing::info!(santri_id = santri.id, nis = %santri.nis, "Created santri");
    Ok((StatusCode::CREATED, Json(santri.into())))
}

/// PUT /api/santri/:id
pub async fn update_santri(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateSantriRequest>,
) -> ApiResult<Json<SantriResponse>> {
    if let Some(nis) = &req.nis {
        if nis.trim().is_empty() {
            return Err(ApiError::Validation("NIS cannot be empty".to_string()));
        }
    }

    let update = SantriUpdate {
        user: user_update(req.name, req.email, req.phone)?,
        nis: req.nis.map(|n| n.trim().to_string()),
        class_name: req.class_name,
        guru_id: req.guru_id,
        wali_id: req.wali_id,
        birth_date: req.birth_date,
        active: req.active,
    };
    let santri = state
        .db(move |store| store.update_santri(id, update))
        .await?;
    Ok(Json(santri.into()))
}

/// DELETE /api/santri/:id
pub async fn delete_santri(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db(move |store| store.delete_santri(id)).await?;
    tracing::info!(santri_id = id, "Deleted santri");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/santri/:id/kaca/:kaca_id/locks
pub async fn get_ayat_locks(
    State(state): State<Arc<AppState>>,
    ApiPath((id, kaca_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<KacaLockMap>> {
    let locks = state
        .db(move |store| store.ayat_locks(id, kaca_id))
        .await?;
    Ok(Json(locks))
}
