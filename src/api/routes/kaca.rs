//! Kaca Routes
//!
//! - GET /api/kaca - List pages by page number (?juz, ?page, ?limit)
//! - POST /api/kaca - Create a page
//! - GET /api/kaca/:id - Get a page
//! - PUT /api/kaca/:id - Update a page
//! - DELETE /api/kaca/:id - Delete an unreferenced page

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CreateKacaRequest, KacaQuery, KacaResponse, UpdateKacaRequest};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{KacaUpdate, NewKaca, Paged, MAX_JUZ};

/// GET /api/kaca
pub async fn list_kaca(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<KacaQuery>,
) -> ApiResult<Json<Paged<KacaResponse>>> {
    if let Some(juz) = query.juz {
        validate_juz(juz)?;
    }
    let page = state.page(query.page, query.limit);
    let kaca = state
        .db(move |store| store.list_kaca(query.juz, page))
        .await?;
    Ok(Json(kaca.map(KacaResponse::from)))
}

/// GET /api/kaca/:id
pub async fn get_kaca(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<KacaResponse>> {
    let kaca = state.db(move |store| store.get_kaca(id)).await?;
    Ok(Json(kaca.into()))
}

/// POST /api/kaca
pub async fn create_kaca(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateKacaRequest>,
) -> ApiResult<(StatusCode, Json<KacaResponse>)> {
    let new = NewKaca {
        page_number: req.page_number,
        juz: req.juz,
        surah_name: req.surah_name.trim().to_string(),
        ayat_start: req.ayat_start,
        ayat_end: req.ayat_end,
        description: req.description.filter(|d| !d.trim().is_empty()),
    };
    let kaca = state.db(move |store| store.create_kaca(new)).await?;

    tracing::info!(kaca_id = kaca.id, page = kaca.page_number, "Created kaca");
    Ok((StatusCode::CREATED, Json(kaca.into())))
}

/// PUT /api/kaca/:id
pub async fn update_kaca(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateKacaRequest>,
) -> ApiResult<Json<KacaResponse>> {
    let update = KacaUpdate {
        page_number: req.page_number,
        juz: req.juz,
        surah_name: req.surah_name.map(|s| s.trim().to_string()),
        ayat_start: req.ayat_start,
        ayat_end: req.ayat_end,
        description: req.description,
    };
    let kaca = state.db(move |store| store.update_kaca(id, update)).await?;
    Ok(Json(kaca.into()))
}

/// DELETE /api/kaca/:id
pub async fn delete_kaca(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db(move |store| store.delete_kaca(id)).await?;
    tracing::info!(kaca_id = id, "Deleted kaca");
    Ok(StatusCode::NO_CONTENT)
}

fn validate_juz(juz: u32) -> ApiResult<()> {
    if !(1..=MAX_JUZ).contains(&juz) {
        return Err(ApiError::Validation(format!(
            "juz must be between 1 and {}",
            MAX_JUZ
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_juz() {
        assert!(validate_juz(1).is_ok());
        assert!(validate_juz(30).is_ok());
        assert!(validate_juz(0).is_err());
        assert!(validate_juz(31).is_err());
    }
}
