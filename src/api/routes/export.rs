//! Export Routes
//!
//! - GET /api/export/progress - Santri progress as a CSV attachment (?guru_id)

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::ExportQuery;
use crate::api::extract::ApiQuery;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::reports::progress_csv;

/// GET /api/export/progress
pub async fn export_progress(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> ApiResult<Response> {
    let guru_id = query.guru_id;
    let rows = state.db(move |store| store.progress_rows(guru_id)).await?;
    let body = progress_csv(&rows)?;

    let filename = format!(
        "hafalan_progress_{}.csv",
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    tracing::info!(rows = rows.len(), guru_id = ?guru_id, "Exported progress CSV");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from(body),
    )
        .into_response())
}
