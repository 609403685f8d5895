//! Report Routes
//!
//! - GET /api/reports/dashboard - Store counters and top students (?top)
//! - GET /api/reports/santri/:id - Progress of one student
//! - GET /api/reports/guru/:id - Progress of a teacher's students
//! - GET /api/reports/wali/:id - Progress of a guardian's children
//! - GET /api/reports/monthly - Completions per month (?months, default 6)

use axum::{
    extract::State,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    DashboardQuery, DashboardResponse, GuruReportResponse, MonthlyQuery, ProgressResponse,
    WaliReportResponse,
};
use crate::api::extract::{ApiPath, ApiQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::reports::{MonthlyPoint, DEFAULT_MONTHS, DEFAULT_TOP_SANTRI, MAX_MONTHS};

/// GET /api/reports/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> ApiResult<Json<DashboardResponse>> {
    let top = query.top.unwrap_or(DEFAULT_TOP_SANTRI).min(100);
    let dashboard = state.db(move |store| store.dashboard(top)).await?;

    Ok(Json(DashboardResponse {
        stats: dashboard.stats.into(),
        top_santri: dashboard.top_santri.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/reports/santri/:id
pub async fn santri_report(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ProgressResponse>> {
    let progress = state
        .db(move |store| store.santri_progress_report(id))
        .await?;
    Ok(Json(progress.into()))
}

/// GET /api/reports/guru/:id
pub async fn guru_report(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<GuruReportResponse>> {
    let report = state.db(move |store| store.guru_report(id)).await?;
    Ok(Json(GuruReportResponse {
        guru: report.guru.into(),
        average_completion: report.average_completion,
        santri: report.santri.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/reports/wali/:id
pub async fn wali_report(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<WaliReportResponse>> {
    let report = state.db(move |store| store.wali_report(id)).await?;
    Ok(Json(WaliReportResponse {
        wali: report.wali.into(),
        children: report.children.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/reports/monthly
pub async fn monthly(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<MonthlyQuery>,
) -> ApiResult<Json<Vec<MonthlyPoint>>> {
    let months = validate_months(query.months)?;
    let points = state.db(move |store| store.monthly_report(months)).await?;
    Ok(Json(points))
}

fn validate_months(months: Option<u32>) -> ApiResult<u32> {
    let months = months.unwrap_or(DEFAULT_MONTHS);
    if !(1..=MAX_MONTHS).contains(&months) {
        return Err(ApiError::Validation(format!(
            "months must be between 1 and {}",
            MAX_MONTHS
        )));
    }
    Ok(months)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_months() {
        assert_eq!(validate_months(None).unwrap(), 6);
        assert_eq!(validate_months(Some(12)).unwrap(), 12);
        assert!(validate_months(Some(0)).is_err());
        assert!(validate_months(Some(MAX_MONTHS + 1)).is_err());
    }
}
