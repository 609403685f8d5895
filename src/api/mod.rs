//! Hafalan REST API
//!
//! HTTP API layer built with Axum. All JSON endpoints live under `/api`.
//!
//! # Endpoints
//!
//! ## People
//! - `GET|POST /api/users`, `GET|PUT|DELETE /api/users/:id`
//! - `GET|POST /api/guru`, `GET|PUT|DELETE /api/guru/:id`
//! - `GET|PUT /api/admin/guru/:id/santri` - Teacher assignments
//! - `GET|POST /api/santri`, `GET|PUT|DELETE /api/santri/:id`
//! - `GET /api/santri/:id/kaca/:kaca_id/locks` - Ayat lock map
//!
//! ## Pages and progress
//! - `GET|POST /api/kaca`, `GET|PUT|DELETE /api/kaca/:id`
//! - `GET|POST /api/hafalan`, `GET|DELETE /api/hafalan/:id`
//! - `POST /api/hafalan/:id/recheck`
//! - `GET|POST /api/partial-hafalan`, `PUT|DELETE /api/partial-hafalan/:id`
//! - `POST /api/partial-hafalan/:id/complete`, `POST /api/partial-hafalan/:id/cancel`
//!
//! ## Reports
//! - `GET /api/reports/dashboard`
//! - `GET /api/reports/santri/:id`, `/guru/:id`, `/wali/:id`
//! - `GET /api/reports/monthly`
//! - `GET /api/export/progress` - CSV download
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,no_run
//! use hafalan::api::{serve, AppState};
//! use hafalan::config::ApiConfig;
//! use hafalan::storage::Store;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(Store::open(std::path::Path::new("./hafalan.db"))?);
//!     let config = ApiConfig::default();
//!
//!     serve(AppState::new(store, config.clone()), &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Users
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/users/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        // Guru
        .route(
            "/guru",
            get(routes::guru::list_gurus).post(routes::guru::create_guru),
        )
        .route(
            "/guru/:id",
            get(routes::guru::get_guru)
                .put(routes::guru::update_guru)
                .delete(routes::guru::delete_guru),
        )
        .route(
            "/admin/guru/:id/santri",
            get(routes::guru::get_assigned_santri).put(routes::guru::assign_santri),
        )
        // Santri
        .route(
            "/santri",
            get(routes::santri::list_santri).post(routes::santri::create_santri),
        )
        .route(
            "/santri/:id",
            get(routes::santri::get_santri)
                .put(routes::santri::update_santri)
                .delete(routes::santri::delete_santri),
        )
        .route(
            "/santri/:id/kaca/:kaca_id/locks",
            get(routes::santri::get_ayat_locks),
        )
        // Kaca
        .route(
            "/kaca",
            get(routes::kaca::list_kaca).post(routes::kaca::create_kaca),
        )
        .route(
            "/kaca/:id",
            get(routes::kaca::get_kaca)
                .put(routes::kaca::update_kaca)
                .delete(routes::kaca::delete_kaca),
        )
        // Hafalan
        .route(
            "/hafalan",
            get(routes::hafalan::list_hafalan).post(routes::hafalan::upsert_hafalan),
        )
        .route(
            "/hafalan/:id",
            get(routes::hafalan::get_hafalan).delete(routes::hafalan::delete_hafalan),
        )
        .route("/hafalan/:id/recheck", post(routes::hafalan::recheck_hafalan))
        // Partial hafalan
        .route(
            "/partial-hafalan",
            get(routes::partial::list_partials).post(routes::partial::create_partial),
        )
        .route(
            "/partial-hafalan/:id",
            put(routes::partial::update_partial).delete(routes::partial::delete_partial),
        )
        .route(
            "/partial-hafalan/:id/complete",
            post(routes::partial::complete_partial),
        )
        .route(
            "/partial-hafalan/:id/cancel",
            post(routes::partial::cancel_partial),
        )
        // Reports
        .route("/reports/dashboard", get(routes::reports::dashboard))
        .route("/reports/santri/:id", get(routes::reports::santri_report))
        .route("/reports/guru/:id", get(routes::reports::guru_report))
        .route("/reports/wali/:id", get(routes::reports::wali_report))
        .route("/reports/monthly", get(routes::reports::monthly))
        // Export
        .route("/export/progress", get(routes::export::export_progress));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// CORS for the configured origins; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Hafalan API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Hafalan API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
