//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ApiConfig;
use crate::storage::{Page, StorageError, Store};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// SQLite-backed store
    pub store: Arc<Store>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: ApiConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Page request clamped to the configured maximum page size
    pub fn page(&self, page: Option<u32>, limit: Option<u32>) -> Page {
        Page::new(page, limit, self.config.max_page_size)
    }

    /// Run a store operation on the blocking thread pool
    pub async fn db<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> Result<T, StorageError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ApiError::Internal(format!("Database task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}
