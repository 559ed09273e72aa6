//! Shared application state for Axum handlers.
//!
//! # Thread Safety
//!
//! `AppState` is cloned into every handler. The repository sits behind a
//! `tokio::sync::RwLock`; reads run concurrently, writes are exclusive.
//! Per-request URI context is not stored here: it is rebuilt for each request
//! by the [`crate::uri_info::ForwardedUriInfo`] extractor.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::repository::Repository;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Resource tree and namespace registry
    pub repository: Arc<RwLock<Repository>>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            repository: Arc::new(RwLock::new(Repository::new())),
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
