//! # Repository HTTP Service
//!
//! A small resource repository served over HTTP with Axum, whose every
//! generated URI reflects what the client actually used, even behind a
//! reverse proxy:
//!
//! - **Origin resolution**: `X-Forwarded-Proto`, `X-Forwarded-Host` and
//!   `Forwarded` rewrite the scheme, host and port of generated URIs
//! - **Fail-open parsing**: malformed forwarding headers are logged and ignored
//! - **Uniform errors**: one policy maps error kinds to status codes and
//!   plain-text bodies
//! - **Observability**: request IDs, structured logging, Prometheus counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS → Body Limit)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, resources, namespaces)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ForwardedUriInfo<RequestUriInfo> (per-request extractor)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Repository (in-memory, behind RwLock)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use repository_http::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
//!     let app = build_router(AppState::new(config));
//!
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod uri_info;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::{Config, LogFormat};
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
pub use uri_info::{ForwardedUriInfo, OriginOverride, RequestUriInfo, UriBuilder, UriInfo};
