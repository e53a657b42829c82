//! # Racestage HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /courses` - Courses of the event
//! - `GET /splits?course=N` - Stage splits of a course
//! - `GET /chart?course=N&filter=field:value` - Live stage/status counts
//! - `POST /report` - Stage/status counts for records in the body
//! - `POST /classify` - Classify a single record
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `RACESTAGE_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `RACESTAGE_RATE_LIMIT`: Requests per second (default: 20, 0 to disable)
//! - `RACESTAGE_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ChartParams, ClassifyRequest, ClassifyResponse, ErrorResponse, HealthResponse,
    MAX_REPORT_PARTICIPANTS, ReportRequest, SplitsParams,
};

use crate::config::SplitRange;
use crate::provider::RaceSource;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use racestage_core::StageError;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable listing allowed CORS origins.
const CORS_ORIGINS_ENV: &str = "RACESTAGE_CORS_ORIGINS";

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// Holds no counters: each report request builds and drops its own.
#[derive(Clone)]
pub struct AppState {
    /// Where race data comes from.
    pub source: Arc<dyn RaceSource>,
    /// Split numbers treated as stages.
    pub splits: SplitRange,
}

impl AppState {
    #[must_use]
    pub fn new(source: Arc<dyn RaceSource>, splits: SplitRange) -> Self {
        Self { source, splits }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `RACESTAGE_CORS_ORIGINS`.
///
/// - `*`: any origin
/// - unset: localhost only
/// - otherwise: comma-separated origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var(CORS_ORIGINS_ENV).ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins ({}=*)", CORS_ORIGINS_ENV);
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins in {}, using localhost", CORS_ORIGINS_ENV);
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => build_localhost_cors(),
    }
}

/// CORS layer allowing only local dashboards.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit,
/// rate limiting (if enabled), API key (if configured).
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/courses", get(handlers::courses_handler))
        .route("/splits", get(handlers::splits_handler))
        .route("/chart", get(handlers::chart_handler))
        .route("/report", post(handlers::report_handler))
        .route("/classify", post(handlers::classify_handler));

    match get_api_key_from_env() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!("API key authentication disabled"),
    }

    match create_rate_limiter(get_rate_limit_from_env()) {
        Some(limiter) => {
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(16 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), StageError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StageError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Racestage HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| StageError::IoError(format!("Server error: {}", e)))
}
