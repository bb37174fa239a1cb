//! placement-server library
//!
//! HTTP service for placement-drive registration and drive-day check-in:
//! candidates submit (and resubmit) their profile while the window is open,
//! and admins mark attendance and move candidates through the interview
//! queue.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use placement_common::config::{Config, DEFAULT_UNIQUE_ID_PREFIX};

pub mod api;
pub mod db;
pub mod error;
pub mod notify;
pub mod services;
pub mod submission;
pub mod window;

pub use error::{ApiError, ApiResult};
pub use window::SubmissionWindow;

/// JSON bodies larger than this are rejected
pub const BODY_LIMIT_BYTES: usize = 16 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Credential signing secret (0 disables admin authentication)
    pub shared_secret: i64,
    /// When submissions close
    pub window: SubmissionWindow,
    /// Prefix for generated check-in codes
    pub unique_id_prefix: String,
    /// Enforce the documented interview status flow
    pub strict_transitions: bool,
}

impl AppState {
    /// Create new application state with default prefix and permissive transitions
    pub fn new(db: SqlitePool, shared_secret: i64, window: SubmissionWindow) -> Self {
        Self {
            db,
            shared_secret,
            window,
            unique_id_prefix: DEFAULT_UNIQUE_ID_PREFIX.to_string(),
            strict_transitions: false,
        }
    }

    pub fn from_config(db: SqlitePool, shared_secret: i64, config: &Config) -> Self {
        Self::new(db, shared_secret, SubmissionWindow::new(config.submission.deadline))
            .with_unique_id_prefix(config.submission.unique_id_prefix.clone())
            .with_strict_transitions(config.queue.strict_transitions)
    }

    pub fn with_unique_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.unique_id_prefix = prefix.into();
        self
    }

    pub fn with_strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }
}

/// Build application router
///
/// Public registration routes under `/api/v1/placement`, admin routes
/// (bearer credential required) under `/api/v1/admin`, plus `/health`.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, patch, post};

    let placement = Router::new()
        .route("/status", get(api::placement::form_status))
        .route("/submit", post(api::placement::submit_profile))
        .route("/queue-status", get(api::placement::queue_status))
        .route("/:registration_number", get(api::placement::get_profile));

    let admin = Router::new()
        .route("/me", get(api::admin::me))
        .route("/submissions", get(api::admin::list_submissions))
        .route("/submissions/:id", delete(api::admin::delete_submission))
        .route("/verify/:id", patch(api::admin::verify_presence))
        .route("/students/:unique_id", get(api::admin::lookup_student))
        .route("/check-in/:unique_id", post(api::admin::check_in))
        .route("/queue-status/:id", patch(api::admin::update_queue_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    Router::new()
        .nest("/api/v1/placement", placement)
        .nest("/api/v1/admin", admin)
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

/// CORS for the configured frontend origin; any origin when unset
pub fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer
            .allow_origin(AllowOrigin::exact(value))
            .allow_credentials(true),
        Some(Err(_)) => {
            warn!("Ignoring unparseable CORS origin; allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
