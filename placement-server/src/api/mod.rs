//! HTTP API handlers for placement-server

pub mod admin;
pub mod auth;
pub mod extract;
pub mod health;
pub mod placement;
pub mod response;

pub use auth::auth_middleware;
pub use extract::ApiJson;
pub use health::health_routes;
pub use response::ApiResponse;

use uuid::Uuid;

use crate::error::ApiError;

/// Parse a profile id taken from the request path
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest("Invalid student id".to_string()))
}
