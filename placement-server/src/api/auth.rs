//! Bearer credential middleware for the admin routes
//!
//! Expects `Authorization: Bearer <username>.<expires_ms>.<digest>` and puts
//! the validated `AdminClaims` into the request extensions.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use placement_common::api::auth::{validate_token, AdminClaims, ApiAuthError};
use placement_common::time;

use crate::error::ApiError;
use crate::AppState;

/// Claims used for every request while authentication is disabled
fn anonymous_claims() -> AdminClaims {
    AdminClaims {
        username: "anonymous".to_string(),
        expires_at: i64::MAX,
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware
///
/// A shared secret of 0 disables checking.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.shared_secret == 0 {
        request.extensions_mut().insert(anonymous_claims());
        return Ok(next.run(request).await);
    }

    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("Authorization required".to_string()))?;

    let claims = validate_token(token, state.shared_secret, time::now_millis()).map_err(|e| {
        match &e {
            ApiAuthError::Expired { .. } => {
                debug!("Rejected credential: {}", e);
                ApiError::Unauthorized("Credential expired".to_string())
            }
            _ => {
                warn!("Rejected credential: {}", e);
                ApiError::Unauthorized("Invalid credential".to_string())
            }
        }
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
