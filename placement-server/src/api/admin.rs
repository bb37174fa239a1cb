//! Admin dashboard endpoints
//!
//! All routes here sit behind `auth_middleware`.

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use placement_common::api::auth::AdminClaims;
use placement_common::StudentProfile;

use super::{parse_id, ApiJson, ApiResponse};
use crate::db::profiles;
use crate::error::{ApiError, ApiResult};
use crate::services::{attendance, queue, CheckIn, STUDENT_NOT_FOUND};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PresenceRequest {
    pub status: bool,
}

#[derive(Debug, Deserialize)]
pub struct QueueStatusRequest {
    pub status: String,
}

/// GET /admin/me
pub async fn me(Extension(claims): Extension<AdminClaims>) -> ApiResponse<AdminClaims> {
    ApiResponse::ok(claims, "Admin fetched successfully")
}

/// GET /admin/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<StudentProfile>>> {
    let all = profiles::list_all(&state.db).await?;
    Ok(ApiResponse::ok(all, "Submissions fetched successfully"))
}

/// DELETE /admin/submissions/:id
pub async fn delete_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id(&id)?;
    if !profiles::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(STUDENT_NOT_FOUND.to_string()));
    }
    info!(admin = %claims.username, "Deleted submission {}", id);
    Ok(ApiResponse::ok(json!({}), "Submission deleted successfully"))
}

/// PATCH /admin/verify/:id
pub async fn verify_presence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PresenceRequest>,
) -> ApiResult<ApiResponse<StudentProfile>> {
    let id = parse_id(&id)?;
    let profile = attendance::set_presence(&state.db, id, body.status).await?;
    Ok(ApiResponse::ok(profile, "Presence updated"))
}

/// GET /admin/students/:uniqueId
pub async fn lookup_student(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> ApiResult<ApiResponse<StudentProfile>> {
    let profile = attendance::lookup(&state.db, &unique_id).await?;
    Ok(ApiResponse::ok(profile, "Student fetched successfully"))
}

/// POST /admin/check-in/:uniqueId
pub async fn check_in(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> ApiResult<ApiResponse<CheckIn>> {
    let result = attendance::check_in(&state.db, &unique_id).await?;
    let message = if result.already_present {
        "Already present"
    } else {
        "Marked present"
    };
    Ok(ApiResponse::ok(result, message))
}

/// PATCH /admin/queue-status/:id
pub async fn update_queue_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<QueueStatusRequest>,
) -> ApiResult<ApiResponse<StudentProfile>> {
    let id = parse_id(&id)?;
    let profile = queue::set_status(&state.db, id, &body.status, state.strict_transitions).await?;
    Ok(ApiResponse::ok(profile, "Interview status updated"))
}
