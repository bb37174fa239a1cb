//! Public registration endpoints

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::info;

use placement_common::{time, QueueEntry, StudentProfile};

use super::{ApiJson, ApiResponse};
use crate::db::profiles;
use crate::error::{ApiError, ApiResult};
use crate::services::{queue, reconcile, SubmissionOutcome};
use crate::submission::{normalize_registration_number, SubmissionRequest};
use crate::window::WindowStatus;
use crate::AppState;

/// GET /placement/status
pub async fn form_status(State(state): State<AppState>) -> ApiResponse<WindowStatus> {
    let status = state.window.status_at(time::now());
    let message = status.message.clone();
    ApiResponse::ok(status, message)
}

/// POST /placement/submit
///
/// The window is checked before the body is even looked at.
pub async fn submit_profile(
    State(state): State<AppState>,
    body: Result<ApiJson<SubmissionRequest>, ApiError>,
) -> ApiResult<Response> {
    let window = state.window.status_at(time::now());
    if !window.is_open {
        info!("Submission refused: window closed");
        return Err(ApiError::Forbidden(window.message));
    }

    let ApiJson(request) = body?;
    let submission = request.validate()?;

    let outcome = reconcile::submit(&state.db, &submission, &state.unique_id_prefix).await?;
    let response = match outcome {
        SubmissionOutcome::Created(profile) => {
            ApiResponse::created(profile, "Profile submitted successfully").into_response()
        }
        SubmissionOutcome::Updated(profile) => {
            ApiResponse::ok(profile, "Profile updated successfully").into_response()
        }
    };
    Ok(response)
}

/// GET /placement/queue-status
pub async fn queue_status(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<QueueEntry>>> {
    let entries = queue::board(&state.db).await?;
    Ok(ApiResponse::ok(entries, "Queue fetched successfully"))
}

/// GET /placement/:registrationNumber
pub async fn get_profile(
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> ApiResult<ApiResponse<StudentProfile>> {
    let normalized = normalize_registration_number(&registration_number);
    let profile = profiles::get_by_registration_number(&state.db, &normalized)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;
    Ok(ApiResponse::ok(profile, "Profile fetched successfully"))
}
