//! Interview queue
//!
//! Status writes are unconditional unless strict transitions are enabled,
//! in which case only moves in `InterviewStatus::allowed_next` (or a no-op
//! re-set) are accepted.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use placement_common::{time, Error, InterviewStatus, QueueEntry, Result, StudentProfile};

use super::STUDENT_NOT_FOUND;
use crate::db::{profiles, WriteTransaction};

/// Set a candidate's interview status from its wire literal
pub async fn set_status(
    pool: &SqlitePool,
    id: Uuid,
    raw_status: &str,
    strict: bool,
) -> Result<StudentProfile> {
    let status: InterviewStatus = raw_status.parse().map_err(Error::InvalidInput)?;

    let mut tx = WriteTransaction::begin(pool).await?;
    let result = apply_status(&mut tx, id, status, strict).await;
    let (previous, updated) = tx.finish(result).await?;

    info!(
        unique_id = %updated.unique_id,
        "Interview status {} -> {}",
        previous,
        status
    );
    Ok(updated)
}

async fn apply_status(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: InterviewStatus,
    strict: bool,
) -> Result<(InterviewStatus, StudentProfile)> {
    let current = profiles::get_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(STUDENT_NOT_FOUND.to_string()))?;

    if strict && !current.interview_status.can_move_to(status) {
        return Err(Error::Conflict(format!(
            "Cannot move interview status from {} to {}",
            current.interview_status, status
        )));
    }

    profiles::set_interview_status(&mut *conn, id, status, time::now()).await?;
    let updated = profiles::get_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(STUDENT_NOT_FOUND.to_string()))?;
    Ok((current.interview_status, updated))
}

/// Public board: present candidates that are up next or being interviewed
pub async fn board(pool: &SqlitePool) -> Result<Vec<QueueEntry>> {
    profiles::list_board(pool).await
}
