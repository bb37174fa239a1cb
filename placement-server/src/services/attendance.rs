//! Drive-day attendance

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use placement_common::{time, Error, Result, StudentProfile};

use super::STUDENT_NOT_FOUND;
use crate::db::profiles;

/// Result of scanning a candidate's code
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub student: StudentProfile,
    pub already_present: bool,
}

fn invalid_code(unique_id: &str) -> Error {
    Error::NotFound(format!("Invalid code: {}", unique_id))
}

/// Explicit admin toggle
pub async fn set_presence(pool: &SqlitePool, id: Uuid, is_present: bool) -> Result<StudentProfile> {
    if !profiles::set_presence(pool, id, is_present, time::now()).await? {
        return Err(Error::NotFound(STUDENT_NOT_FOUND.to_string()));
    }
    let profile = profiles::get_by_id(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(STUDENT_NOT_FOUND.to_string()))?;

    info!(unique_id = %profile.unique_id, "Presence set to {}", is_present);
    Ok(profile)
}

/// Exact, case-sensitive lookup of a scanned code
pub async fn lookup(pool: &SqlitePool, unique_id: &str) -> Result<StudentProfile> {
    profiles::get_by_unique_id(pool, unique_id)
        .await?
        .ok_or_else(|| invalid_code(unique_id))
}

/// Mark a scanned candidate present; idempotent for repeat scans
pub async fn check_in(pool: &SqlitePool, unique_id: &str) -> Result<CheckIn> {
    let marked = profiles::mark_present_if_absent(pool, unique_id, time::now()).await?;
    let student = lookup(pool, unique_id).await?;

    if marked {
        info!(unique_id = %unique_id, "Checked in {}", student.full_name);
    }

    Ok(CheckIn {
        student,
        already_present: !marked,
    })
}
