//! Student profile store
//!
//! All writes go through `map_write_error` so that a UNIQUE violation
//! surfaces as `Error::Duplicate` naming the field rather than a raw database error.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqliteExecutor};
use uuid::Uuid;

use placement_common::db::unique_violation_column;
use placement_common::{time, Error, Gender, InterviewStatus, QueueEntry, Result, StudentProfile};

use crate::error::field_name;
use crate::submission::{IdentityKeys, ProfileSubmission};

const PROFILE_COLUMNS: &str = r#"
    id, unique_id, full_name, father_name, registration_number, email,
    phone, alternate_phone, guardian_phone, gender, date_of_birth,
    branch, college, batch, current_cgpa, active_backlogs, national_id,
    secondary_percentage, secondary_institute, secondary_board,
    higher_secondary_percentage, higher_secondary_institute, higher_secondary_board,
    resume_link, linkedin_profile, portfolio_link,
    is_present, interview_status, created_at, updated_at
"#;

fn map_write_error(err: sqlx::Error) -> Error {
    match unique_violation_column(&err) {
        Some(column) => Error::Duplicate {
            field: field_name(&column).to_string(),
        },
        None => Error::Database(err),
    }
}

fn decode_err(column: &str, detail: impl std::fmt::Display) -> Error {
    Error::Internal(format!("Failed to decode {}: {}", column, detail))
}

fn row_to_profile(row: &SqliteRow) -> Result<StudentProfile> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).map_err(|e| decode_err("id", e))?;

    let gender: String = row.try_get("gender")?;
    let gender: Gender = gender.parse().map_err(|e| decode_err("gender", e))?;

    let date_of_birth: String = row.try_get("date_of_birth")?;
    let date_of_birth = NaiveDate::parse_from_str(&date_of_birth, "%Y-%m-%d")
        .map_err(|e| decode_err("date_of_birth", e))?;

    let interview_status: String = row.try_get("interview_status")?;
    let interview_status: InterviewStatus = interview_status
        .parse()
        .map_err(|e| decode_err("interview_status", e))?;

    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(StudentProfile {
        id,
        unique_id: row.try_get("unique_id")?,
        full_name: row.try_get("full_name")?,
        father_name: row.try_get("father_name")?,
        registration_number: row.try_get("registration_number")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        alternate_phone: row.try_get("alternate_phone")?,
        guardian_phone: row.try_get("guardian_phone")?,
        gender,
        date_of_birth,
        branch: row.try_get("branch")?,
        college: row.try_get("college")?,
        batch: row.try_get("batch")?,
        current_cgpa: row.try_get("current_cgpa")?,
        active_backlogs: row.try_get("active_backlogs")?,
        national_id: row.try_get("national_id")?,
        secondary_percentage: row.try_get("secondary_percentage")?,
        secondary_institute: row.try_get("secondary_institute")?,
        secondary_board: row.try_get("secondary_board")?,
        higher_secondary_percentage: row.try_get("higher_secondary_percentage")?,
        higher_secondary_institute: row.try_get("higher_secondary_institute")?,
        higher_secondary_board: row.try_get("higher_secondary_board")?,
        resume_link: row.try_get("resume_link")?,
        linkedin_profile: row.try_get("linkedin_profile")?,
        portfolio_link: row.try_get("portfolio_link")?,
        is_present: row.try_get("is_present")?,
        interview_status,
        created_at: time::parse(&created_at)?,
        updated_at: time::parse(&updated_at)?,
    })
}

/// Build the record for a brand-new submission
pub fn new_profile(
    submission: &ProfileSubmission,
    unique_id: String,
    now: DateTime<Utc>,
) -> StudentProfile {
    let s = submission.clone();
    StudentProfile {
        id: Uuid::new_v4(),
        unique_id,
        full_name: s.full_name,
        father_name: s.father_name,
        registration_number: s.registration_number,
        email: s.email,
        phone: s.phone,
        alternate_phone: s.alternate_phone,
        guardian_phone: s.guardian_phone,
        gender: s.gender,
        date_of_birth: s.date_of_birth,
        branch: s.branch,
        college: s.college,
        batch: s.batch,
        current_cgpa: s.current_cgpa,
        active_backlogs: s.active_backlogs,
        national_id: s.national_id,
        secondary_percentage: s.secondary_percentage,
        secondary_institute: s.secondary_institute,
        secondary_board: s.secondary_board,
        higher_secondary_percentage: s.higher_secondary_percentage,
        higher_secondary_institute: s.higher_secondary_institute,
        higher_secondary_board: s.higher_secondary_board,
        resume_link: s.resume_link,
        linkedin_profile: s.linkedin_profile,
        portfolio_link: s.portfolio_link,
        is_present: false,
        interview_status: InterviewStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

/// All profiles matching ANY of the three identifiers
pub async fn find_matching<'e>(
    exec: impl SqliteExecutor<'e>,
    keys: &IdentityKeys,
) -> Result<Vec<StudentProfile>> {
    let sql = format!(
        "SELECT {} FROM student_profiles
         WHERE registration_number = ? OR email = ? OR national_id = ?",
        PROFILE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(&keys.registration_number)
        .bind(&keys.email)
        .bind(&keys.national_id)
        .fetch_all(exec)
        .await?;

    rows.iter().map(row_to_profile).collect()
}

pub async fn unique_id_exists<'e>(exec: impl SqliteExecutor<'e>, unique_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_profiles WHERE unique_id = ?")
        .bind(unique_id)
        .fetch_one(exec)
        .await?;
    Ok(count > 0)
}

pub async fn insert(conn: &mut SqliteConnection, profile: &StudentProfile) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO student_profiles (
            id, unique_id, full_name, father_name, registration_number, email,
            phone, alternate_phone, guardian_phone, gender, date_of_birth,
            branch, college, batch, current_cgpa, active_backlogs, national_id,
            secondary_percentage, secondary_institute, secondary_board,
            higher_secondary_percentage, higher_secondary_institute, higher_secondary_board,
            resume_link, linkedin_profile, portfolio_link,
            is_present, interview_status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.id.to_string())
    .bind(&profile.unique_id)
    .bind(&profile.full_name)
    .bind(&profile.father_name)
    .bind(&profile.registration_number)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(&profile.alternate_phone)
    .bind(&profile.guardian_phone)
    .bind(profile.gender.as_str())
    .bind(profile.date_of_birth.format("%Y-%m-%d").to_string())
    .bind(&profile.branch)
    .bind(&profile.college)
    .bind(&profile.batch)
    .bind(profile.current_cgpa)
    .bind(profile.active_backlogs)
    .bind(&profile.national_id)
    .bind(&profile.secondary_percentage)
    .bind(&profile.secondary_institute)
    .bind(&profile.secondary_board)
    .bind(&profile.higher_secondary_percentage)
    .bind(&profile.higher_secondary_institute)
    .bind(&profile.higher_secondary_board)
    .bind(&profile.resume_link)
    .bind(&profile.linkedin_profile)
    .bind(&profile.portfolio_link)
    .bind(profile.is_present)
    .bind(profile.interview_status.as_str())
    .bind(time::to_storage(&profile.created_at))
    .bind(time::to_storage(&profile.updated_at))
    .execute(conn)
    .await
    .map_err(map_write_error)?;

    Ok(())
}

/// Overwrite every submitted field of an existing profile
///
/// `id`, `unique_id`, presence, interview status and `created_at` are not
/// touched.
pub async fn overwrite_submission(
    conn: &mut SqliteConnection,
    id: Uuid,
    s: &ProfileSubmission,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE student_profiles SET
            full_name = ?, father_name = ?, registration_number = ?, email = ?,
            phone = ?, alternate_phone = ?, guardian_phone = ?, gender = ?, date_of_birth = ?,
            branch = ?, college = ?, batch = ?, current_cgpa = ?, active_backlogs = ?,
            national_id = ?,
            secondary_percentage = ?, secondary_institute = ?, secondary_board = ?,
            higher_secondary_percentage = ?, higher_secondary_institute = ?,
            higher_secondary_board = ?,
            resume_link = ?, linkedin_profile = ?, portfolio_link = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&s.full_name)
    .bind(&s.father_name)
    .bind(&s.registration_number)
    .bind(&s.email)
    .bind(&s.phone)
    .bind(&s.alternate_phone)
    .bind(&s.guardian_phone)
    .bind(s.gender.as_str())
    .bind(s.date_of_birth.format("%Y-%m-%d").to_string())
    .bind(&s.branch)
    .bind(&s.college)
    .bind(&s.batch)
    .bind(s.current_cgpa)
    .bind(s.active_backlogs)
    .bind(&s.national_id)
    .bind(&s.secondary_percentage)
    .bind(&s.secondary_institute)
    .bind(&s.secondary_board)
    .bind(&s.higher_secondary_percentage)
    .bind(&s.higher_secondary_institute)
    .bind(&s.higher_secondary_board)
    .bind(&s.resume_link)
    .bind(&s.linkedin_profile)
    .bind(&s.portfolio_link)
    .bind(time::to_storage(&now))
    .bind(id.to_string())
    .execute(conn)
    .await
    .map_err(map_write_error)?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_by_id<'e>(
    exec: impl SqliteExecutor<'e>,
    id: Uuid,
) -> Result<Option<StudentProfile>> {
    let sql = format!("SELECT {} FROM student_profiles WHERE id = ?", PROFILE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(row_to_profile).transpose()
}

/// Lookup by already-normalized registration number
pub async fn get_by_registration_number<'e>(
    exec: impl SqliteExecutor<'e>,
    registration_number: &str,
) -> Result<Option<StudentProfile>> {
    let sql = format!(
        "SELECT {} FROM student_profiles WHERE registration_number = ?",
        PROFILE_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(registration_number)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(row_to_profile).transpose()
}

/// Exact, case-sensitive lookup by public identifier
pub async fn get_by_unique_id<'e>(
    exec: impl SqliteExecutor<'e>,
    unique_id: &str,
) -> Result<Option<StudentProfile>> {
    let sql = format!("SELECT {} FROM student_profiles WHERE unique_id = ?", PROFILE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(unique_id)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(row_to_profile).transpose()
}

/// Every profile, newest submission first
pub async fn list_all<'e>(exec: impl SqliteExecutor<'e>) -> Result<Vec<StudentProfile>> {
    let sql = format!(
        "SELECT {} FROM student_profiles ORDER BY created_at DESC, rowid DESC",
        PROFILE_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(exec).await?;
    rows.iter().map(row_to_profile).collect()
}

pub async fn delete<'e>(exec: impl SqliteExecutor<'e>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM student_profiles WHERE id = ?")
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_presence<'e>(
    exec: impl SqliteExecutor<'e>,
    id: Uuid,
    is_present: bool,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE student_profiles SET is_present = ?, updated_at = ? WHERE id = ?")
        .bind(is_present)
        .bind(time::to_storage(&now))
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark present only if currently absent; false when already present or unknown
pub async fn mark_present_if_absent<'e>(
    exec: impl SqliteExecutor<'e>,
    unique_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE student_profiles SET is_present = 1, updated_at = ?
         WHERE unique_id = ? AND is_present = 0",
    )
    .bind(time::to_storage(&now))
    .bind(unique_id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_interview_status<'e>(
    exec: impl SqliteExecutor<'e>,
    id: Uuid,
    status: InterviewStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result =
        sqlx::query("UPDATE student_profiles SET interview_status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(time::to_storage(&now))
            .bind(id.to_string())
            .execute(exec)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Present candidates whose status `is_on_board`, oldest update first
pub async fn list_board<'e>(exec: impl SqliteExecutor<'e>) -> Result<Vec<QueueEntry>> {
    let on_board: Vec<InterviewStatus> = InterviewStatus::ALL
        .into_iter()
        .filter(InterviewStatus::is_on_board)
        .collect();
    let placeholders = vec!["?"; on_board.len()].join(", ");
    let sql = format!(
        r#"
        SELECT full_name, unique_id, interview_status, branch, batch
        FROM student_profiles
        WHERE is_present = 1 AND interview_status IN ({})
        ORDER BY updated_at ASC, rowid ASC
        "#,
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for status in &on_board {
        query = query.bind(status.as_str());
    }
    let rows = query.fetch_all(exec).await?;

    rows.iter()
        .map(|row| {
            let status: String = row.try_get("interview_status")?;
            Ok(QueueEntry {
                full_name: row.try_get("full_name")?,
                unique_id: row.try_get("unique_id")?,
                interview_status: status
                    .parse()
                    .map_err(|e| decode_err("interview_status", e))?,
                branch: row.try_get("branch")?,
                batch: row.try_get("batch")?,
            })
        })
        .collect()
}
