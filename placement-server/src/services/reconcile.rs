//! Submission reconciliation
//!
//! A submission is matched against existing profiles on registration
//! number, email and national ID (any of the three). No match creates a
//! profile, a single match is overwritten in place, and matches on more
//! than one profile are refused without touching anything.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use placement_common::{time, Error, Result, StudentProfile};

use crate::db::{outbox, profiles, WriteTransaction};
use crate::notify::{Notification, NotificationKind};
use crate::submission::ProfileSubmission;

/// Upper bound on regenerating a colliding unique ID
const MAX_UNIQUE_ID_ATTEMPTS: usize = 8;

pub const AMBIGUOUS_MATCH_MESSAGE: &str =
    "Submitted identifiers match different existing profiles. Contact the placement cell.";

/// What to do with a submission given the profiles it matches
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Create,
    Update(StudentProfile),
    Conflict,
}

/// Pure decision over the match set
pub fn decide(mut matches: Vec<StudentProfile>) -> Decision {
    matches.sort_by(|a, b| a.id.cmp(&b.id));
    matches.dedup_by(|a, b| a.id == b.id);

    match matches.len() {
        0 => Decision::Create,
        1 => Decision::Update(matches.remove(0)),
        _ => Decision::Conflict,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Created(StudentProfile),
    Updated(StudentProfile),
}

impl SubmissionOutcome {
    pub fn into_profile(self) -> StudentProfile {
        match self {
            SubmissionOutcome::Created(p) | SubmissionOutcome::Updated(p) => p,
        }
    }
}

/// `prefix` followed by 8 uppercase hex digits
pub fn generate_unique_id(prefix: &str) -> String {
    format!("{}{:08X}", prefix, rand::random::<u32>())
}

fn notification_for(kind: NotificationKind, profile: &StudentProfile) -> Notification {
    Notification {
        kind,
        recipient: profile.email.clone(),
        full_name: profile.full_name.clone(),
        unique_id: profile.unique_id.clone(),
        registration_number: profile.registration_number.clone(),
    }
}

/// Create or update the profile for a validated submission
///
/// Lookup, write and the outbox row share one immediate transaction, so
/// concurrent submissions for the same person serialize on the write lock
/// and the later one sees the earlier one's row.
pub async fn submit(
    pool: &SqlitePool,
    submission: &ProfileSubmission,
    unique_id_prefix: &str,
) -> Result<SubmissionOutcome> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result = reconcile(&mut tx, submission, unique_id_prefix, time::now()).await;
    let outcome = tx.finish(result).await?;

    match &outcome {
        SubmissionOutcome::Created(p) => {
            info!(unique_id = %p.unique_id, "Registered {}", p.registration_number)
        }
        SubmissionOutcome::Updated(p) => {
            info!(unique_id = %p.unique_id, "Updated {}", p.registration_number)
        }
    }
    Ok(outcome)
}

async fn reconcile(
    conn: &mut SqliteConnection,
    submission: &ProfileSubmission,
    unique_id_prefix: &str,
    now: DateTime<Utc>,
) -> Result<SubmissionOutcome> {
    let keys = submission.identity();
    let matches = profiles::find_matching(&mut *conn, &keys).await?;

    match decide(matches) {
        Decision::Conflict => {
            info!(
                registration_number = %keys.registration_number,
                "Submission refused: identifiers match more than one profile"
            );
            Err(Error::Conflict(AMBIGUOUS_MATCH_MESSAGE.to_string()))
        }
        Decision::Update(existing) => {
            profiles::overwrite_submission(&mut *conn, existing.id, submission, now).await?;
            let updated = profiles::get_by_id(&mut *conn, existing.id)
                .await?
                .ok_or_else(|| {
                    Error::Internal(format!("Profile {} vanished during update", existing.id))
                })?;
            let notification = notification_for(NotificationKind::Updated, &updated);
            outbox::insert(&mut *conn, &notification, now).await?;
            Ok(SubmissionOutcome::Updated(updated))
        }
        Decision::Create => {
            let unique_id = fresh_unique_id(&mut *conn, unique_id_prefix).await?;
            let profile = profiles::new_profile(submission, unique_id, now);
            profiles::insert(&mut *conn, &profile).await?;
            let notification = notification_for(NotificationKind::Registered, &profile);
            outbox::insert(&mut *conn, &notification, now).await?;
            Ok(SubmissionOutcome::Created(profile))
        }
    }
}

async fn fresh_unique_id(conn: &mut SqliteConnection, prefix: &str) -> Result<String> {
    for _ in 0..MAX_UNIQUE_ID_ATTEMPTS {
        let candidate = generate_unique_id(prefix);
        if !profiles::unique_id_exists(&mut *conn, &candidate).await? {
            return Ok(candidate);
        }
        debug!("Unique ID {} already taken, regenerating", candidate);
    }
    Err(Error::Internal(format!(
        "Could not allocate a free unique ID after {} attempts",
        MAX_UNIQUE_ID_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use placement_common::{Gender, InterviewStatus};
    use uuid::Uuid;

    fn profile(registration_number: &str) -> StudentProfile {
        let now = Utc::now();
        StudentProfile {
            id: Uuid::new_v4(),
            unique_id: generate_unique_id("NCE-"),
            full_name: "Test".into(),
            father_name: "Parent".into(),
            registration_number: registration_number.into(),
            email: format!("{}@example.com", registration_number),
            phone: "1".into(),
            alternate_phone: "2".into(),
            guardian_phone: None,
            gender: Gender::Other,
            date_of_birth: NaiveDate::from_ymd_opt(2002, 1, 1).unwrap(),
            branch: "CSE".into(),
            college: "NCE".into(),
            batch: "2021-2025".into(),
            current_cgpa: 7.0,
            active_backlogs: 0,
            national_id: "000000000000".into(),
            secondary_percentage: "80".into(),
            secondary_institute: "A".into(),
            secondary_board: "B".into(),
            higher_secondary_percentage: "80".into(),
            higher_secondary_institute: "C".into(),
            higher_secondary_board: "D".into(),
            resume_link: None,
            linkedin_profile: None,
            portfolio_link: None,
            is_present: false,
            interview_status: InterviewStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(vec![]), Decision::Create);

        let one = profile("R1");
        assert_eq!(decide(vec![one.clone()]), Decision::Update(one.clone()));

        // Same row returned twice still counts as one match
        assert_eq!(decide(vec![one.clone(), one.clone()]), Decision::Update(one));

        assert_eq!(decide(vec![profile("R1"), profile("R2")]), Decision::Conflict);
    }

    #[test]
    fn test_unique_id_format() {
        let id = generate_unique_id("NCE-");
        assert_eq!(id.len(), 12);
        assert!(id.starts_with("NCE-"));
        assert!(id[4..].chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));

        assert!(generate_unique_id("DRV").starts_with("DRV"));
    }
}
