//! Domain models shared between the store and the HTTP layer

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declared gender of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => Err(format!(
                "gender must be one of Male, Female, Other (got {:?})",
                other
            )),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a candidate in the interview queue
///
/// Forward flow is `pending -> next -> in_interview -> completed`, with
/// `next -> pending` as the only way back (un-queueing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    #[default]
    Pending,
    Next,
    InInterview,
    Completed,
}

impl InterviewStatus {
    pub const ALL: [InterviewStatus; 4] = [
        InterviewStatus::Pending,
        InterviewStatus::Next,
        InterviewStatus::InInterview,
        InterviewStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Pending => "pending",
            InterviewStatus::Next => "next",
            InterviewStatus::InInterview => "in_interview",
            InterviewStatus::Completed => "completed",
        }
    }

    /// States reachable in one step along the documented flow
    pub fn allowed_next(&self) -> &'static [InterviewStatus] {
        match self {
            InterviewStatus::Pending => &[InterviewStatus::Next],
            InterviewStatus::Next => &[InterviewStatus::Pending, InterviewStatus::InInterview],
            InterviewStatus::InInterview => &[InterviewStatus::Completed],
            InterviewStatus::Completed => &[],
        }
    }

    /// True when `target` is the current state or one documented step away
    pub fn can_move_to(&self, target: InterviewStatus) -> bool {
        *self == target || self.allowed_next().contains(&target)
    }

    /// Statuses shown on the public queue board
    pub fn is_on_board(&self) -> bool {
        matches!(self, InterviewStatus::Next | InterviewStatus::InInterview)
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InterviewStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "status must be one of pending, next, in_interview, completed (got {:?})",
                    s
                )
            })
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate's stored registration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub unique_id: String,
    pub full_name: String,
    pub father_name: String,
    pub registration_number: String,
    pub email: String,
    pub phone: String,
    pub alternate_phone: String,
    pub guardian_phone: Option<String>,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub branch: String,
    pub college: String,
    pub batch: String,
    pub current_cgpa: f64,
    pub active_backlogs: i64,
    pub national_id: String,
    pub secondary_percentage: String,
    pub secondary_institute: String,
    pub secondary_board: String,
    pub higher_secondary_percentage: String,
    pub higher_secondary_institute: String,
    pub higher_secondary_board: String,
    pub resume_link: Option<String>,
    pub linkedin_profile: Option<String>,
    pub portfolio_link: Option<String>,
    pub is_present: bool,
    pub interview_status: InterviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public-safe projection of a profile for the queue board
///
/// Carries no contact or identity-document fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub full_name: String,
    pub unique_id: String,
    pub interview_status: InterviewStatus,
    pub branch: String,
    pub batch: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_literals_roundtrip() {
        for status in InterviewStatus::ALL {
            assert_eq!(status.as_str().parse::<InterviewStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_status_rejects_unknown_and_case_variants() {
        assert!("done".parse::<InterviewStatus>().is_err());
        assert!("Pending".parse::<InterviewStatus>().is_err());
        assert!("in-interview".parse::<InterviewStatus>().is_err());
    }

    #[test]
    fn test_transition_table() {
        use InterviewStatus::*;
        assert!(Pending.can_move_to(Next));
        assert!(Next.can_move_to(Pending));
        assert!(Next.can_move_to(InInterview));
        assert!(InInterview.can_move_to(Completed));
        assert!(Completed.can_move_to(Completed));

        assert!(!Pending.can_move_to(InInterview));
        assert!(!InInterview.can_move_to(Pending));
        assert!(!Completed.can_move_to(Pending));
        assert!(!Completed.can_move_to(Next));
    }

    #[test]
    fn test_board_statuses() {
        assert!(!InterviewStatus::Pending.is_on_board());
        assert!(InterviewStatus::Next.is_on_board());
        assert!(InterviewStatus::InInterview.is_on_board());
        assert!(!InterviewStatus::Completed.is_on_board());
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(" Female ".parse::<Gender>().unwrap(), Gender::Female);
        assert!("female".parse::<Gender>().is_err());
    }
}
