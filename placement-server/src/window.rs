//! Submission window
//!
//! The cutoff instant comes from configuration and is carried in the
//! application state. Submissions at or after the cutoff are refused;
//! the status query is always answered.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmissionWindow {
    deadline: Option<DateTime<Utc>>,
}

/// Body of `GET /placement/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStatus {
    pub is_open: bool,
    pub message: String,
    pub deadline: Option<DateTime<Utc>>,
}

impl SubmissionWindow {
    pub fn new(deadline: Option<DateTime<Utc>>) -> Self {
        Self { deadline }
    }

    /// A window with no cutoff
    pub fn always_open() -> Self {
        Self { deadline: None }
    }

    pub fn closing_at(deadline: DateTime<Utc>) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) => now < deadline,
            None => true,
        }
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> WindowStatus {
        let is_open = self.is_open_at(now);
        let message = if is_open {
            "Registration is open".to_string()
        } else {
            "Registration is closed. The submission deadline has passed.".to_string()
        };
        WindowStatus {
            is_open,
            message,
            deadline: self.deadline,
        }
    }
}
