//! Business operations behind the HTTP handlers

pub mod attendance;
pub mod queue;
pub mod reconcile;

pub use attendance::CheckIn;
pub use reconcile::{Decision, SubmissionOutcome};

pub const STUDENT_NOT_FOUND: &str = "Student not found";
