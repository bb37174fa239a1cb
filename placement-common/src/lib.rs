//! # Placement Common Library
//!
//! Shared code for the placement desk service and its operator tooling:
//! - Domain models (student profiles, interview status, queue entries)
//! - Database initialization and constraint helpers
//! - Bearer credential signing and validation
//! - Configuration loading
//! - Timestamp helpers

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{Gender, InterviewStatus, QueueEntry, StudentProfile};
