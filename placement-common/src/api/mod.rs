//! Shared admin-credential functionality
//!
//! Pure functions plus the settings-table accessors for the signing
//! secret. The axum middleware wrapping these lives in the server crate.

pub mod auth;

pub use auth::{
    calculate_digest, initialize_shared_secret, issue_token, load_shared_secret, validate_token,
    AdminClaims, ApiAuthError,
};
