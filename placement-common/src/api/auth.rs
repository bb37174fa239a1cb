//! Admin bearer credentials
//!
//! A credential is `<username>.<expires_at_ms>.<digest>` where `digest` is
//! the hex SHA-256 of `<username>:<expires_at_ms>:<shared_secret>`. The
//! shared secret is a random non-zero i64 kept in the `settings` table under
//! `api_shared_secret`. A secret of 0 disables checking entirely.

use serde::Serialize;
use sha2::{Digest, Sha256};

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

const SECRET_KEY: &str = "api_shared_secret";

// ========================================
// Error Types
// ========================================

#[derive(Debug, Clone, PartialEq)]
pub enum ApiAuthError {
    /// Credential is not `<username>.<expires>.<digest>`
    Malformed(String),

    /// Credential expiry is in the past
    Expired { expires_at: i64, now: i64 },

    /// Digest does not match the calculated value
    InvalidDigest,

    /// Username cannot be embedded in a credential
    InvalidUsername(String),

    /// Database error loading or storing the shared secret
    DatabaseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::Malformed(reason) => write!(f, "Malformed credential: {}", reason),
            ApiAuthError::Expired { expires_at, now } => write!(
                f,
                "Credential expired {}ms ago",
                now.saturating_sub(*expires_at)
            ),
            ApiAuthError::InvalidDigest => write!(f, "Invalid credential digest"),
            ApiAuthError::InvalidUsername(name) => write!(f, "Invalid username: {:?}", name),
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

/// Identity carried by a validated credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminClaims {
    pub username: String,
    pub expires_at: i64,
}

// ========================================
// Shared Secret Management
// ========================================

/// Load the signing secret, generating and storing one if absent
#[cfg(feature = "sqlx")]
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let result: Option<(Option<String>,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(SECRET_KEY)
            .fetch_optional(db)
            .await
            .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match result {
        Some((Some(value),)) => value
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid i64: {}", e))),
        _ => initialize_shared_secret(db).await,
    }
}

/// Generate a random non-zero secret and persist it
#[cfg(feature = "sqlx")]
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let secret: i64 = {
        let mut rng = rand::thread_rng();
        loop {
            let val = rng.gen::<i64>();
            if val != 0 {
                break val;
            }
        }
    };

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(SECRET_KEY)
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Digest Calculation and Validation
// ========================================

/// Hex SHA-256 over `<username>:<expires_at_ms>:<secret>`
///
/// # Examples
///
/// ```
/// use placement_common::api::auth::calculate_digest;
///
/// let digest = calculate_digest("registrar", 1_730_000_000_000, 42);
/// assert_eq!(digest.len(), 64);
/// assert_ne!(digest, calculate_digest("registrar", 1_730_000_000_000, 43));
/// ```
pub fn calculate_digest(username: &str, expires_at_ms: i64, shared_secret: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", username, expires_at_ms, shared_secret).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Mint a credential for `username` valid until `expires_at_ms`
pub fn issue_token(
    username: &str,
    expires_at_ms: i64,
    shared_secret: i64,
) -> Result<String, ApiAuthError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '@' | '.'));
    if !valid {
        return Err(ApiAuthError::InvalidUsername(username.to_string()));
    }

    Ok(format!(
        "{}.{}.{}",
        username,
        expires_at_ms,
        calculate_digest(username, expires_at_ms, shared_secret)
    ))
}

/// Check a credential against the secret at time `now_ms`
///
/// # Examples
///
/// ```
/// use placement_common::api::auth::{issue_token, validate_token, ApiAuthError};
///
/// let token = issue_token("registrar", 2_000, 7).unwrap();
/// assert_eq!(validate_token(&token, 7, 1_000).unwrap().username, "registrar");
/// assert!(matches!(validate_token(&token, 7, 2_000), Err(ApiAuthError::Expired { .. })));
/// assert_eq!(validate_token(&token, 8, 1_000), Err(ApiAuthError::InvalidDigest));
/// ```
pub fn validate_token(
    token: &str,
    shared_secret: i64,
    now_ms: i64,
) -> Result<AdminClaims, ApiAuthError> {
    // Username may itself contain dots, so split from the right
    let mut parts = token.trim().rsplitn(3, '.');
    let (digest, expires, username) = match (parts.next(), parts.next(), parts.next()) {
        (Some(d), Some(e), Some(u)) if !u.is_empty() => (d, e, u),
        _ => {
            return Err(ApiAuthError::Malformed(
                "expected <username>.<expires>.<digest>".to_string(),
            ))
        }
    };

    let expires_at: i64 = expires
        .parse()
        .map_err(|_| ApiAuthError::Malformed(format!("bad expiry {:?}", expires)))?;

    let calculated = calculate_digest(username, expires_at, shared_secret);
    if !constant_time_eq(digest.as_bytes(), calculated.as_bytes()) {
        return Err(ApiAuthError::InvalidDigest);
    }

    if now_ms >= expires_at {
        return Err(ApiAuthError::Expired {
            expires_at,
            now: now_ms,
        });
    }

    Ok(AdminClaims {
        username: username.to_string(),
        expires_at,
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
