//! Database initialization and constraint helpers

pub mod init;

pub use init::*;

/// Column named by a UNIQUE constraint violation, if `err` is one
///
/// SQLite reports violations as `UNIQUE constraint failed: table.column`.
pub fn unique_violation_column(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    let message = db_err.message();
    let column = message
        .rsplit(':')
        .next()
        .map(str::trim)
        .and_then(|qualified| qualified.split(',').next())
        .map(|qualified| qualified.rsplit('.').next().unwrap_or(qualified).trim().to_string())
        .filter(|c| !c.is_empty());
    Some(column.unwrap_or_else(|| "unknown".to_string()))
}
