//! Database initialization
//!
//! Opens (creating if needed) the SQLite file and ensures every table
//! exists. Schema creation is idempotent and runs on each startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How long a writer waits for another writer's lock before giving up
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the database file and create tables if needed
///
/// Every pooled connection gets WAL and the busy timeout, so concurrent
/// writers queue on the lock instead of failing.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true)
                .busy_timeout(BUSY_TIMEOUT)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
        )
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables on an already-open pool
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_student_profiles_table(pool).await?;
    create_notification_outbox_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application key-value pairs (credential signing secret).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_student_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS student_profiles (
            id TEXT PRIMARY KEY,
            unique_id TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            father_name TEXT NOT NULL,
            registration_number TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            alternate_phone TEXT NOT NULL,
            guardian_phone TEXT,
            gender TEXT NOT NULL CHECK (gender IN ('Male', 'Female', 'Other')),
            date_of_birth TEXT NOT NULL,
            branch TEXT NOT NULL,
            college TEXT NOT NULL,
            batch TEXT NOT NULL,
            current_cgpa REAL NOT NULL CHECK (current_cgpa >= 0 AND current_cgpa <= 10),
            active_backlogs INTEGER NOT NULL DEFAULT 0 CHECK (active_backlogs >= 0),
            national_id TEXT NOT NULL UNIQUE
                CHECK (length(national_id) = 12 AND national_id NOT GLOB '*[^0-9]*'),
            secondary_percentage TEXT NOT NULL,
            secondary_institute TEXT NOT NULL,
            secondary_board TEXT NOT NULL,
            higher_secondary_percentage TEXT NOT NULL,
            higher_secondary_institute TEXT NOT NULL,
            higher_secondary_board TEXT NOT NULL,
            resume_link TEXT,
            linkedin_profile TEXT,
            portfolio_link TEXT,
            is_present INTEGER NOT NULL DEFAULT 0,
            interview_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (interview_status IN ('pending', 'next', 'in_interview', 'completed')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_student_profiles_board
         ON student_profiles (is_present, interview_status, updated_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_notification_outbox_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK (kind IN ('registered', 'updated')),
            recipient TEXT NOT NULL,
            full_name TEXT NOT NULL,
            unique_id TEXT NOT NULL,
            registration_number TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL,
            delivered_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
