//! Notification outbox queries
//!
//! Rows are written in the same transaction as the profile change they
//! describe and drained later by the dispatcher.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteExecutor};

use placement_common::{time, Error, Result};

use crate::notify::{Notification, NotificationKind, OutboxEntry};

pub async fn insert<'e>(
    exec: impl SqliteExecutor<'e>,
    notification: &Notification,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO notification_outbox
            (kind, recipient, full_name, unique_id, registration_number, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(notification.kind.as_str())
    .bind(&notification.recipient)
    .bind(&notification.full_name)
    .bind(&notification.unique_id)
    .bind(&notification.registration_number)
    .bind(time::to_storage(&now))
    .execute(exec)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Undelivered rows that still have attempts left, oldest first
pub async fn pending<'e>(
    exec: impl SqliteExecutor<'e>,
    max_attempts: i64,
    limit: i64,
) -> Result<Vec<OutboxEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, kind, recipient, full_name, unique_id, registration_number, attempts
        FROM notification_outbox
        WHERE delivered_at IS NULL AND attempts < ?
        ORDER BY id ASC
        LIMIT ?
        "#,
    )
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(exec)
    .await?;

    rows.iter()
        .map(|row| {
            let kind: String = row.try_get("kind")?;
            let kind: NotificationKind = kind.parse().map_err(Error::Internal)?;
            Ok(OutboxEntry {
                id: row.try_get("id")?,
                attempts: row.try_get("attempts")?,
                notification: Notification {
                    kind,
                    recipient: row.try_get("recipient")?,
                    full_name: row.try_get("full_name")?,
                    unique_id: row.try_get("unique_id")?,
                    registration_number: row.try_get("registration_number")?,
                },
            })
        })
        .collect()
}

pub async fn mark_delivered<'e>(
    exec: impl SqliteExecutor<'e>,
    id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE notification_outbox
        SET delivered_at = ?, attempts = attempts + 1, last_error = NULL
        WHERE id = ?
        "#,
    )
    .bind(time::to_storage(&now))
    .bind(id)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_failed<'e>(exec: impl SqliteExecutor<'e>, id: i64, error: &str) -> Result<()> {
    sqlx::query("UPDATE notification_outbox SET attempts = attempts + 1, last_error = ? WHERE id = ?")
        .bind(error)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}
