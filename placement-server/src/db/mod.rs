//! Database access layer for placement-server
//!
//! Schema creation lives in `placement_common::db`; this module holds the
//! queries the service runs against it.

use std::ops::{Deref, DerefMut};

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::warn;

use placement_common::Result;

pub mod outbox;
pub mod profiles;

/// Read-then-write transaction holding the SQLite write lock from the start
///
/// `BEGIN IMMEDIATE` makes overlapping writers wait on the busy timeout
/// instead of failing with SQLITE_BUSY when upgrading a read snapshot, so
/// a later writer always sees the earlier writer's rows.
pub struct WriteTransaction {
    conn: PoolConnection<Sqlite>,
    open: bool,
}

impl WriteTransaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn, open: true })
    }

    pub async fn commit(mut self) -> Result<()> {
        sqlx::query("COMMIT").execute(&mut *self.conn).await?;
        self.open = false;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        self.open = false;
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err`, and pass the result through
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!("Rollback failed after {}: {}", e, rollback_err);
                }
                Err(e)
            }
        }
    }
}

impl Deref for WriteTransaction {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        &self.conn
    }
}

impl DerefMut for WriteTransaction {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        // Dropped mid-transaction (cancelled request): closing the
        // connection rolls back instead of returning it to the pool busy.
        if self.open {
            self.conn.close_on_drop();
        }
    }
}
