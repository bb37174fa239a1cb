//! Notification dispatcher tests

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tokio::sync::watch;

use helpers::*;
use placement_server::db::outbox;
use placement_server::notify::{
    Dispatcher, DispatchReport, LogNotifier, Notification, NotificationKind, Notifier,
};
use placement_server::services::reconcile;

/// Records deliveries; fails the first `failures` calls
struct RecordingNotifier {
    failures: usize,
    calls: AtomicUsize,
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            anyhow::bail!("relay unavailable (call {})", call);
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Blocks every delivery far longer than any test waits
struct StalledNotifier {
    started: AtomicUsize,
}

#[async_trait]
impl Notifier for StalledNotifier {
    async fn deliver(&self, _notification: &Notification) -> anyhow::Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

async fn seeded_pool() -> SqlitePool {
    let pool = memory_pool().await;
    reconcile::submit(&pool, &submission(valid_body()), "NCE-")
        .await
        .unwrap();
    pool
}

async fn outbox_state(pool: &SqlitePool) -> (i64, Option<String>, Option<String>) {
    let row = sqlx::query("SELECT attempts, last_error, delivered_at FROM notification_outbox")
        .fetch_one(pool)
        .await
        .unwrap();
    (row.get("attempts"), row.get("last_error"), row.get("delivered_at"))
}

#[tokio::test]
async fn test_dispatch_delivers_and_marks_row() {
    let pool = seeded_pool().await;
    let notifier = RecordingNotifier::failing(0);
    let dispatcher = Dispatcher::new(pool.clone(), notifier.clone(), 3, Duration::from_secs(60));

    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report, DispatchReport { delivered: 1, failed: 0 });

    let delivered = notifier.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].kind, NotificationKind::Registered);
    assert_eq!(delivered[0].recipient, "asha.kumari@example.com");

    let (attempts, last_error, delivered_at) = outbox_state(&pool).await;
    assert_eq!(attempts, 1);
    assert!(last_error.is_none());
    assert!(delivered_at.is_some());

    // Nothing left to send
    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report, DispatchReport::default());
}

#[tokio::test]
async fn test_dispatch_retries_after_failure() {
    let pool = seeded_pool().await;
    let notifier = RecordingNotifier::failing(1);
    let dispatcher = Dispatcher::new(pool.clone(), notifier.clone(), 3, Duration::from_secs(60));

    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report, DispatchReport { delivered: 0, failed: 1 });
    let (attempts, last_error, delivered_at) = outbox_state(&pool).await;
    assert_eq!(attempts, 1);
    assert!(last_error.unwrap().contains("relay unavailable"));
    assert!(delivered_at.is_none());

    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report, DispatchReport { delivered: 1, failed: 0 });
    let (attempts, last_error, delivered_at) = outbox_state(&pool).await;
    assert_eq!(attempts, 2);
    assert!(last_error.is_none());
    assert!(delivered_at.is_some());
}

#[tokio::test]
async fn test_dispatch_gives_up_after_max_attempts() {
    let pool = seeded_pool().await;
    let notifier = RecordingNotifier::failing(usize::MAX);
    let dispatcher = Dispatcher::new(pool.clone(), notifier.clone(), 2, Duration::from_secs(60));

    dispatcher.dispatch_pending().await.unwrap();
    dispatcher.dispatch_pending().await.unwrap();
    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report, DispatchReport::default());

    assert_eq!(notifier.calls.load(Ordering::SeqCst), 2);
    assert!(outbox::pending(&pool, 2, 10).await.unwrap().is_empty());
    let (attempts, _, delivered_at) = outbox_state(&pool).await;
    assert_eq!(attempts, 2);
    assert!(delivered_at.is_none());
}

#[tokio::test]
async fn test_log_notifier_always_delivers() {
    let pool = seeded_pool().await;
    let dispatcher =
        Dispatcher::new(pool.clone(), Arc::new(LogNotifier), 1, Duration::from_secs(60));
    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report.delivered, 1);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let pool = seeded_pool().await;
    let notifier = RecordingNotifier::failing(0);
    let dispatcher = Dispatcher::new(pool.clone(), notifier.clone(), 3, Duration::from_millis(10));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(dispatcher.run(rx));

    // First tick fires immediately
    for _ in 0..100 {
        if !notifier.delivered.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(notifier.delivered.lock().unwrap().len(), 1);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_interrupts_stalled_delivery() {
    let pool = seeded_pool().await;
    let notifier = Arc::new(StalledNotifier { started: AtomicUsize::new(0) });
    let dispatcher = Dispatcher::new(pool.clone(), notifier.clone(), 3, Duration::from_millis(10));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(dispatcher.run(rx));

    for _ in 0..100 {
        if notifier.started.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(notifier.started.load(Ordering::SeqCst), 1);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("dispatcher blocked shutdown on a stalled delivery")
        .unwrap();

    // The interrupted row is still queued for the next run
    let (attempts, last_error, delivered_at) = outbox_state(&pool).await;
    assert_eq!(attempts, 0);
    assert!(last_error.is_none());
    assert!(delivered_at.is_none());
    assert_eq!(outbox::pending(&pool, 3, 10).await.unwrap().len(), 1);
}
