//! Confirmation notifications
//!
//! Profile writes leave a row in `notification_outbox`; the `Dispatcher`
//! drains that table in the background and hands each row to a `Notifier`.
//! Delivery failures are retried up to `max_attempts` and never reach the
//! HTTP caller.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use placement_common::time;

use crate::db::outbox;

/// Rows fetched per dispatch pass
const DISPATCH_BATCH: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Registered,
    Updated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Registered => "registered",
            NotificationKind::Updated => "updated",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::Registered => "Placement registration received",
            NotificationKind::Updated => "Placement profile updated",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(NotificationKind::Registered),
            "updated" => Ok(NotificationKind::Updated),
            other => Err(format!("unknown notification kind {:?}", other)),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmation addressed to one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub full_name: String,
    pub unique_id: String,
    pub registration_number: String,
}

impl Notification {
    pub fn body(&self) -> String {
        let action = match self.kind {
            NotificationKind::Registered => "has been received",
            NotificationKind::Updated => "has been updated",
        };
        format!(
            "Dear {},\n\nYour placement registration ({}) {}.\n\
             Your check-in code is {}. Bring it to the placement drive.\n",
            self.full_name, self.registration_number, action, self.unique_id
        )
    }
}

/// Outbox row awaiting delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: i64,
    pub attempts: i64,
    pub notification: Notification,
}

/// Delivery channel for notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log; used when no relay is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            kind = %notification.kind,
            recipient = %notification.recipient,
            unique_id = %notification.unique_id,
            "Notification (no relay configured): {}",
            notification.kind.subject()
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
    #[serde(flatten)]
    notification: &'a Notification,
}

/// POSTs each notification as JSON to a mail relay
pub struct RelayNotifier {
    http_client: reqwest::Client,
    url: String,
    from: String,
}

impl RelayNotifier {
    pub fn new(url: impl Into<String>, from: impl Into<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("placement-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        let message = RelayMessage {
            from: &self.from,
            to: &notification.recipient,
            subject: notification.kind.subject(),
            text: notification.body(),
            notification,
        };

        debug!(url = %self.url, unique_id = %notification.unique_id, "Posting to mail relay");

        self.http_client
            .post(&self.url)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Outcome of one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Background drain of the notification outbox
pub struct Dispatcher {
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
    max_attempts: i64,
    interval: Duration,
}

impl Dispatcher {
    pub fn new(
        pool: SqlitePool,
        notifier: Arc<dyn Notifier>,
        max_attempts: i64,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            notifier,
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Deliver every pending row once
    pub async fn dispatch_pending(&self) -> placement_common::Result<DispatchReport> {
        let entries = outbox::pending(&self.pool, self.max_attempts, DISPATCH_BATCH).await?;
        let mut report = DispatchReport::default();

        for entry in entries {
            match self.notifier.deliver(&entry.notification).await {
                Ok(()) => {
                    outbox::mark_delivered(&self.pool, entry.id, time::now()).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    let attempt = entry.attempts + 1;
                    if attempt >= self.max_attempts {
                        warn!(
                            outbox_id = entry.id,
                            recipient = %entry.notification.recipient,
                            "Giving up on notification after {} attempts: {}",
                            attempt,
                            e
                        );
                    } else {
                        warn!(
                            outbox_id = entry.id,
                            attempt,
                            "Notification delivery failed: {}",
                            e
                        );
                    }
                    outbox::mark_failed(&self.pool, entry.id, &e.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run dispatch passes on the configured interval until `shutdown` flips
    ///
    /// A pass in flight is abandoned when shutdown arrives. Rows are only
    /// marked after delivery, so an abandoned row is retried on the next
    /// start (at-least-once).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Notification dispatcher started (interval {:?}, max attempts {})",
            self.interval, self.max_attempts
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            tokio::select! {
                result = self.dispatch_pending() => match result {
                    Ok(report) if report.delivered + report.failed > 0 => {
                        debug!(
                            delivered = report.delivered,
                            failed = report.failed,
                            "Dispatch pass complete"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Dispatch pass failed: {}", e),
                },
                _ = shutdown.wait_for(|stop| *stop) => {
                    info!("Shutdown during dispatch pass, pending rows stay queued");
                    break;
                }
            }
        }

        info!("Notification dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: NotificationKind) -> Notification {
        Notification {
            kind,
            recipient: "asha@example.com".to_string(),
            full_name: "Asha Kumari".to_string(),
            unique_id: "NCE-0A1B2C3D".to_string(),
            registration_number: "21105128007".to_string(),
        }
    }

    #[test]
    fn test_kind_literals() {
        for kind in [NotificationKind::Registered, NotificationKind::Updated] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("deleted".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn test_body_mentions_code() {
        let body = sample(NotificationKind::Registered).body();
        assert!(body.contains("NCE-0A1B2C3D"));
        assert!(body.contains("has been received"));
        assert!(sample(NotificationKind::Updated).body().contains("has been updated"));
    }

    #[test]
    fn test_relay_message_shape() {
        let notification = sample(NotificationKind::Updated);
        let message = RelayMessage {
            from: "cell@example.com",
            to: &notification.recipient,
            subject: notification.kind.subject(),
            text: notification.body(),
            notification: &notification,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["to"], "asha@example.com");
        assert_eq!(json["kind"], "updated");
        assert_eq!(json["uniqueId"], "NCE-0A1B2C3D");
        assert_eq!(json["subject"], "Placement profile updated");
    }
}
