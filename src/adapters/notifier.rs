//! Notification/analytics sink: reports run-level events to an external
//! channel (Slack, email bridge). Failures are logged and never block the
//! Scheduler (spec.md §7 "no error from any external collaborator may
//! abort the run").

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::core::errors::Result;
use crate::core::stats::RunStats;

/// A run-completion or milestone event.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    /// Short human-readable summary.
    pub summary: String,
    /// Snapshot of the run stats at the time of the event.
    pub stats: RunStats,
}

#[async_trait]
/// Sink for run/issue notifications (spec.md §1's "notification... sinks").
pub trait Notifier: Send + Sync {
    /// Deliver `event`. Implementations should never panic; adapter-level
    /// failures are returned as `Err` and logged by the caller, not
    /// propagated into the Scheduler.
    async fn notify(&self, event: NotificationEvent) -> Result<()>;
}

/// Webhook-backed notifier.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    /// Build a notifier posting to `webhook_url`.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<()> {
        if let Err(err) = self.client.post(&self.webhook_url).json(&event).send().await {
            warn!("notifier webhook delivery failed: {err}");
        }
        Ok(())
    }
}

/// No-op notifier used by tests and when no webhook is configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _event: NotificationEvent) -> Result<()> {
        Ok(())
    }
}
