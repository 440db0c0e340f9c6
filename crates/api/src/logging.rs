//! Tracing setup and log fan-out.
//!
//! Log events go to stdout (text locally, JSON with `LOG_FORMAT=json`), to
//! Sentry as breadcrumbs/events when a DSN is configured, and, when
//! `LOG_REDIS_URL` is set, to a Redis pub/sub channel as one line per event:
//!
//! ```text
//! 2024-05-01T12:00:00.000Z - shipments_api::routes::shipments - INFO - Shipments created successfully method=POST path=/shipments/ count=2
//! ```
//!
//! `shipments-cli logs` subscribes to that channel.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use redis::AsyncCommands;
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Errors that can occur while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log fan-out Redis URL: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global tracing subscriber.
///
/// Must run inside a tokio runtime when fan-out is enabled, since the
/// publisher is spawned as a background task.
///
/// # Errors
///
/// Returns `LoggingError` if the Redis URL is invalid or a subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shipments_api=info,tower_http=debug".into());

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.json).then(tracing_subscriber::fmt::layer);

    let fanout_layer = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.expose_secret())?;
            let (layer, receiver) = FanoutLayer::new();
            tokio::spawn(publish_lines(client, config.channel.clone(), receiver));
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(fanout_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .try_init()?;

    if let Some(url) = &config.redis_url {
        // Strip credentials before logging.
        let host = url.expose_secret().rsplit('@').next().unwrap_or_default();
        tracing::info!(channel = %config.channel, host, "Log fan-out enabled");
    }

    Ok(())
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        Level::ERROR | Level::WARN => sentry_tracing::EventFilter::Event,
        Level::INFO | Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

// =============================================================================
// Fan-out layer
// =============================================================================

/// Lines held while the publisher is behind; further lines are dropped.
pub const FANOUT_QUEUE_CAPACITY: usize = 1024;

/// A [`Layer`] that formats each event as a line and queues it for publishing.
///
/// Queuing never blocks and the queue is bounded; lines are published by
/// [`publish_lines`].
#[derive(Debug, Clone)]
pub struct FanoutLayer {
    sender: mpsc::Sender<String>,
}

impl FanoutLayer {
    /// Create a layer and the receiving end of its queue.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<String>) {
        Self::with_capacity(FANOUT_QUEUE_CAPACITY)
    }

    /// Create a layer whose queue holds at most `capacity` lines.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl<S: Subscriber> Layer<S> for FanoutLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // The publisher's own client would feed back into the channel.
        if metadata.target().starts_with("redis") {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let line = format_line(
            Utc::now(),
            metadata.target(),
            *metadata.level(),
            &visitor.finish(),
        );
        // Full queue or stopped publisher: drop the line.
        let _ = self.sender.try_send(line);
    }
}

/// Format one fan-out line: `timestamp - target - LEVEL - message`.
#[must_use]
pub fn format_line(at: DateTime<Utc>, target: &str, level: Level, message: &str) -> String {
    format!(
        "{} - {target} - {level} - {message}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Collects the `message` field followed by `key=value` pairs.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_owned()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

/// Publish queued lines to `channel` until every sender is dropped.
///
/// The connection is opened lazily and reopened after a failed publish. Lines
/// that cannot be published are dropped; the request path never waits on Redis.
pub async fn publish_lines(
    client: redis::Client,
    channel: String,
    mut receiver: mpsc::Receiver<String>,
) {
    let mut connection = None;

    while let Some(line) = receiver.recv().await {
        if connection.is_none() {
            connection = client.get_multiplexed_async_connection().await.ok();
        }

        if let Some(conn) = connection.as_mut() {
            let published: redis::RedisResult<i64> = conn.publish(&channel, &line).await;
            if published.is_err() {
                connection = None;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use tracing_subscriber::Registry;

    use super::*;

    #[test]
    fn test_format_line() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            format_line(at, "shipments_api", Level::ERROR, "Fetch error"),
            "2024-05-01T12:00:00.000Z - shipments_api - ERROR - Fetch error"
        );
    }

    #[test]
    fn test_layer_queues_formatted_events() {
        let (layer, mut receiver) = FanoutLayer::new();
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(method = "POST", count = 2, "Shipments created successfully");
        });

        let line = receiver.try_recv().unwrap();
        assert!(line.contains(" - INFO - Shipments created successfully method=POST count=2"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_layer_skips_redis_events() {
        let (layer, mut receiver) = FanoutLayer::new();
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "redis::aio", "reconnecting");
        });

        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_drops_lines_without_blocking() {
        let (layer, mut receiver) = FanoutLayer::with_capacity(2);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            for i in 0..5 {
                tracing::info!(i, "queued");
            }
        });

        assert!(receiver.try_recv().unwrap().ends_with("queued i=0"));
        assert!(receiver.try_recv().unwrap().ends_with("queued i=1"));
        assert!(receiver.try_recv().is_err());
    }
}
