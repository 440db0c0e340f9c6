//! Log tailing command.
//!
//! Subscribes to the channel the API publishes log lines on and prints each
//! line to stdout as it arrives. Runs until interrupted or the connection drops.

use futures::StreamExt;
use thiserror::Error;

/// Errors that can occur while tailing logs.
#[derive(Debug, Error)]
pub enum LogsError {
    /// Connecting or subscribing failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Subscribe to `channel` on `redis_url` and print every message.
///
/// # Errors
///
/// Returns `LogsError` if the URL is invalid or the subscription fails.
pub async fn tail(redis_url: &str, channel: &str) -> Result<(), LogsError> {
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;

    tracing::info!(channel, "Subscribed, waiting for log lines");

    let mut messages = pubsub.on_message();
    loop {
        tokio::select! {
            message = messages.next() => {
                let Some(message) = message else {
                    tracing::warn!("Subscription closed");
                    break;
                };
                print_line(&render(&message));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Payload as text; non-UTF-8 payloads are shown lossily.
fn render(message: &redis::Msg) -> String {
    message
        .get_payload::<String>()
        .unwrap_or_else(|_| String::from_utf8_lossy(message.get_payload_bytes()).into_owned())
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}
