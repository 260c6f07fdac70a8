//! Stream client
//!
//! Establishes the backend connection and forwards decoded events over a
//! channel that the UI loop polls. The stream itself is newline-delimited
//! JSON over a long-lived HTTP response. Reconnection is a retry policy
//! attached to channel establishment: bounded attempts with linearly
//! increasing backoff, after which the session parks in an error state
//! until the consumer restarts ingestion.

use std::time::Duration;

use crossbeam_channel::Sender;
use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::events::StreamEvent;

/// Stream client failure taxonomy
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to connect to event stream: {0}")]
    Connect(String),
    #[error("failed to upload document: {0}")]
    Upload(String),
    #[error("reconnection attempts exhausted after {attempts} tries")]
    RetriesExhausted { attempts: u32 },
}

/// Bounded linear-backoff reconnection policy
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given attempt (1-based): `attempt x base delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Whether to reconnect after the given number of connection failures.
    /// `max_attempts` failures are retried; one more ends the session, so
    /// a configured bound of N yields exactly N reconnections.
    pub fn should_retry(&self, failures: u32) -> bool {
        failures <= self.max_attempts
    }
}

/// Connect to the event stream and forward events until the stream ends.
///
/// Individual undecodable lines are dropped with a warning; connection loss
/// triggers reconnection per the policy. When the attempts are exhausted a
/// synthetic `error` event is emitted so the overlay surfaces the
/// disconnected state, and the function returns.
pub async fn run_stream(
    base_url: &str,
    session_id: &str,
    session_header: &str,
    policy: ReconnectPolicy,
    sender: Sender<StreamEvent>,
) -> Result<(), StreamError> {
    let url = format!("{}/invoices/events", base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let mut attempt: u32 = 0;

    loop {
        match connect_and_forward(&client, &url, session_id, session_header, &sender).await {
            Ok(()) => {
                info!("Event stream closed by backend");
                return Ok(());
            }
            Err(err) => {
                attempt += 1;
                if !policy.should_retry(attempt) {
                    error!(
                        "Event stream lost and {} reconnection attempts exhausted: {}",
                        policy.max_attempts, err
                    );
                    let _ = sender.send(StreamEvent::Error {
                        message: Some("Connection to recognition backend lost".to_string()),
                    });
                    return Err(StreamError::RetriesExhausted {
                        attempts: policy.max_attempts,
                    });
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "Event stream error ({}), reconnecting in {:?} (attempt {}/{})",
                    err, delay, attempt, policy.max_attempts
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// One connection: read the NDJSON body line by line and forward events.
/// Returns `Ok(())` when the backend closes the stream cleanly.
async fn connect_and_forward(
    client: &reqwest::Client,
    url: &str,
    session_id: &str,
    session_header: &str,
    sender: &Sender<StreamEvent>,
) -> Result<(), StreamError> {
    let response = client
        .get(url)
        .header(session_header, session_id)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| StreamError::Connect(e.to_string()))?;

    info!("Connected to event stream at {}", url);

    let mut stream = response.bytes_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StreamError::Connect(e.to_string()))?;
        buffer.extend_from_slice(&chunk);

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<StreamEvent>(line) {
                Ok(event) => {
                    debug!("Stream event: {:?}", event);
                    if sender.send(event).is_err() {
                        // Consumer gone, treat as a clean shutdown
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!("Dropping undecodable stream line: {} ({})", line, e);
                }
            }
        }
    }

    Ok(())
}

/// HTTP fallback when the stream is unavailable: upload the document and
/// treat the response body as a `processing_complete` payload.
pub async fn process_via_http(
    base_url: &str,
    session_id: &str,
    session_header: &str,
    file_bytes: Vec<u8>,
) -> Result<serde_json::Value, StreamError> {
    let url = format!("{}/invoices/pdf2json", base_url.trim_end_matches('/'));
    info!("Uploading document to {} ({} bytes)", url, file_bytes.len());

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .header(session_header, session_id)
        .header(reqwest::header::CONTENT_TYPE, "application/pdf")
        .body(file_bytes)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| StreamError::Upload(e.to_string()))?;

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| StreamError::Upload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_increases_linearly() {
        let policy = ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(2000));
    }

    #[test]
    fn test_retry_bound_counts_reconnections() {
        let policy = ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        };
        // One failure per loop iteration; exactly 5 of them are retried
        let reconnects = (1u32..).take_while(|&f| policy.should_retry(f)).count();
        assert_eq!(reconnects, 5);

        let single = ReconnectPolicy {
            max_attempts: 1,
            ..policy
        };
        assert!(single.should_retry(1), "a bound of 1 performs one reconnect");
        assert!(!single.should_retry(2));

        let none = ReconnectPolicy {
            max_attempts: 0,
            ..policy
        };
        assert!(!none.should_retry(1));
    }

    #[test]
    fn test_error_display() {
        let err = StreamError::RetriesExhausted { attempts: 5 };
        assert!(err.to_string().contains("5"));
    }
}
