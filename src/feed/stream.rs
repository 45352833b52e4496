//! Reconnecting WebSocket stream
//!
//! Keeps a feed connection alive indefinitely: exchanges drop
//! long-lived connections, so a closed stream is rejoined the same way
//! a failed one is, with exponential backoff between attempts.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Stream connection configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Maximum reconnection attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnection attempt
    pub initial_reconnect_delay: Duration,
    /// Backoff cap between reconnection attempts
    pub max_reconnect_delay: Duration,
    /// Interval for keepalive pings
    pub ping_interval: Duration,
}

impl StreamConfig {
    /// Create a config with the given URL and default resilience policy
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        }
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }

    /// Set maximum reconnection delay
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_reconnect_delay = d;
        self
    }

    /// Set keepalive ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }
}

/// Events surfaced to the stream consumer
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A text frame from the server
    Frame(String),
    /// Connection established
    Connected,
    /// Reconnection attempts exhausted, stream is done
    Exhausted,
    /// Reconnecting after a drop
    Reconnecting { attempt: u32 },
}

#[derive(Debug, Error)]
enum StreamError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("stream closed by server")]
    Closed,
}

/// WebSocket client that owns the reconnection loop
pub struct StreamClient {
    config: StreamConfig,
}

impl StreamClient {
    /// Create a client with the given configuration
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// The configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return a receiver of stream events
    ///
    /// Spawns a background task that reconnects with exponential
    /// backoff until the receiver is dropped or the attempt budget is
    /// exhausted.
    pub fn connect(&self) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        tokio::spawn(async move {
            Self::run(config, tx).await;
        });

        rx
    }

    async fn run(config: StreamConfig, tx: mpsc::Sender<StreamEvent>) {
        let mut attempts: u32 = 0;
        let mut delay = config.initial_reconnect_delay;

        loop {
            match Self::stream_once(&config, &tx).await {
                Ok(()) => {
                    // Receiver dropped; nothing left to do
                    return;
                }
                Err(e) => {
                    // Server drops (including clean closes) are rejoined:
                    // a price feed has no useful "done" state
                    if !matches!(e, StreamError::Connect(_)) {
                        // The previous connection was established, so the
                        // backoff starts fresh
                        attempts = 0;
                        delay = config.initial_reconnect_delay;
                    }
                    attempts += 1;
                    tracing::warn!(error = %e, attempt = attempts, "Feed stream dropped, reconnecting");

                    if config.max_reconnect_attempts > 0 && attempts >= config.max_reconnect_attempts
                    {
                        tracing::error!("Feed reconnection attempts exhausted");
                        let _ = tx.send(StreamEvent::Exhausted).await;
                        return;
                    }
                    if tx.is_closed() {
                        return;
                    }

                    let _ = tx.send(StreamEvent::Reconnecting { attempt: attempts }).await;
                    sleep(delay).await;
                    delay = (delay * 2).min(config.max_reconnect_delay);
                }
            }
        }
    }

    /// Run one connection until it drops
    ///
    /// Ok means the receiver went away; any server-side end is an Err
    /// so the caller reconnects.
    async fn stream_once(
        config: &StreamConfig,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> Result<(), StreamError> {
        tracing::info!(url = %config.url, "Connecting feed stream");

        let (ws_stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        if tx.send(StreamEvent::Connected).await.is_err() {
            return Ok(());
        }

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it
        ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(StreamEvent::Frame(text)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write
                                .send(Message::Pong(data))
                                .await
                                .map_err(|e| StreamError::Transport(e.to_string()))?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            return Err(StreamError::Closed);
                        }
                        Some(Ok(_)) => {
                            // Pong and binary frames carry nothing for us
                        }
                        Some(Err(e)) => {
                            return Err(StreamError::Transport(e.to_string()));
                        }
                        None => {
                            return Err(StreamError::Closed);
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    write
                        .send(Message::Ping(vec![]))
                        .await
                        .map_err(|e| StreamError::Transport(e.to_string()))?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StreamConfig::new("wss://example.com");
        assert_eq!(config.url, "wss://example.com");
        assert_eq!(config.max_reconnect_attempts, 0);
        assert_eq!(config.initial_reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_config_builder_chain() {
        let config = StreamConfig::new("wss://example.com")
            .max_reconnects(3)
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(10))
            .ping_interval(Duration::from_secs(20));

        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.initial_reconnect_delay, Duration::from_millis(100));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(10));
        assert_eq!(config.ping_interval, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_unreachable_host_exhausts_attempts() {
        let client = StreamClient::new(
            StreamConfig::new("wss://invalid.localhost.test:12345")
                .max_reconnects(2)
                .initial_delay(Duration::from_millis(10)),
        );

        let mut rx = client.connect();
        let mut exhausted = false;
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::Exhausted => {
                        exhausted = true;
                        break;
                    }
                    StreamEvent::Reconnecting { .. } => continue,
                    _ => {}
                }
            }
        })
        .await;

        result.expect("test timed out");
        assert!(exhausted, "should surface exhausted reconnect budget");
    }
}
