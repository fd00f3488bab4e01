//! Realtime push channel with bounded auto-reconnect.
//!
//! Connects to the inventory service's `/realtime` endpoint and streams
//! parsed [`ChannelMessage`]s through a [`tokio::sync::broadcast`] channel.
//! Transient drops are retried a bounded number of times with a fixed
//! delay; an authorization rejection stops the loop permanently.
//!
//! # Example
//!
//! ```rust,ignore
//! use stockline_api::channel::{ChannelHandle, ReconnectConfig, channel_url};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let base = Url::parse("https://inventory.example.edu")?;
//! let url = channel_url(&base, "opaque-session-token")?;
//!
//! let cancel = CancellationToken::new();
//! let handle = ChannelHandle::connect(url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(msg) = rx.recv().await {
//!     println!("{msg:?}");
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::events::{ChannelMessage, indicates_invalid_token, parse_frame};

const MESSAGE_CHANNEL_CAPACITY: usize = 1024;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Fixed-delay reconnection policy.
///
/// Retries are bounded: after `max_attempts` consecutive failures the
/// loop reports [`ChannelMessage::RetriesExhausted`] and exits. A
/// successfully opened connection resets the counter.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay between reconnection attempts. Default: 1s.
    pub delay: Duration,

    /// Consecutive failed attempts before giving up. Default: 5.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

// ── URL construction ─────────────────────────────────────────────────

/// Derive the channel URL from the service base URL and session token.
///
/// Swaps the scheme to `ws`/`wss` and passes the token as a connection
/// query parameter, the way the service authorizes channel upgrades.
pub fn channel_url(base: &Url, token: &str) -> Result<Url, Error> {
    let mut url = base.clone();
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::ChannelConnect(format!(
                "unsupported URL scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::ChannelConnect("URL scheme rejected".into()))?;
    url.set_path("/realtime");
    url.set_query(None);
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

// ── ChannelHandle ────────────────────────────────────────────────────

/// Handle to a running channel loop.
///
/// Subscribe for messages, cancel the token (or call
/// [`shutdown`](Self::shutdown)) to tear down. Teardown is idempotent --
/// the underlying connection closes exactly once.
pub struct ChannelHandle {
    message_rx: broadcast::Receiver<Arc<ChannelMessage>>,
    cancel: CancellationToken,
}

impl ChannelHandle {
    /// Spawn the channel loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously -- subscribe
    /// to start consuming messages.
    pub fn connect(url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (message_tx, message_rx) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            channel_loop(url, &message_tx, &reconnect, &task_cancel).await;
        });

        Self { message_rx, cancel }
    }

    /// Get a new broadcast receiver for the message stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChannelMessage>> {
        self.message_rx.resubscribe()
    }

    /// Signal the loop to shut down. Safe to call more than once.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Connection loop ──────────────────────────────────────────────────

/// Why a single connection ended.
enum ReadOutcome {
    /// Server close frame or stream end; reconnect immediately.
    CleanClose,
    /// The service rejected the token. Do not reconnect.
    AuthStop { message: String },
}

async fn channel_loop(
    url: Url,
    message_tx: &broadcast::Sender<Arc<ChannelMessage>>,
    reconnect: &ReconnectConfig,
    cancel: &CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, message_tx, cancel, &mut attempt) => {
                match result {
                    Ok(ReadOutcome::CleanClose) => {
                        tracing::info!("channel disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Ok(ReadOutcome::AuthStop { message }) => {
                        tracing::warn!(%message, "channel rejected session token, stopping");
                        let _ = message_tx.send(Arc::new(ChannelMessage::AuthRejected { message }));
                        break;
                    }
                    Err(e) => {
                        attempt += 1;
                        tracing::warn!(error = %e, attempt, "channel error");

                        if attempt >= reconnect.max_attempts {
                            tracing::error!(
                                max_attempts = reconnect.max_attempts,
                                "channel reconnection limit reached, giving up"
                            );
                            let _ = message_tx.send(Arc::new(ChannelMessage::RetriesExhausted));
                            break;
                        }

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(reconnect.delay) => {}
                        }
                    }
                }
            }
        }
    }

    tracing::debug!("channel loop exiting");
}

/// Establish one connection, read frames until it drops.
///
/// `attempt` is zeroed once the upgrade succeeds, so only consecutive
/// failed handshakes count toward the reconnect limit.
async fn connect_and_read(
    url: &Url,
    message_tx: &broadcast::Sender<Arc<ChannelMessage>>,
    cancel: &CancellationToken,
    attempt: &mut u32,
) -> Result<ReadOutcome, Error> {
    tracing::debug!(host = url.host_str().unwrap_or("<none>"), "connecting to channel");

    let (ws_stream, _response) = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok(ok) => ok,
        Err(tungstenite::Error::Http(response))
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            // The upgrade itself was refused on auth grounds: terminal.
            return Ok(ReadOutcome::AuthStop {
                message: format!("channel upgrade rejected (HTTP {})", response.status()),
            });
        }
        Err(e) => return Err(Error::ChannelConnect(e.to_string())),
    };

    tracing::info!("channel connected");
    *attempt = 0;

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(ReadOutcome::CleanClose),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        match parse_frame(&text) {
                            Some(ChannelMessage::AuthRejected { message }) => {
                                return Ok(ReadOutcome::AuthStop { message });
                            }
                            Some(msg) => {
                                // Send errors just mean no subscribers yet.
                                let _ = message_tx.send(Arc::new(msg));
                            }
                            None => {}
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers pongs automatically
                        tracing::trace!("channel ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "channel close frame");
                            if indicates_invalid_token(&cf.reason) {
                                return Ok(ReadOutcome::AuthStop {
                                    message: cf.reason.to_string(),
                                });
                            }
                        } else {
                            tracing::info!("channel close frame (no payload)");
                        }
                        return Ok(ReadOutcome::CleanClose);
                    }
                    Some(Err(e)) => {
                        return Err(Error::ChannelConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("channel stream ended");
                        return Ok(ReadOutcome::CleanClose);
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_secs(1));
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn channel_url_swaps_scheme_and_carries_token() {
        let base = Url::parse("https://inventory.example.edu").unwrap();
        let url = channel_url(&base, "tok-123").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/realtime");
        assert_eq!(url.query(), Some("token=tok-123"));

        let base = Url::parse("http://localhost:5000/api").unwrap();
        let url = channel_url(&base, "t").unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/realtime");
    }

    #[test]
    fn channel_url_rejects_odd_schemes() {
        let base = Url::parse("ftp://inventory.example.edu").unwrap();
        assert!(channel_url(&base, "t").is_err());
    }
}
