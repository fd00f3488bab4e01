use thiserror::Error;

/// Top-level error type for the `stockline-api` crate.
///
/// Covers every failure mode across both API surfaces: REST and the
/// realtime channel. `stockline-core` maps these into user-facing
/// diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authorization ───────────────────────────────────────────────
    /// Session token rejected or expired (HTTP 401). Terminal for the
    /// current session -- callers clear the token and re-authenticate.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// The token is valid but lacks rights for the operation (HTTP 403).
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Service ─────────────────────────────────────────────────────
    /// Non-2xx response from the service, with the body-provided message
    /// when one was present.
    #[error("Service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Realtime channel ────────────────────────────────────────────
    /// Channel connection failed.
    #[error("Channel connection failed: {0}")]
    ChannelConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String },
}

impl Error {
    /// Returns `true` if this error means the session is gone and
    /// re-authentication is the only way forward.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::ChannelConnect(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
