// ── Core error types ──
//
// User-facing errors from stockline-core. Consumers never see raw HTTP
// statuses or JSON parse failures -- the `From<stockline_api::Error>`
// impl translates transport errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session / connection ─────────────────────────────────────────
    /// No session token is present, or the service revoked it. The
    /// stored token has already been cleared when this surfaces.
    #[error("Session expired -- sign in again")]
    AuthExpired,

    /// The session is valid but the action was refused.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Engine is not connected (or a second `connect` raced a live one).
    #[error("Not connected to the inventory service")]
    NotConnected,

    /// Transient failures exhausted their bounded retries.
    #[error("Inventory service unreachable: {reason}")]
    ServiceUnavailable { reason: String },

    // ── Service ──────────────────────────────────────────────────────
    /// Non-auth service failure, with the service-provided message when
    /// one exists.
    #[error("Service error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<stockline_api::Error> for CoreError {
    fn from(err: stockline_api::Error) -> Self {
        match err {
            stockline_api::Error::SessionExpired => Self::AuthExpired,
            stockline_api::Error::PermissionDenied { message } => {
                Self::PermissionDenied { message }
            }
            stockline_api::Error::Transport(e) => {
                if e.is_timeout() || e.is_connect() {
                    Self::ServiceUnavailable {
                        reason: e.to_string(),
                    }
                } else {
                    Self::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            stockline_api::Error::InvalidUrl(e) => Self::Internal(format!("invalid URL: {e}")),
            stockline_api::Error::Api { status, message } => Self::Api {
                message,
                status: Some(status),
            },
            stockline_api::Error::ChannelConnect(reason) => Self::ServiceUnavailable { reason },
            stockline_api::Error::Deserialization { message } => {
                Self::Internal(format!("deserialization error: {message}"))
            }
        }
    }
}
