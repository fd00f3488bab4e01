// ── Runtime connection configuration ──
//
// Describes *how* to reach the inventory service. The embedding
// application constructs a `ServiceConfig` and hands it in -- core never
// touches disk or environment.

use std::time::Duration;

use url::Url;

pub use stockline_api::ReconnectConfig;

/// Configuration for one service connection.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service root URL (e.g. `https://inventory.example.edu`).
    pub url: Url,
    /// Request timeout for REST calls.
    pub timeout: Duration,
    /// Realtime channel reconnect policy.
    pub reconnect: ReconnectConfig,
    /// Enable the realtime channel. Disabled for one-shot consumers that
    /// only need a bulk read.
    pub channel_enabled: bool,
    /// Attempts per collection during the bulk load before the
    /// user-visible error state is set.
    pub bulk_attempts: u32,
    /// Fixed delay between bulk-load attempts.
    pub bulk_retry_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            // Local dev default; real deployments always override.
            url: Url::parse("http://localhost:5000").expect("static URL"),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
            channel_enabled: true,
            bulk_attempts: 3,
            bulk_retry_delay: Duration::from_secs(1),
        }
    }
}
