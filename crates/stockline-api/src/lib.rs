//! Async client for the Stockline inventory service.
//!
//! Two surfaces: a REST [`client::ApiClient`] for bulk reads and
//! assignment writes, and a realtime [`channel`] that streams
//! per-collection change events. Domain typing and caching policy live in
//! `stockline-core`; this crate stops at the wire.

pub mod channel;
pub mod client;
pub mod error;
pub mod events;
pub mod transport;

pub use channel::{ChannelHandle, ReconnectConfig, channel_url};
pub use client::ApiClient;
pub use error::Error;
pub use events::{Change, ChannelMessage, CollectionKind, Operation, RecordEvent};
pub use transport::TransportConfig;
