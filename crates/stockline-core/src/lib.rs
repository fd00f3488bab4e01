// stockline-core: Reactive synchronization layer between stockline-api
// and the UI surfaces that consume inventory state.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ReconnectConfig, ServiceConfig};
pub use engine::{
    AssignmentFailure, AssignmentOp, AssignmentReport, ConnectionState, SyncEngine,
};
pub use error::CoreError;
pub use session::SessionStore;
pub use store::{BulkSnapshot, Collection, DataStore, RoleSet, VendorItemsCache};
pub use stream::EntityStream;

// Channel event types come from the wire crate; re-exported here so
// consumers rarely need a direct stockline-api dependency.
pub use stockline_api::{Change, ChannelMessage, CollectionKind, Operation, RecordEvent};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    EntityId, IntegrationConfig, InventoryItem, LogEntry, Notification, Order, Record,
    UsageRecord, User, Vendor, VendorItemLink,
};
