// Activity-shaped collections: notifications, audit logs, usage records.
// All three are append-heavy streams the service occasionally edits or
// prunes, so they ride the same insert/update/delete channel as the rest.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{EntityId, Record};

/// A user-facing notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}

impl Record for Notification {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// One audit-log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub action: String,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    /// Arbitrary structured detail attached by the service.
    #[serde(default)]
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Record for LogEntry {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// One check-out/return/adjustment event against an inventory item.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageRecord {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub item_id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(default)]
    pub quantity: i64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl Record for UsageRecord {
    fn id(&self) -> &EntityId {
        &self.id
    }
}
