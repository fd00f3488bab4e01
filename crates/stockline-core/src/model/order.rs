use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{EntityId, Record};

/// A purchase order placed with a vendor.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(rename = "vendor_id", alias = "vendorId")]
    pub vendor_id: EntityId,
    /// Free-form item description as entered on the order form.
    #[serde(default)]
    pub items: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, rename = "expectedDelivery", alias = "expected_delivery")]
    pub expected_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
}

impl Record for Order {
    fn id(&self) -> &EntityId {
        &self.id
    }
}
