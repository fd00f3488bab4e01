use serde::Deserialize;

use super::{EntityId, Record};

/// One stocked item kind tracked by the department.
///
/// `status` and `condition` are free-form service-side labels ("In Stock",
/// "Low Stock", ...) -- the client displays them, it never derives them.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryItem {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, rename = "minQuantity", alias = "min_quantity")]
    pub min_quantity: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub condition: String,
}

impl Record for InventoryItem {
    fn id(&self) -> &EntityId {
        &self.id
    }
}
