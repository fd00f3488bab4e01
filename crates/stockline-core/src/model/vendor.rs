use serde::Deserialize;

use super::{EntityId, Record};

/// A supplier the department orders from.
#[derive(Debug, Clone, Deserialize)]
pub struct Vendor {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub phone: String,
}

impl Record for Vendor {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// One vendor-to-item assignment.
///
/// Carries its own id, distinct from the (vendor, item) pair. The store
/// does not enforce pair uniqueness -- callers compute assignment diffs
/// against the links currently present.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorItemLink {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(rename = "vendor_id", alias = "vendorId")]
    pub vendor_id: EntityId,
    #[serde(rename = "item_id", alias = "itemId")]
    pub item_id: EntityId,
}

impl Record for VendorItemLink {
    fn id(&self) -> &EntityId {
        &self.id
    }
}
