// ── Domain model ──
//
// Typed shapes for the nine synchronized collections, deserialized from
// the service's wire format (`_id`, mixed camel/snake field names kept
// tolerant via aliases).

mod activity;
mod entity_id;
mod integration;
mod item;
mod order;
mod user;
mod vendor;

pub use activity::{LogEntry, Notification, UsageRecord};
pub use entity_id::EntityId;
pub use integration::IntegrationConfig;
pub use item::InventoryItem;
pub use order::Order;
pub use user::User;
pub use vendor::{Vendor, VendorItemLink};

/// A record that can live in a [`Collection`](crate::store::Collection):
/// uniquely keyed by a stable [`EntityId`].
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> &EntityId;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inventory_item_deserializes_from_wire_shape() {
        let item: InventoryItem = serde_json::from_value(json!({
            "_id": "i1",
            "name": "Folding Tables",
            "description": "6ft plastic",
            "category": "Furniture",
            "quantity": 45,
            "minQuantity": 10,
            "unit": "each",
            "location": "Main Storage",
            "status": "In Stock",
            "condition": "Good"
        }))
        .unwrap();

        assert_eq!(item.id.as_str(), "i1");
        assert_eq!(item.min_quantity, 10);
    }

    #[test]
    fn optional_fields_default() {
        let item: InventoryItem = serde_json::from_value(json!({
            "_id": "i2",
            "name": "Chairs",
            "category": "Furniture"
        }))
        .unwrap();
        assert_eq!(item.quantity, 0);
        assert!(item.location.is_empty());

        let link: VendorItemLink = serde_json::from_value(json!({
            "_id": "l1",
            "vendorId": "v1",
            "itemId": "i2"
        }))
        .unwrap();
        assert_eq!(link.vendor_id.as_str(), "v1");
        assert_eq!(link.item_id.as_str(), "i2");
    }

    #[test]
    fn missing_id_is_an_error() {
        let result: Result<Vendor, _> = serde_json::from_value(json!({
            "name": "Acme",
            "contact": "a@b.c"
        }));
        assert!(result.is_err());
    }
}
