// ── Vendor→items derived cache ──
//
// Lazily-populated mapping from a vendor id to the resolved item views
// assigned to it. Entries are invalidated whenever the underlying
// link collection changes and repopulated on next access.

use std::sync::Arc;

use dashmap::DashMap;

use crate::model::{EntityId, InventoryItem};

/// Cache of resolved item lists, keyed by vendor id.
///
/// The cache itself is policy-free storage: the engine populates entries
/// after a fetch, and the event router invalidates them. A vendor with
/// zero assignments caches an empty vec -- absence of an entry always
/// means "fetch", never "no items".
pub struct VendorItemsCache {
    entries: DashMap<EntityId, Arc<Vec<Arc<InventoryItem>>>>,
}

impl VendorItemsCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cached items for a vendor, if the entry is present.
    pub fn get(&self, vendor_id: &EntityId) -> Option<Arc<Vec<Arc<InventoryItem>>>> {
        self.entries.get(vendor_id).map(|e| Arc::clone(e.value()))
    }

    /// Store the fetched items for a vendor, returning the cached list.
    ///
    /// Concurrent superseded fetches land harmlessly: each populates the
    /// entry for the vendor id it targeted.
    pub(crate) fn populate(
        &self,
        vendor_id: EntityId,
        items: Vec<Arc<InventoryItem>>,
    ) -> Arc<Vec<Arc<InventoryItem>>> {
        let entry = Arc::new(items);
        self.entries.insert(vendor_id, Arc::clone(&entry));
        entry
    }

    /// Drop one vendor's entry. Returns `true` if an entry existed.
    pub(crate) fn invalidate(&self, vendor_id: &EntityId) -> bool {
        self.entries.remove(vendor_id).is_some()
    }

    /// Drop every entry. Used when a link change cannot be attributed to
    /// a specific vendor.
    pub(crate) fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> Arc<InventoryItem> {
        Arc::new(InventoryItem {
            id: EntityId::from(id),
            name: id.to_owned(),
            description: String::new(),
            category: "Test".into(),
            quantity: 1,
            min_quantity: 0,
            unit: String::new(),
            location: String::new(),
            status: String::new(),
            condition: String::new(),
        })
    }

    #[test]
    fn populate_then_get() {
        let cache = VendorItemsCache::new();
        let v = EntityId::from("v1");
        assert!(cache.get(&v).is_none());

        cache.populate(v.clone(), vec![item("x"), item("y")]);
        let items = cache.get(&v).expect("entry");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn empty_assignment_lists_are_cached_too() {
        let cache = VendorItemsCache::new();
        let v = EntityId::from("v1");
        cache.populate(v.clone(), Vec::new());
        assert!(cache.get(&v).expect("entry").is_empty());
    }

    #[test]
    fn invalidate_is_per_vendor() {
        let cache = VendorItemsCache::new();
        cache.populate(EntityId::from("v1"), vec![item("x")]);
        cache.populate(EntityId::from("v2"), vec![item("y")]);

        assert!(cache.invalidate(&EntityId::from("v1")));
        assert!(!cache.invalidate(&EntityId::from("v1")));
        assert!(cache.get(&EntityId::from("v1")).is_none());
        assert!(cache.get(&EntityId::from("v2")).is_some());
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let cache = VendorItemsCache::new();
        cache.populate(EntityId::from("v1"), vec![item("x")]);
        cache.populate(EntityId::from("v2"), vec![item("y")]);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
