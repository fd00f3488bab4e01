// ── Central reactive data store ──
//
// Holds every synchronized collection plus the derived state (known
// roles, vendor→items cache). Channel events are applied here through an
// exhaustive match; callers above this layer never see event names.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use stockline_api::{Change, CollectionKind, RecordEvent};

use super::collection::Collection;
use super::roles::RoleSet;
use super::vendor_items::VendorItemsCache;
use crate::model::{
    EntityId, IntegrationConfig, InventoryItem, LogEntry, Notification, Order, Record, UsageRecord,
    User, Vendor, VendorItemLink,
};
use crate::stream::EntityStream;

/// Central store for all synchronized collections.
///
/// Each collection is mutated only by its own reducers (driven by the
/// router task) and by the bulk loader; the derived cache only by its
/// invalidate/populate pair. Reads are always consistent snapshots.
pub struct DataStore {
    pub(crate) inventory_items: Collection<InventoryItem>,
    pub(crate) vendors: Collection<Vendor>,
    pub(crate) users: Collection<User>,
    pub(crate) orders: Collection<Order>,
    pub(crate) vendor_items: Collection<VendorItemLink>,
    pub(crate) notifications: Collection<Notification>,
    pub(crate) logs: Collection<LogEntry>,
    pub(crate) inventory_usage: Collection<UsageRecord>,
    pub(crate) integrations: Collection<IntegrationConfig>,
    pub(crate) roles: RoleSet,
    pub(crate) vendor_items_cache: VendorItemsCache,
    pub(crate) last_bulk_load: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_channel_event: watch::Sender<Option<DateTime<Utc>>>,
}

/// All collections fetched during one bulk load.
#[derive(Default)]
pub struct BulkSnapshot {
    pub inventory_items: Vec<InventoryItem>,
    pub vendors: Vec<Vendor>,
    pub users: Vec<User>,
    pub orders: Vec<Order>,
    pub vendor_items: Vec<VendorItemLink>,
    pub notifications: Vec<Notification>,
    pub logs: Vec<LogEntry>,
    pub inventory_usage: Vec<UsageRecord>,
    pub integrations: Vec<IntegrationConfig>,
}

impl DataStore {
    pub fn new() -> Self {
        let (last_bulk_load, _) = watch::channel(None);
        let (last_channel_event, _) = watch::channel(None);

        Self {
            inventory_items: Collection::new(),
            vendors: Collection::new(),
            users: Collection::new(),
            orders: Collection::new(),
            vendor_items: Collection::new(),
            notifications: Collection::new(),
            logs: Collection::new(),
            inventory_usage: Collection::new(),
            integrations: Collection::new(),
            roles: RoleSet::new(),
            vendor_items_cache: VendorItemsCache::new(),
            last_bulk_load,
            last_channel_event,
        }
    }

    // ── Event application ────────────────────────────────────────────

    /// Apply one channel event to the matching collection.
    ///
    /// Never fails: malformed payloads are logged and dropped, reducer
    /// misses are absorbing no-ops. Link events additionally invalidate
    /// the vendor→items cache; user events maintain the role set.
    pub fn apply(&self, event: RecordEvent) {
        self.last_channel_event.send_replace(Some(Utc::now()));

        match event.collection {
            CollectionKind::InventoryItems => {
                apply_change(&self.inventory_items, event.collection, event.change);
            }
            CollectionKind::Vendors => {
                apply_change(&self.vendors, event.collection, event.change);
            }
            CollectionKind::Users => self.apply_user_change(event.change),
            CollectionKind::Orders => {
                apply_change(&self.orders, event.collection, event.change);
            }
            CollectionKind::VendorItems => self.apply_link_change(event.change),
            CollectionKind::Notifications => {
                apply_change(&self.notifications, event.collection, event.change);
            }
            CollectionKind::Logs => {
                apply_change(&self.logs, event.collection, event.change);
            }
            CollectionKind::InventoryUsage => {
                apply_change(&self.inventory_usage, event.collection, event.change);
            }
            CollectionKind::Integrations => {
                apply_change(&self.integrations, event.collection, event.change);
            }
        }
    }

    /// User events also maintain the derived role set: incremental add on
    /// insert, full recompute on delete (to retire unused roles), nothing
    /// on update.
    fn apply_user_change(&self, change: Change) {
        match change {
            Change::Insert(payload) => match serde_json::from_value::<User>(payload) {
                Ok(user) => {
                    let role = user.role.clone();
                    self.users.apply_insert(user);
                    self.roles.note_role(&role);
                }
                Err(e) => {
                    warn!(collection = %CollectionKind::Users, error = %e, "malformed insert payload, dropping");
                }
            },
            Change::Update(payload) => match serde_json::from_value::<User>(payload) {
                Ok(user) => {
                    self.users.apply_update(user);
                }
                Err(e) => {
                    warn!(collection = %CollectionKind::Users, error = %e, "malformed update payload, dropping");
                }
            },
            Change::Delete(id) => {
                self.users.apply_delete(&EntityId::from(id));
                let remaining = self.users.snapshot();
                self.roles.recompute(remaining.iter().map(|u| u.role.as_str()));
            }
        }
    }

    /// Link events invalidate the derived cache for the affected vendor.
    ///
    /// The vendor is resolved *before* the delete lands -- an id-only
    /// delete payload is only attributable while the link is still in the
    /// store. When it cannot be resolved at all, every entry goes.
    fn apply_link_change(&self, change: Change) {
        let vendor = match &change {
            Change::Insert(payload) | Change::Update(payload) => payload
                .get("vendor_id")
                .or_else(|| payload.get("vendorId"))
                .and_then(Value::as_str)
                .map(EntityId::from),
            Change::Delete(id) => self
                .vendor_items
                .get(&EntityId::from(id.as_str()))
                .map(|link| link.vendor_id.clone()),
        };

        apply_change(&self.vendor_items, CollectionKind::VendorItems, change);

        match vendor {
            Some(v) => {
                self.vendor_items_cache.invalidate(&v);
            }
            None => self.vendor_items_cache.invalidate_all(),
        }
    }

    // ── Bulk load ────────────────────────────────────────────────────

    /// Apply a full bulk-load snapshot.
    ///
    /// Upserts rather than clears, so a reload never shows a transient
    /// empty state to subscribers.
    pub fn apply_bulk(&self, snap: BulkSnapshot) {
        self.inventory_items.upsert_many(snap.inventory_items);
        self.vendors.upsert_many(snap.vendors);
        self.users.upsert_many(snap.users);
        self.roles
            .recompute(self.users.snapshot().iter().map(|u| u.role.as_str()));
        self.orders.upsert_many(snap.orders);
        self.vendor_items.upsert_many(snap.vendor_items);
        self.notifications.upsert_many(snap.notifications);
        self.logs.upsert_many(snap.logs);
        self.inventory_usage.upsert_many(snap.inventory_usage);
        self.integrations.upsert_many(snap.integrations);

        // Link rows may have changed under any cached entry.
        self.vendor_items_cache.invalidate_all();

        self.last_bulk_load.send_replace(Some(Utc::now()));
    }

    /// Drop everything (logout/teardown).
    pub fn clear(&self) {
        self.inventory_items.clear();
        self.vendors.clear();
        self.users.clear();
        self.orders.clear();
        self.vendor_items.clear();
        self.notifications.clear();
        self.logs.clear();
        self.inventory_usage.clear();
        self.integrations.clear();
        self.roles.clear();
        self.vendor_items_cache.invalidate_all();
        self.last_bulk_load.send_replace(None);
        self.last_channel_event.send_replace(None);
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn inventory_items_snapshot(&self) -> Arc<Vec<Arc<InventoryItem>>> {
        self.inventory_items.snapshot()
    }

    pub fn vendors_snapshot(&self) -> Arc<Vec<Arc<Vendor>>> {
        self.vendors.snapshot()
    }

    pub fn users_snapshot(&self) -> Arc<Vec<Arc<User>>> {
        self.users.snapshot()
    }

    pub fn orders_snapshot(&self) -> Arc<Vec<Arc<Order>>> {
        self.orders.snapshot()
    }

    pub fn vendor_items_snapshot(&self) -> Arc<Vec<Arc<VendorItemLink>>> {
        self.vendor_items.snapshot()
    }

    pub fn notifications_snapshot(&self) -> Arc<Vec<Arc<Notification>>> {
        self.notifications.snapshot()
    }

    pub fn logs_snapshot(&self) -> Arc<Vec<Arc<LogEntry>>> {
        self.logs.snapshot()
    }

    pub fn inventory_usage_snapshot(&self) -> Arc<Vec<Arc<UsageRecord>>> {
        self.inventory_usage.snapshot()
    }

    pub fn integrations_snapshot(&self) -> Arc<Vec<Arc<IntegrationConfig>>> {
        self.integrations.snapshot()
    }

    // ── Single-record lookups ────────────────────────────────────────

    pub fn inventory_item(&self, id: &EntityId) -> Option<Arc<InventoryItem>> {
        self.inventory_items.get(id)
    }

    pub fn vendor(&self, id: &EntityId) -> Option<Arc<Vendor>> {
        self.vendors.get(id)
    }

    pub fn vendor_item_link(&self, id: &EntityId) -> Option<Arc<VendorItemLink>> {
        self.vendor_items.get(id)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_inventory_items(&self) -> EntityStream<InventoryItem> {
        EntityStream::new(self.inventory_items.subscribe())
    }

    pub fn subscribe_vendors(&self) -> EntityStream<Vendor> {
        EntityStream::new(self.vendors.subscribe())
    }

    pub fn subscribe_users(&self) -> EntityStream<User> {
        EntityStream::new(self.users.subscribe())
    }

    pub fn subscribe_orders(&self) -> EntityStream<Order> {
        EntityStream::new(self.orders.subscribe())
    }

    pub fn subscribe_vendor_items(&self) -> EntityStream<VendorItemLink> {
        EntityStream::new(self.vendor_items.subscribe())
    }

    pub fn subscribe_notifications(&self) -> EntityStream<Notification> {
        EntityStream::new(self.notifications.subscribe())
    }

    pub fn subscribe_logs(&self) -> EntityStream<LogEntry> {
        EntityStream::new(self.logs.subscribe())
    }

    pub fn subscribe_inventory_usage(&self) -> EntityStream<UsageRecord> {
        EntityStream::new(self.inventory_usage.subscribe())
    }

    pub fn subscribe_integrations(&self) -> EntityStream<IntegrationConfig> {
        EntityStream::new(self.integrations.subscribe())
    }

    // ── Derived state ────────────────────────────────────────────────

    /// The known-roles set (derived from users).
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// The vendor→items derived cache.
    pub fn vendor_items_cache(&self) -> &VendorItemsCache {
        &self.vendor_items_cache
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_bulk_load(&self) -> Option<DateTime<Utc>> {
        *self.last_bulk_load.borrow()
    }

    pub fn last_channel_event(&self) -> Option<DateTime<Utc>> {
        *self.last_channel_event.borrow()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Generic reducer application ──────────────────────────────────────

/// Deserialize and apply one change to one collection.
///
/// Payloads that do not fit the collection's shape (missing `_id`, wrong
/// types) are logged and dropped; they never corrupt the store.
fn apply_change<T: Record + DeserializeOwned>(
    collection: &Collection<T>,
    kind: CollectionKind,
    change: Change,
) {
    match change {
        Change::Insert(payload) => match serde_json::from_value::<T>(payload) {
            Ok(record) => {
                if !collection.apply_insert(record) {
                    tracing::debug!(collection = %kind, "duplicate insert ignored");
                }
            }
            Err(e) => {
                warn!(collection = %kind, error = %e, "malformed insert payload, dropping");
            }
        },
        Change::Update(payload) => match serde_json::from_value::<T>(payload) {
            Ok(record) => {
                if !collection.apply_update(record) {
                    tracing::debug!(collection = %kind, "update for unknown id dropped");
                }
            }
            Err(e) => {
                warn!(collection = %kind, error = %e, "malformed update payload, dropping");
            }
        },
        Change::Delete(id) => {
            collection.apply_delete(&EntityId::from(id));
        }
    }
}
