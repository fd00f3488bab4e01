// ── Reactive data store ──
//
// Insertion-ordered entity storage with push-based change notification,
// plus the derived state computed from it.

mod collection;
mod data_store;
mod roles;
mod vendor_items;

pub use collection::Collection;
pub use data_store::{BulkSnapshot, DataStore};
pub use roles::RoleSet;
pub use vendor_items::VendorItemsCache;
