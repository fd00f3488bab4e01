// ── Generic reactive collection ──
//
// Insertion-ordered keyed storage with push-based change notification
// via `watch` channels. One instance per synchronized collection.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::model::{EntityId, Record};

/// An insertion-ordered, uniquely-keyed collection for a single record type.
///
/// Invariants: no two records share an id; iteration order is first-insert
/// order (display order, nothing more). Every mutation bumps a version
/// counter and rebuilds the snapshot that subscribers receive.
///
/// The three `apply_*` reducers tolerate the channel's delivery quirks:
/// duplicated inserts, updates for unknown ids, and deletes of records
/// that are already gone are all absorbing no-ops.
pub struct Collection<T: Record> {
    entries: RwLock<IndexMap<EntityId, Arc<T>>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for cheap subscription reads.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Record> Collection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            entries: RwLock::new(IndexMap::new()),
            version,
            snapshot,
        }
    }

    /// Insert a record delivered by the channel.
    ///
    /// If a record with the same id already exists the call is a no-op and
    /// returns `false` -- the channel may replay inserts across
    /// reconnections, and a replay must not clobber a newer update.
    pub fn apply_insert(&self, record: T) -> bool {
        let inserted = {
            let mut entries = self.write();
            if entries.contains_key(record.id()) {
                false
            } else {
                entries.insert(record.id().clone(), Arc::new(record));
                true
            }
        };
        if inserted {
            self.publish();
        }
        inserted
    }

    /// Replace the record with a matching id, wholesale.
    ///
    /// An update for an id that is not present is silently dropped (it is
    /// NOT inserted) and returns `false`.
    pub fn apply_update(&self, record: T) -> bool {
        let updated = {
            let mut entries = self.write();
            match entries.get_mut(record.id()) {
                Some(slot) => {
                    *slot = Arc::new(record);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.publish();
        }
        updated
    }

    /// Remove the record with the given id, preserving the order of the
    /// rest. Returns the removed record; absent ids are a no-op.
    pub fn apply_delete(&self, id: &EntityId) -> Option<Arc<T>> {
        let removed = self.write().shift_remove(id);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Bulk-load path: insert-or-replace every record, keeping first-seen
    /// order for new ids and slot order for replaced ones.
    ///
    /// `upsert_many` followed by any reducer call leaves the collection in
    /// the same state as "bulk load, then apply events in delivery order".
    pub fn upsert_many(&self, records: Vec<T>) {
        {
            let mut entries = self.write();
            for record in records {
                entries.insert(record.id().clone(), Arc::new(record));
            }
        }
        self.publish();
    }

    /// Look up a record by id.
    pub fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.read().get(id).cloned()
    }

    /// Get the current snapshot (cheap `Arc` clone, insertion order).
    pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    /// Subscribe to the bare version counter.
    pub fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove all records (logout/teardown).
    pub fn clear(&self) {
        self.write().clear();
        self.publish();
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<EntityId, Arc<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, IndexMap<EntityId, Arc<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the subscriber snapshot and bump the version counter.
    fn publish(&self) {
        let values: Vec<Arc<T>> = self.read().values().cloned().collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
