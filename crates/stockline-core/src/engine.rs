// ── Sync engine ──
//
// Full lifecycle management for one connection to the inventory service:
// session handling, the realtime channel, the initial bulk load, ordered
// event application, and the vendor→items derived cache.

use std::sync::Arc;

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use stockline_api::{
    ApiClient, ChannelHandle, ChannelMessage, CollectionKind, RecordEvent, TransportConfig,
    channel_url,
};

use crate::config::ServiceConfig;
use crate::error::CoreError;
use crate::model::{EntityId, InventoryItem, Record};
use crate::session::SessionStore;
use crate::store::{BulkSnapshot, DataStore};

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Assignment report ────────────────────────────────────────────────

/// Which half of an assignment save an operation belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,
    Unassign,
}

/// One failed add/remove within an assignment save.
#[derive(Debug)]
pub struct AssignmentFailure {
    /// Item id for assigns, link id for unassigns.
    pub target: EntityId,
    pub op: AssignmentOp,
    pub message: String,
}

/// Outcome of one assignment save: best effort with a full report.
///
/// Every add and remove is attempted independently; failures are
/// aggregated here instead of aborting the batch.
#[derive(Debug, Default)]
pub struct AssignmentReport {
    pub assigned: usize,
    pub unassigned: usize,
    pub failures: Vec<AssignmentFailure>,
}

impl AssignmentReport {
    /// `true` when every operation in the batch succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ── SyncEngine ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Construct once per authenticated
/// session, pass down to every view that reads inventory state -- there
/// is no module-level shared state anywhere in this crate.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: ServiceConfig,
    api: ApiClient,
    session: SessionStore,
    store: Arc<DataStore>,
    connection_state: watch::Sender<ConnectionState>,
    /// Last user-visible, non-fatal error. `None` when healthy.
    banner: watch::Sender<Option<String>>,
    cancel: CancellationToken,
    /// Child token for the current connection -- cancelled on disconnect,
    /// replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    channel: Mutex<Option<ChannelHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Create a new engine. Does NOT connect -- call
    /// [`connect()`](Self::connect) once a session token is available.
    pub fn new(config: ServiceConfig, session: SessionStore) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let api = ApiClient::new(config.url.clone(), &transport)?;
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (banner, _) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                api,
                session,
                store: Arc::new(DataStore::new()),
                connection_state,
                banner,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                channel: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// The underlying data store.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// The session store this engine reads its token from.
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to the user-visible error banner.
    pub fn banner(&self) -> watch::Receiver<Option<String>> {
        self.inner.banner.subscribe()
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the service: open the realtime channel, run the bulk
    /// load, replay buffered events, go live.
    ///
    /// A no-op without a session token, and a no-op while a connection
    /// is already live or in flight (single-flight guard). Channel events
    /// that arrive during the bulk load are buffered and applied in
    /// arrival order once the load lands.
    pub async fn connect(&self) -> Result<(), CoreError> {
        {
            let state = *self.inner.connection_state.borrow();
            if matches!(state, ConnectionState::Connecting | ConnectionState::Connected) {
                debug!(?state, "connect skipped, already live");
                return Ok(());
            }
        }
        let Some(token) = self.inner.session.exposed() else {
            debug!("no session token, skipping connect");
            return Ok(());
        };

        self.inner.connection_state.send_replace(ConnectionState::Connecting);
        self.inner.banner.send_replace(None);
        self.inner
            .api
            .set_token(SecretString::from(token.clone()));

        // Fresh child token for this connection (supports reconnect).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        // Gate flipped once the bulk load has been applied; the router
        // buffers everything it sees before that.
        let (live_tx, live_rx) = watch::channel(false);

        if self.inner.config.channel_enabled {
            let url = channel_url(&self.inner.config.url, &token).map_err(CoreError::from)?;
            let handle =
                ChannelHandle::connect(url, self.inner.config.reconnect.clone(), child.clone());
            let rx = handle.subscribe();
            *self.inner.channel.lock().await = Some(handle);

            let router = tokio::spawn(router_task(
                Arc::clone(&self.inner),
                rx,
                live_rx,
                child.clone(),
            ));
            self.inner.task_handles.lock().await.push(router);
        }

        match self.bulk_load().await {
            Ok(snapshot) => self.inner.store.apply_bulk(snapshot),
            Err(e) => {
                self.teardown().await;
                if matches!(e, CoreError::AuthExpired) {
                    self.note_auth_failure();
                } else {
                    self.inner
                        .banner
                        .send_replace(Some(format!("Failed to load inventory data: {e}")));
                    self.inner
                        .connection_state
                        .send_replace(ConnectionState::Failed);
                }
                return Err(e);
            }
        }

        let _ = live_tx.send(true);
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!("connected to inventory service");
        Ok(())
    }

    /// Disconnect from the service.
    ///
    /// Idempotent: cancels background tasks, closes the channel exactly
    /// once, resets state to [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        self.teardown().await;
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// End the session: clear the token, tear down the connection, and
    /// drop all cached data.
    pub async fn logout(&self) {
        self.inner.session.clear();
        self.inner.api.clear_token();
        self.disconnect().await;
        self.inner.store.clear();
    }

    /// Cancel and join background tasks, close the channel.
    async fn teardown(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        if let Some(handle) = self.inner.channel.lock().await.take() {
            handle.shutdown();
        }
    }

    /// Hard auth failure: the token is gone; observers of the session
    /// store see `None` and send the user back to sign-in. No retry.
    fn note_auth_failure(&self) {
        warn!("authorization failure, clearing session token");
        self.inner.session.clear();
        self.inner.api.clear_token();
        self.inner
            .banner
            .send_replace(Some("Session expired -- sign in again".into()));
        self.inner
            .connection_state
            .send_replace(ConnectionState::Failed);
    }

    // ── Bulk load ────────────────────────────────────────────────────

    /// Fetch all nine collections concurrently, with bounded fixed-delay
    /// retries per collection.
    async fn bulk_load(&self) -> Result<BulkSnapshot, CoreError> {
        let api = &self.inner.api;
        let attempts = self.inner.config.bulk_attempts.max(1);
        let delay = self.inner.config.bulk_retry_delay;

        let (items, vendors, users, orders, links, notifications, logs, usage, integrations) = tokio::join!(
            fetch_collection(api, CollectionKind::InventoryItems, attempts, delay),
            fetch_collection(api, CollectionKind::Vendors, attempts, delay),
            fetch_collection(api, CollectionKind::Users, attempts, delay),
            fetch_collection(api, CollectionKind::Orders, attempts, delay),
            fetch_collection(api, CollectionKind::VendorItems, attempts, delay),
            fetch_collection(api, CollectionKind::Notifications, attempts, delay),
            fetch_collection(api, CollectionKind::Logs, attempts, delay),
            fetch_collection(api, CollectionKind::InventoryUsage, attempts, delay),
            fetch_collection(api, CollectionKind::Integrations, attempts, delay),
        );

        Ok(BulkSnapshot {
            inventory_items: decode_records(CollectionKind::InventoryItems, items?),
            vendors: decode_records(CollectionKind::Vendors, vendors?),
            users: decode_records(CollectionKind::Users, users?),
            orders: decode_records(CollectionKind::Orders, orders?),
            vendor_items: decode_records(CollectionKind::VendorItems, links?),
            notifications: decode_records(CollectionKind::Notifications, notifications?),
            logs: decode_records(CollectionKind::Logs, logs?),
            inventory_usage: decode_records(CollectionKind::InventoryUsage, usage?),
            integrations: decode_records(CollectionKind::Integrations, integrations?),
        })
    }

    // ── Vendor items ─────────────────────────────────────────────────

    /// Items assigned to one vendor: cached if present, otherwise fetched
    /// and cached.
    ///
    /// A fetch superseded by a vendor switch completes harmlessly -- each
    /// populates the entry for the vendor id it targeted. A vendor with
    /// zero assignments yields an empty list, not an error.
    pub async fn items_for_vendor(
        &self,
        vendor_id: &EntityId,
    ) -> Result<Arc<Vec<Arc<InventoryItem>>>, CoreError> {
        if let Some(items) = self.inner.store.vendor_items_cache().get(vendor_id) {
            debug!(%vendor_id, "vendor items cache hit");
            return Ok(items);
        }

        debug!(%vendor_id, "vendor items cache miss, fetching");
        let raw = match self.inner.api.items_for_vendor(vendor_id.as_str()).await {
            Ok(raw) => raw,
            Err(e) if e.is_auth_expired() => {
                self.note_auth_failure();
                return Err(CoreError::AuthExpired);
            }
            Err(e) => return Err(e.into()),
        };

        let items: Vec<Arc<InventoryItem>> =
            decode_records::<InventoryItem>(CollectionKind::InventoryItems, raw)
                .into_iter()
                .map(Arc::new)
                .collect();
        Ok(self
            .inner
            .store
            .vendor_items_cache()
            .populate(vendor_id.clone(), items))
    }

    /// Apply one save action's worth of assignment changes.
    ///
    /// Adds and removes are issued independently; individual failures are
    /// aggregated into the report rather than aborting the batch. On an
    /// authorization failure the whole action is abandoned and the
    /// session is cleared. Afterwards the vendor's cache entry is
    /// invalidated and repopulated before the report is returned, so the
    /// caller observes post-save state.
    pub async fn save_assignments(
        &self,
        vendor_id: &EntityId,
        assign_item_ids: &[EntityId],
        unassign_link_ids: &[EntityId],
    ) -> Result<AssignmentReport, CoreError> {
        let api = &self.inner.api;

        // The same link can be queued for removal more than once by
        // repeated toggling; collapse duplicates first.
        let mut unassign: Vec<&EntityId> = Vec::new();
        for link in unassign_link_ids {
            if !unassign.contains(&link) {
                unassign.push(link);
            }
        }

        let assign_futs = assign_item_ids.iter().map(|item| async move {
            api.create_vendor_item(vendor_id.as_str(), item.as_str())
                .await
                .map(|_| ())
                .map_err(|e| (item.clone(), AssignmentOp::Assign, e))
        });
        let unassign_futs = unassign.iter().map(|link| async move {
            api.delete_vendor_item(link.as_str())
                .await
                .map_err(|e| ((*link).clone(), AssignmentOp::Unassign, e))
        });

        let (assign_results, unassign_results) = futures_util::future::join(
            futures_util::future::join_all(assign_futs),
            futures_util::future::join_all(unassign_futs),
        )
        .await;

        let mut report = AssignmentReport::default();
        for result in assign_results {
            match result {
                Ok(()) => report.assigned += 1,
                Err((target, op, e)) => {
                    if e.is_auth_expired() {
                        self.note_auth_failure();
                        return Err(CoreError::AuthExpired);
                    }
                    report.failures.push(AssignmentFailure {
                        target,
                        op,
                        message: CoreError::from(e).to_string(),
                    });
                }
            }
        }
        for result in unassign_results {
            match result {
                Ok(()) => report.unassigned += 1,
                Err((target, op, e)) => {
                    if e.is_auth_expired() {
                        self.note_auth_failure();
                        return Err(CoreError::AuthExpired);
                    }
                    report.failures.push(AssignmentFailure {
                        target,
                        op,
                        message: CoreError::from(e).to_string(),
                    });
                }
            }
        }

        if !report.is_clean() {
            warn!(
                vendor = %vendor_id,
                failures = report.failures.len(),
                "assignment save completed with failures"
            );
        }

        // Repopulate before reporting success so the caller reads
        // post-save state, not a stale entry.
        self.inner.store.vendor_items_cache().invalidate(vendor_id);
        self.items_for_vendor(vendor_id).await?;

        Ok(report)
    }
}

// ── Router task ──────────────────────────────────────────────────────

enum Flow {
    Continue,
    Stop,
}

/// Single consumer for channel messages.
///
/// Reducers run here and only here, in delivery order -- the transport
/// may be concurrent, but application never is. Buffers events until the
/// bulk load lands, then replays them in arrival order and goes live.
async fn router_task(
    inner: Arc<EngineInner>,
    mut rx: broadcast::Receiver<Arc<ChannelMessage>>,
    mut live: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    let mut buffer: Vec<RecordEvent> = Vec::new();

    // Phase 1: buffer until the bulk load has been applied.
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            changed = live.changed() => {
                match changed {
                    Ok(()) if *live.borrow() => break,
                    Ok(()) => {}
                    // Sender dropped without going live: connect failed.
                    Err(_) => return,
                }
            }
            msg = rx.recv() => {
                match handle_message(&inner, msg, Some(&mut buffer)) {
                    Flow::Continue => {}
                    Flow::Stop => return,
                }
            }
        }
    }

    debug!(buffered = buffer.len(), "bulk load applied, replaying buffered events");
    for event in buffer.drain(..) {
        inner.store.apply(event);
    }

    // Phase 2: live application.
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            msg = rx.recv() => {
                match handle_message(&inner, msg, None) {
                    Flow::Continue => {}
                    Flow::Stop => return,
                }
            }
        }
    }
}

fn handle_message(
    inner: &EngineInner,
    msg: Result<Arc<ChannelMessage>, broadcast::error::RecvError>,
    buffer: Option<&mut Vec<RecordEvent>>,
) -> Flow {
    match msg {
        Ok(message) => match &*message {
            ChannelMessage::Record(event) => {
                match buffer {
                    Some(buf) => buf.push(event.clone()),
                    None => inner.store.apply(event.clone()),
                }
                Flow::Continue
            }
            ChannelMessage::Status { status, message } => {
                // Error statuses surface on the banner; the connection
                // itself stays up. Anything else is informational.
                if status == "error" {
                    let text = message.clone().unwrap_or_else(|| status.clone());
                    warn!(%text, "service reported channel error");
                    inner.banner.send_replace(Some(format!("Realtime updates: {text}")));
                } else {
                    debug!(%status, "channel status");
                }
                Flow::Continue
            }
            ChannelMessage::AuthRejected { message } => {
                warn!(%message, "channel rejected session token");
                inner.session.clear();
                inner.api.clear_token();
                inner
                    .banner
                    .send_replace(Some("Session expired -- sign in again".into()));
                inner
                    .connection_state
                    .send_replace(ConnectionState::Failed);
                Flow::Stop
            }
            ChannelMessage::RetriesExhausted => {
                inner.banner.send_replace(Some(
                    "Lost connection to realtime updates. Data may be stale until you reload."
                        .into(),
                ));
                inner
                    .connection_state
                    .send_replace(ConnectionState::Failed);
                Flow::Stop
            }
        },
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!(skipped, "event router lagged behind the channel");
            Flow::Continue
        }
        Err(broadcast::error::RecvError::Closed) => Flow::Stop,
    }
}

// ── Fetch helpers ────────────────────────────────────────────────────

/// Fetch one collection with bounded fixed-delay retries.
///
/// Only transient failures retry; an auth failure aborts immediately.
async fn fetch_collection(
    api: &ApiClient,
    kind: CollectionKind,
    attempts: u32,
    delay: std::time::Duration,
) -> Result<Vec<Value>, CoreError> {
    let mut attempt: u32 = 1;
    loop {
        match api.list_collection(kind).await {
            Ok(values) => return Ok(values),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(collection = %kind, attempt, error = %e, "collection fetch failed, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Decode raw list elements, skipping records that do not fit the
/// collection's shape (the service occasionally returns half-seeded
/// documents; one bad row must not sink the load).
fn decode_records<T: Record + DeserializeOwned>(kind: CollectionKind, values: Vec<Value>) -> Vec<T> {
    let mut records = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(collection = %kind, error = %e, "skipping malformed record in bulk response");
            }
        }
    }
    records
}

// ── Tests ────────────────────────────────────────────────────────────
