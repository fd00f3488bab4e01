//! Wire-level event types for the realtime channel.
//!
//! The service names its push events `{collection}_{operation}` (e.g.
//! `inventory_items_insert`, `vendors_delete`) with a distinguished
//! `connection_status` event for server-side health. Parsing happens once,
//! here, into a tagged union -- consumers route with an exhaustive `match`
//! instead of a string-keyed dispatch table.

use std::str::FromStr;

use serde::Deserialize;

// ── Collections ──────────────────────────────────────────────────────

/// The nine synchronized collections.
///
/// Wire names are the `snake_case` of the variant (`InventoryItems` ->
/// `inventory_items`), which is exactly the prefix of the channel event
/// names and the path segment of the matching REST list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CollectionKind {
    InventoryItems,
    Vendors,
    Users,
    Orders,
    VendorItems,
    Notifications,
    Logs,
    InventoryUsage,
    Integrations,
}

/// The three push operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

// ── Events ───────────────────────────────────────────────────────────

/// A change to one record of one collection.
///
/// Insert/update carry the full entity object; delete carries only the id.
#[derive(Debug, Clone)]
pub enum Change {
    Insert(serde_json::Value),
    Update(serde_json::Value),
    Delete(String),
}

impl Change {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Insert(_) => Operation::Insert,
            Self::Update(_) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }
}

/// One collection-level event from the channel.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    pub collection: CollectionKind,
    pub change: Change,
}

/// Everything the channel can deliver to consumers.
#[derive(Debug, Clone)]
pub enum ChannelMessage {
    /// A record changed in one of the synchronized collections.
    Record(RecordEvent),

    /// Server-side health report. `status != "error"` is informational;
    /// an error status is surfaced to the UI without closing the channel.
    Status {
        status: String,
        message: Option<String>,
    },

    /// The service rejected the session token. Terminal: the channel loop
    /// has stopped and will not reconnect.
    AuthRejected { message: String },

    /// Transient reconnection attempts are exhausted. Terminal until the
    /// owning view remounts or the token changes.
    RetriesExhausted,
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Raw frame shape: `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Deserialize)]
struct WireFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Returns `true` if a server-reported message means the token is no
/// longer valid and the channel must not reconnect.
pub(crate) fn indicates_invalid_token(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("invalid token") || lower.contains("token expired")
}

/// Parse one text frame into a [`ChannelMessage`].
///
/// Malformed frames -- unparseable JSON, unknown event names, deletes
/// without an id -- are logged and dropped (`None`). They must never
/// reach a store.
pub(crate) fn parse_frame(text: &str) -> Option<ChannelMessage> {
    let frame: WireFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable channel frame, dropping");
            return None;
        }
    };

    if frame.event == "connection_status" {
        let status: WireStatus = match serde_json::from_value(frame.data) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "malformed connection_status payload, dropping");
                return None;
            }
        };
        if status.status == "error"
            && status.message.as_deref().is_some_and(indicates_invalid_token)
        {
            return Some(ChannelMessage::AuthRejected {
                message: status.message.unwrap_or_default(),
            });
        }
        return Some(ChannelMessage::Status {
            status: status.status,
            message: status.message,
        });
    }

    let Some((prefix, op)) = frame.event.rsplit_once('_') else {
        tracing::warn!(event = %frame.event, "unrecognized channel event name, dropping");
        return None;
    };
    let (Ok(collection), Ok(operation)) =
        (CollectionKind::from_str(prefix), Operation::from_str(op))
    else {
        tracing::warn!(event = %frame.event, "unrecognized channel event name, dropping");
        return None;
    };

    let change = match operation {
        Operation::Insert => Change::Insert(frame.data),
        Operation::Update => Change::Update(frame.data),
        Operation::Delete => {
            let Some(id) = frame.data.get("_id").and_then(|v| v.as_str()) else {
                tracing::warn!(
                    event = %frame.event,
                    "delete event without an _id, dropping"
                );
                return None;
            };
            Change::Delete(id.to_owned())
        }
    };

    Some(ChannelMessage::Record(RecordEvent { collection, change }))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_wire_names_round_trip() {
        use strum::IntoEnumIterator;
        for kind in CollectionKind::iter() {
            let name = kind.to_string();
            assert_eq!(CollectionKind::from_str(&name).unwrap(), kind);
        }
        assert_eq!(CollectionKind::InventoryItems.to_string(), "inventory_items");
        assert_eq!(CollectionKind::VendorItems.to_string(), "vendor_items");
    }

    #[test]
    fn parse_insert_frame() {
        let text = json!({
            "event": "vendors_insert",
            "data": { "_id": "v1", "name": "Acme", "contact": "acme@example.com" }
        })
        .to_string();

        let Some(ChannelMessage::Record(ev)) = parse_frame(&text) else {
            panic!("expected a record event");
        };
        assert_eq!(ev.collection, CollectionKind::Vendors);
        let Change::Insert(payload) = ev.change else {
            panic!("expected an insert");
        };
        assert_eq!(payload["_id"], "v1");
    }

    #[test]
    fn parse_delete_frame_extracts_id() {
        let text = json!({ "event": "inventory_items_delete", "data": { "_id": "i9" } }).to_string();

        let Some(ChannelMessage::Record(ev)) = parse_frame(&text) else {
            panic!("expected a record event");
        };
        assert_eq!(ev.collection, CollectionKind::InventoryItems);
        assert!(matches!(ev.change, Change::Delete(ref id) if id == "i9"));
    }

    #[test]
    fn delete_without_id_is_dropped() {
        let text = json!({ "event": "orders_delete", "data": { "status": "gone" } }).to_string();
        assert!(parse_frame(&text).is_none());
    }

    #[test]
    fn unknown_event_name_is_dropped() {
        let text = json!({ "event": "reports_rendered", "data": {} }).to_string();
        assert!(parse_frame(&text).is_none());
        let text = json!({ "event": "vendors_upserted", "data": {} }).to_string();
        assert!(parse_frame(&text).is_none());
    }

    #[test]
    fn garbage_frame_is_dropped() {
        assert!(parse_frame("not json at all").is_none());
    }

    #[test]
    fn connection_status_passes_through() {
        let text = json!({
            "event": "connection_status",
            "data": { "status": "degraded", "message": "replica lag" }
        })
        .to_string();

        let Some(ChannelMessage::Status { status, message }) = parse_frame(&text) else {
            panic!("expected a status message");
        };
        assert_eq!(status, "degraded");
        assert_eq!(message.as_deref(), Some("replica lag"));
    }

    #[test]
    fn invalid_token_status_becomes_auth_rejection() {
        let text = json!({
            "event": "connection_status",
            "data": { "status": "error", "message": "Invalid token supplied" }
        })
        .to_string();

        assert!(matches!(
            parse_frame(&text),
            Some(ChannelMessage::AuthRejected { .. })
        ));
    }

    #[test]
    fn plain_error_status_is_not_auth_rejection() {
        let text = json!({
            "event": "connection_status",
            "data": { "status": "error", "message": "change stream hiccup" }
        })
        .to_string();

        assert!(matches!(
            parse_frame(&text),
            Some(ChannelMessage::Status { ref status, .. }) if status == "error"
        ));
    }
}
