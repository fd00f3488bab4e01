// REST client for the inventory service.
//
// Wraps `reqwest::Client` with bearer-token auth, collection-aware URL
// construction, and response-to-error mapping. Returns raw JSON values --
// typed deserialization (and per-record hygiene) belongs to the core
// crate, which knows the domain shapes.

use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::events::CollectionKind;
use crate::transport::TransportConfig;

/// Raw HTTP client for the inventory service's REST surface.
///
/// The session token is held behind a lock so the owning engine can swap
/// it (or clear it on auth failure) without rebuilding the client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the service root (e.g. `https://inventory.example.edu`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Install the session token used for subsequent requests.
    pub fn set_token(&self, token: SecretString) {
        *self.token.write().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token);
    }

    /// Drop the session token. Subsequent requests go out unauthenticated.
    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    fn bearer(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }

    // ── Collection reads ─────────────────────────────────────────────

    /// Fetch the full contents of one collection.
    ///
    /// The response must be a JSON array; anything else is a
    /// deserialization error. Elements are returned as raw values.
    pub async fn list_collection(&self, kind: CollectionKind) -> Result<Vec<Value>, Error> {
        let url = self.collection_url(kind)?;
        debug!(collection = %kind, "fetching collection");
        self.get_array(url).await
    }

    /// Fetch the resolved item views assigned to one vendor.
    pub async fn items_for_vendor(&self, vendor_id: &str) -> Result<Vec<Value>, Error> {
        let url = self.base_url.join(&format!("/api/vendors/{vendor_id}/items"))?;
        debug!(vendor_id, "fetching vendor items");
        self.get_array(url).await
    }

    // ── Assignment writes ────────────────────────────────────────────

    /// Create one vendor-item link.
    pub async fn create_vendor_item(&self, vendor_id: &str, item_id: &str) -> Result<Value, Error> {
        let url = self.base_url.join("/api/vendor-items")?;
        let response = self
            .authorized(self.http.post(url))
            .json(&serde_json::json!({ "vendor_id": vendor_id, "item_id": item_id }))
            .send()
            .await?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Deserialization { message: e.to_string() })
    }

    /// Delete one vendor-item link by its own id.
    pub async fn delete_vendor_item(&self, link_id: &str) -> Result<(), Error> {
        let url = self.base_url.join(&format!("/api/vendor-items/{link_id}"))?;
        let response = self.authorized(self.http.delete(url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn collection_url(&self, kind: CollectionKind) -> Result<Url, Error> {
        // Wire names are snake_case; REST paths use hyphens
        // (`inventory_items` -> `/api/inventory-items`).
        let segment = kind.to_string().replace('_', "-");
        Ok(self.base_url.join(&format!("/api/{segment}"))?)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.bearer() {
            Some(header) => builder.header(reqwest::header::AUTHORIZATION, header),
            None => builder,
        }
    }

    async fn get_array(&self, url: Url) -> Result<Vec<Value>, Error> {
        let response = self.authorized(self.http.get(url)).send().await?;
        let response = Self::check(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Deserialization { message: e.to_string() })?;
        match body {
            Value::Array(items) => Ok(items),
            other => Err(Error::Deserialization {
                message: format!("expected a JSON array, got {other}"),
            }),
        }
    }

    /// Map non-2xx responses onto the error taxonomy.
    ///
    /// 401 means the session is gone; 403 means the action is forbidden
    /// but the session survives; everything else surfaces the
    /// body-provided message when there is one.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = body_message(response).await;
        match status.as_u16() {
            401 => Err(Error::SessionExpired),
            403 => Err(Error::PermissionDenied {
                message: message.unwrap_or_else(|| "action not permitted".into()),
            }),
            s => Err(Error::Api {
                status: s,
                message: message.unwrap_or_else(|| status.to_string()),
            }),
        }
    }
}

/// Pull a human-readable message out of an error body, if the service
/// provided one (`{"error": ...}` or `{"message": ...}`).
async fn body_message(response: reqwest::Response) -> Option<String> {
    let body: Value = response.json().await.ok()?;
    body.get("error")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let base = Url::parse("https://inventory.example.edu").unwrap();
        ApiClient::new(base, &TransportConfig::default()).unwrap()
    }

    #[test]
    fn collection_paths_use_hyphens() {
        let c = client();
        assert_eq!(
            c.collection_url(CollectionKind::InventoryItems).unwrap().path(),
            "/api/inventory-items"
        );
        assert_eq!(
            c.collection_url(CollectionKind::VendorItems).unwrap().path(),
            "/api/vendor-items"
        );
        assert_eq!(
            c.collection_url(CollectionKind::Vendors).unwrap().path(),
            "/api/vendors"
        );
    }

    #[test]
    fn bearer_header_tracks_token() {
        let c = client();
        assert!(c.bearer().is_none());
        c.set_token(SecretString::from("tok".to_owned()));
        assert_eq!(c.bearer().as_deref(), Some("Bearer tok"));
        c.clear_token();
        assert!(c.bearer().is_none());
    }
}
