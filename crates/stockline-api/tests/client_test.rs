// Integration tests for `ApiClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stockline_api::{ApiClient, CollectionKind, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).expect("mock server URI");
    let client = ApiClient::new(base, &TransportConfig::default()).expect("client");
    client.set_token(SecretString::from("tok-1".to_owned()));
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn list_collection_sends_bearer_and_returns_elements() {
    let (server, client) = setup().await;

    let body = json!([
        { "_id": "v1", "name": "Acme Supply", "contact": "acme@example.com", "phone": "555-0101" },
        { "_id": "v2", "name": "Campus Paper", "contact": "cp@example.com", "phone": "555-0102" },
    ]);

    Mock::given(method("GET"))
        .and(path("/api/vendors"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let vendors = client.list_collection(CollectionKind::Vendors).await.expect("list");
    assert_eq!(vendors.len(), 2);
    assert_eq!(vendors[0]["_id"], "v1");
    assert_eq!(vendors[1]["name"], "Campus Paper");
}

#[tokio::test]
async fn items_for_vendor_hits_nested_path() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/vendors/v7/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "_id": "i1", "name": "Chairs", "category": "Furniture" }
        ])))
        .mount(&server)
        .await;

    let items = client.items_for_vendor("v7").await.expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Chairs");
}

#[tokio::test]
async fn create_vendor_item_posts_link_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/vendor-items"))
        .and(body_json(json!({ "vendor_id": "v1", "item_id": "i2" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "link-9", "vendor_id": "v1", "item_id": "i2"
        })))
        .mount(&server)
        .await;

    let created = client.create_vendor_item("v1", "i2").await.expect("create");
    assert_eq!(created["_id"], "link-9");
}

#[tokio::test]
async fn delete_vendor_item_is_ok_on_204() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/vendor-items/link-9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client.delete_vendor_item("link-9").await.expect("delete");
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_maps_to_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "token expired" })))
        .mount(&server)
        .await;

    let err = client.list_collection(CollectionKind::Users).await.expect_err("401");
    assert!(matches!(err, Error::SessionExpired));
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn forbidden_maps_to_permission_denied_with_message() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/vendor-items/link-1"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "error": "admins only" })),
        )
        .mount(&server)
        .await;

    let err = client.delete_vendor_item("link-1").await.expect_err("403");
    let Error::PermissionDenied { message } = err else {
        panic!("expected PermissionDenied, got {err:?}");
    };
    assert_eq!(message, "admins only");
}

#[tokio::test]
async fn other_failures_surface_body_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "db unavailable" })),
        )
        .mount(&server)
        .await;

    let err = client.list_collection(CollectionKind::Orders).await.expect_err("500");
    let Error::Api { status, message } = err else {
        panic!("expected Api, got {err:?}");
    };
    assert_eq!(status, 500);
    assert_eq!(message, "db unavailable");
}

#[tokio::test]
async fn failures_without_a_body_get_a_generic_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client.list_collection(CollectionKind::Logs).await.expect_err("502");
    let Error::Api { status, .. } = err else {
        panic!("expected Api, got {err:?}");
    };
    assert_eq!(status, 502);
}

#[tokio::test]
async fn non_array_collection_body_is_a_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "wrapped wrong" })),
        )
        .mount(&server)
        .await;

    let err = client
        .list_collection(CollectionKind::Notifications)
        .await
        .expect_err("non-array");
    assert!(matches!(err, Error::Deserialization { .. }));
}
