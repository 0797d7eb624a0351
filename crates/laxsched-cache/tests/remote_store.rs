//! Integration tests for the REST key/value backend.
//!
//! A `wiremock` server stands in for the remote service; each test asserts
//! the exact command array that was posted.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use laxsched_cache::{CacheError, CacheMode, CacheStore, RemoteStore};

fn test_cache(server: &MockServer) -> CacheStore {
    let store = RemoteStore::new(&server.uri(), "test-token", 5).expect("build remote store");
    CacheStore::remote(store)
}

#[tokio::test]
async fn get_sends_bearer_token_and_decodes_json_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!(["GET", "games:lastUpdated"])))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": "\"2026-03-14T17:00:00Z\""})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    let value = cache.get("games:lastUpdated").await.unwrap();
    assert_eq!(value, Some(json!("2026-03-14T17:00:00Z")));
}

#[tokio::test]
async fn get_of_missing_key_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["GET", "absent"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    assert_eq!(cache.get("absent").await.unwrap(), None);
}

#[tokio::test]
async fn set_with_ttl_sends_expiry_in_seconds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["SET", "rankings:mens", "[1,2]", "EX", 172_800])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    cache
        .set(
            "rankings:mens",
            &json!([1, 2]),
            Some(Duration::from_secs(48 * 60 * 60)),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn incr_reapplies_counter_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["INCR", "clicks:fubo:g1"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 3})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["EXPIRE", "clicks:fubo:g1", 604_800])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    assert_eq!(cache.incr("clicks:fubo:g1").await.unwrap(), 3);
}

#[tokio::test]
async fn clear_prefix_deletes_enumerated_keys() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["KEYS", "games:*"])))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": ["games:schedule", "games:lastUpdated"]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!(["DEL", "games:lastUpdated", "games:schedule"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    assert_eq!(cache.clear_prefix("games:").await.unwrap(), 2);
}

#[tokio::test]
async fn clear_prefix_with_no_matches_skips_delete() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["KEYS", "scrape:*"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": []})))
        .expect(1)
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    assert_eq!(cache.clear_prefix("scrape:").await.unwrap(), 0);
}

#[tokio::test]
async fn service_error_body_maps_to_remote_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "WRONGPASS invalid token"})),
        )
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    let result = cache.get("k").await;
    assert!(
        matches!(&result, Err(CacheError::Remote(msg)) if msg.contains("WRONGPASS")),
        "expected Remote error, got: {result:?}"
    );
}

#[tokio::test]
async fn non_success_status_without_error_body_maps_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    let result = cache.delete("k").await;
    assert!(
        matches!(result, Err(CacheError::UnexpectedStatus { status: 503 })),
        "expected UnexpectedStatus(503), got: {result:?}"
    );
}

#[tokio::test]
async fn status_reports_remote_mode_and_key_count() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["KEYS", "*"])))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": ["a", "b", "c"]})),
        )
        .mount(&server)
        .await;

    let cache = test_cache(&server);
    let status = cache.status().await.unwrap();
    assert_eq!(status.mode, CacheMode::Remote);
    assert_eq!(status.key_count, 3);
}
