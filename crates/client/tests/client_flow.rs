//! Integration tests for the caching client.
//!
//! Uses wiremock for HTTP mocking. Tests cover pagination aggregation,
//! cache hit/miss classification, quota accounting, cache-only mode,
//! credential scrubbing, and malformed-body handling.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rasplet_client::{Client, ClientError, Endpoint, PageBody, Provenance, params};
use rasplet_core::usage::{JsonFileCounter, UsageCounter, key_id};
use rasplet_core::{CacheBackend, ClientConfig, CounterBackend};

const API_KEY: &str = "test-key-123";

fn test_config(server: &MockServer, dir: &Path) -> ClientConfig {
    ClientConfig {
        api_key: Some(API_KEY.into()),
        base_url: server.uri(),
        cache_backend: CacheBackend::File { dir: dir.join("cache") },
        counter_backend: Some(CounterBackend::Json { path: dir.join("usage.json") }),
        ..Default::default()
    }
}

async fn create_test_client(server: &MockServer, dir: &Path) -> Client {
    Client::new(test_config(server, dir)).await.expect("failed to create client")
}

async fn counter_count(dir: &Path) -> u64 {
    let counter = JsonFileCounter::new(dir.join("usage.json"), key_id(API_KEY));
    counter.get_count(chrono::Local::now().date_naive()).await.unwrap()
}

fn search_page(total: u64, offset: u64, count: u64) -> Value {
    let segments: Vec<Value> = (0..count).map(|i| json!({"n": offset + i})).collect();
    json!({
        "pagination": {"total": total, "limit": 100, "offset": offset},
        "segments": segments,
    })
}

#[tokio::test]
async fn test_paginated_call_merges_pages_and_counts_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(192, 0, 100)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(192, 100, 92)))
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;
    let result = client
        .search(&params(&[("from", "s9600366"), ("to", "s9600213")]))
        .await
        .unwrap();

    assert_eq!(result.pages, 2);
    assert_eq!(result.items.len(), 192);
    assert_eq!(result.provenance, Provenance::Live);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        let query = request.url.query().unwrap_or("");
        assert!(query.contains(&format!("apikey={API_KEY}")), "outbound request must carry the credential");
        assert!(query.contains("limit=100"));
    }

    // One quota unit for the whole aggregated call.
    assert_eq!(counter_count(dir.path()).await, 1);
}

#[tokio::test]
async fn test_missing_pagination_metadata_stops_after_first_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/schedule/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"schedule": [{"n": 0}, {"n": 1}, {"n": 2}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;
    let result = client.schedule(&params(&[("station", "s9600366")])).await.unwrap();

    assert_eq!(result.pages, 1);
    assert_eq!(result.items.len(), 3);
    assert_eq!(counter_count(dir.path()).await, 1);
}

#[tokio::test]
async fn test_zero_total_yields_single_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(0, 0, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;
    let result = client.search(&params(&[("from", "a"), ("to", "b")])).await.unwrap();

    assert_eq!(result.pages, 1);
    assert!(result.items.is_empty());
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {"code": "SU"}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;

    let first = client.carrier(&params(&[("code", "SU")])).await.unwrap();
    assert_eq!(first.provenance, Provenance::Live);

    let second = client.carrier(&params(&[("code", "SU")])).await.unwrap();
    assert!(second.is_from_cache());
    assert_eq!(second.json(), first.json());

    // The cache hit performed no quota increment.
    assert_eq!(counter_count(dir.path()).await, 1);
}

#[tokio::test]
async fn test_persisted_cache_never_contains_credential() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {"code": "SU"}})))
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;
    client.carrier(&params(&[("code", "SU")])).await.unwrap();

    let cache_dir = dir.path().join("cache");
    let mut inspected = 0;
    for entry in std::fs::read_dir(&cache_dir).unwrap() {
        let path = entry.unwrap().path();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains(API_KEY), "cache entry {} embeds the credential", path.display());
        inspected += 1;
    }
    assert!(inspected > 0, "expected at least one cache entry");
}

#[tokio::test]
async fn test_cached_body_is_byte_identical() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let body = r#"{"carrier":{"code":"SU","title":"Aeroflot"}}"#;
    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/json"))
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;
    client.carrier(&params(&[("code", "SU")])).await.unwrap();

    let cache_dir = dir.path().join("cache");
    let entry_path = std::fs::read_dir(&cache_dir).unwrap().next().unwrap().unwrap().path();
    let entry: Value = serde_json::from_str(&std::fs::read_to_string(entry_path).unwrap()).unwrap();
    assert_eq!(entry["body"], body);
}

#[tokio::test]
async fn test_cache_only_miss_raises_with_guidance() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let config = ClientConfig { cache_only: true, ..test_config(&server, dir.path()) };
    let client = Client::new(config).await.unwrap();

    let err = client.carrier(&params(&[("code", "SU")])).await.unwrap_err();
    match err {
        ClientError::CacheMiss(message) => {
            assert!(message.contains("carrier"));
            assert!(message.contains("cache_only"));
        }
        other => panic!("expected CacheMiss, got {other:?}"),
    }

    // The caller asked to never touch the network.
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(counter_count(dir.path()).await, 0);
}

#[tokio::test]
async fn test_cache_only_hit_returns_cached_value() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {"code": "SU"}})))
        .expect(1)
        .mount(&server)
        .await;

    let warm = create_test_client(&server, dir.path()).await;
    warm.carrier(&params(&[("code", "SU")])).await.unwrap();

    let config = ClientConfig { cache_only: true, ..test_config(&server, dir.path()) };
    let offline = Client::new(config).await.unwrap();
    let envelope = offline.carrier(&params(&[("code", "SU")])).await.unwrap();

    assert!(envelope.is_from_cache());
    assert_eq!(envelope.json().unwrap()["carrier"]["code"], "SU");
    assert_eq!(counter_count(dir.path()).await, 1);
}

#[tokio::test]
async fn test_quota_exceeded_in_safe_mode() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thread/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stops": []})))
        .mount(&server)
        .await;

    let config = ClientConfig { daily_limit: 1, ..test_config(&server, dir.path()) };
    let client = Client::new(config).await.unwrap();

    client.carrier(&params(&[("code", "SU")])).await.unwrap();
    assert_eq!(counter_count(dir.path()).await, 1);

    let err = client.thread(&params(&[("uid", "723R_0_2")])).await.unwrap_err();
    assert!(matches!(err, ClientError::QuotaExceeded { count: 1, limit: 1 }));

    // Safe mode is a soft guard: the check runs after the HTTP call, so
    // the triggering request itself still went out.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(counter_count(dir.path()).await, 1);
}

#[tokio::test]
async fn test_safe_mode_off_keeps_counting_past_limit() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thread/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stops": []})))
        .mount(&server)
        .await;

    let config = ClientConfig { daily_limit: 1, safe_mode: false, ..test_config(&server, dir.path()) };
    let client = Client::new(config).await.unwrap();

    client.carrier(&params(&[("code", "SU")])).await.unwrap();
    client.thread(&params(&[("uid", "723R_0_2")])).await.unwrap();

    assert_eq!(counter_count(dir.path()).await, 2);
}

#[tokio::test]
async fn test_malformed_body_is_data_not_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/copyright/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>backend error</html>"))
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;
    let envelope = client.copyright(&params(&[])).await.unwrap();

    assert_eq!(envelope.body, PageBody::Malformed { raw: "<html>backend error</html>".to_string() });

    // Aggregation survives the bad page and flags it as data.
    let aggregate = client
        .fetch_all_with(Endpoint::Copyright, &params(&[]), None)
        .await
        .unwrap();
    assert_eq!(aggregate.pages, 1);
    assert_eq!(aggregate.items[0]["error"], "failed to decode JSON");
    assert_eq!(aggregate.items[0]["raw"], "<html>backend error</html>");
}

#[tokio::test]
async fn test_unknown_endpoint_name_is_an_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let client = create_test_client(&server, dir.path()).await;
    let err = client.fetch_named("bogus", &params(&[])).await.unwrap_err();
    assert!(matches!(err, ClientError::UnknownEndpoint(name) if name == "bogus"));
}

#[tokio::test]
async fn test_cache_disabled_is_unknown_provenance_and_uncounted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {}})))
        .mount(&server)
        .await;

    let config = ClientConfig { cache_enabled: false, ..test_config(&server, dir.path()) };
    let client = Client::new(config).await.unwrap();

    let envelope = client.carrier(&params(&[("code", "SU")])).await.unwrap();
    assert_eq!(envelope.provenance, Provenance::Unknown);
    assert!(!client.is_cached(Endpoint::Carrier, &params(&[("code", "SU")])).await.unwrap());
    assert_eq!(counter_count(dir.path()).await, 0);
}

#[tokio::test]
async fn test_force_live_bypasses_cache_read() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {}})))
        .mount(&server)
        .await;

    let warm = create_test_client(&server, dir.path()).await;
    warm.carrier(&params(&[("code", "SU")])).await.unwrap();

    let config = ClientConfig { force_live: true, ..test_config(&server, dir.path()) };
    let fresh = Client::new(config).await.unwrap();
    let envelope = fresh.carrier(&params(&[("code", "SU")])).await.unwrap();

    assert_eq!(envelope.provenance, Provenance::Live);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(counter_count(dir.path()).await, 2);
}

#[tokio::test]
async fn test_invalidate_drops_entry() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {}})))
        .mount(&server)
        .await;

    let client = create_test_client(&server, dir.path()).await;
    let query = params(&[("code", "SU")]);

    client.carrier(&query).await.unwrap();
    assert!(client.is_cached(Endpoint::Carrier, &query).await.unwrap());

    client.invalidate(Endpoint::Carrier, &query).await.unwrap();
    assert!(!client.is_cached(Endpoint::Carrier, &query).await.unwrap());

    client.carrier(&query).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sqlite_backends_round_trip() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {"code": "SU"}})))
        .expect(1)
        .mount(&server)
        .await;

    let db_path = dir.path().join("rasplet.sqlite");
    let config = ClientConfig {
        cache_backend: CacheBackend::Sqlite { path: db_path.clone() },
        // counter inferred: shares the cache database
        counter_backend: None,
        ..test_config(&server, dir.path())
    };
    let client = Client::new(config).await.unwrap();

    let first = client.carrier(&params(&[("code", "SU")])).await.unwrap();
    let second = client.carrier(&params(&[("code", "SU")])).await.unwrap();

    assert_eq!(first.provenance, Provenance::Live);
    assert!(second.is_from_cache());
    assert_eq!(second.json(), first.json());

    let counter = rasplet_core::usage::SqliteCounter::open(&db_path, key_id(API_KEY)).await.unwrap();
    assert_eq!(counter.get_count(chrono::Local::now().date_naive()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_blocking_client_matches_async_outcomes() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {"code": "SU"}})))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let (first, second) = tokio::task::spawn_blocking(move || {
        let client = rasplet_client::blocking::Client::new(config)?;
        let first = client.carrier(&params(&[("code", "SU")]))?;
        let second = client.carrier(&params(&[("code", "SU")]))?;
        Ok::<_, ClientError>((first, second))
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(first.provenance, Provenance::Live);
    assert!(second.is_from_cache());
    assert_eq!(counter_count(dir.path()).await, 1);
}

#[tokio::test]
async fn test_shared_store_can_be_injected() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/carrier/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"carrier": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(rasplet_core::cache::MemoryStore::new());
    let counter = Arc::new(JsonFileCounter::new(dir.path().join("usage.json"), key_id(API_KEY)));

    let config = ClientConfig { api_key: Some(API_KEY.into()), base_url: server.uri(), ..Default::default() };
    let first_client = Client::with_backends(config.clone(), Some(store.clone()), counter.clone()).unwrap();
    let second_client = Client::with_backends(config, Some(store), counter).unwrap();

    first_client.carrier(&params(&[("code", "SU")])).await.unwrap();
    let envelope = second_client.carrier(&params(&[("code", "SU")])).await.unwrap();

    assert!(envelope.is_from_cache());
}
