//! End-to-end tests for the read API: a seeded store behind a real listener,
//! exercised over HTTP.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::task::JoinHandle;

use super::{router, ApiContext};
use crate::config::CorsConfig;
use crate::store::{BlockRow, EventRow, EventSource, Store, TxRow};

fn block_row(height: i64) -> BlockRow {
    BlockRow {
        height,
        time: Some(format!("2024-05-01T00:{:02}:{:02}Z", height / 60, height % 60)),
        proposer_address: Some("PROP0001".to_string()),
        block_id_hash: Some(format!("HASH{:04}", height)),
        tx_count: 0,
        block_json: format!("{{\"result\":{{\"height\":\"{}\"}}}}", height),
        results_json: "{\"result\":{}}".to_string(),
    }
}

async fn seed_blocks(store: &Store, n: i64) {
    for h in 1..=n {
        store.write_height(&block_row(h), &[], &[]).await.unwrap();
    }
}

async fn seed_block_with_txs(store: &Store) {
    let mut block = block_row(5);
    block.tx_count = 2;
    let txs = vec![
        TxRow {
            tx_hash: "AAAA1111".to_string(),
            tx_index: 0,
            code: Some(0),
            gas_wanted: Some(100_000),
            gas_used: Some(60_000),
            tx_b64: "AQID".to_string(),
            raw_log: Some("ok".to_string()),
            events_json: "[{\"type\":\"message\",\"attributes\":[]}]".to_string(),
        },
        TxRow {
            tx_hash: "BBBB2222".to_string(),
            tx_index: 1,
            code: Some(4),
            gas_wanted: None,
            gas_used: None,
            tx_b64: "BAUG".to_string(),
            raw_log: None,
            events_json: "not valid json".to_string(),
        },
    ];
    let events = vec![
        EventRow {
            tx_hash: None,
            source: EventSource::BeginBlock,
            event_index: 0,
            event_type: Some("mint".to_string()),
            attributes_json: "[]".to_string(),
        },
        EventRow {
            tx_hash: Some("AAAA1111".to_string()),
            source: EventSource::Tx,
            event_index: 1,
            event_type: Some("message".to_string()),
            attributes_json: "[]".to_string(),
        },
    ];
    store.write_height(&block, &txs, &events).await.unwrap();
}

async fn spawn_api(store: Store, cors: CorsConfig) -> (String, JoinHandle<()>) {
    let ctx = ApiContext { store, db_path: "/tmp/test.sqlite".to_string() };
    let app = router(ctx, cors);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind api listener");
    let addr = listener.local_addr().expect("api addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn identity_health_and_status() {
    let store = Store::in_memory().await.unwrap();
    store.meta_set("chain_id", "retrochain-mainnet").await.unwrap();
    store.set_last_indexed_height(7).await.unwrap();
    let (base, server) = spawn_api(store, CorsConfig::default()).await;

    let body: Value = reqwest::get(format!("{}/", base)).await.unwrap().json().await.unwrap();
    assert_eq!(body["name"], "retrochain-indexer-api");
    assert_eq!(body["version"], "v1");

    let body: Value = reqwest::get(format!("{}/v1/health", base)).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let body: Value = reqwest::get(format!("{}/v1/status", base)).await.unwrap().json().await.unwrap();
    assert_eq!(body["chain_id"], "retrochain-mainnet");
    assert_eq!(body["last_indexed_height"], 7);
    assert_eq!(body["db_path"], "/tmp/test.sqlite");

    server.abort();
}

#[tokio::test]
async fn blocks_pagination_window() {
    let store = Store::in_memory().await.unwrap();
    seed_blocks(&store, 120).await;
    let (base, server) = spawn_api(store, CorsConfig::default()).await;

    let body: Value = reqwest::get(format!("{}/v1/blocks?limit=50&offset=0&order=desc", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 120);
    assert_eq!(body["limit"], 50);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 50);
    assert_eq!(items[0]["height"], 120);
    assert_eq!(items[49]["height"], 71);
    // list rows never carry the raw payloads
    assert!(items[0].get("block_json").is_none());

    // oversized limit clamps to the endpoint bound
    let body: Value = reqwest::get(format!("{}/v1/blocks?limit=10000", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["limit"], 200);

    // non-numeric params fall back to defaults without error
    let body: Value = reqwest::get(format!("{}/v1/blocks?limit=abc&offset=xyz", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["limit"], 20);
    assert_eq!(body["offset"], 0);

    server.abort();
}

#[tokio::test]
async fn block_detail_and_raw_payloads() {
    let store = Store::in_memory().await.unwrap();
    seed_blocks(&store, 3).await;
    let (base, server) = spawn_api(store, CorsConfig::default()).await;

    let resp = reqwest::get(format!("{}/v1/blocks/2", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["height"], 2);
    assert!(body.get("block_json").is_none());
    assert!(body.get("results_json").is_none());

    let body: Value = reqwest::get(format!("{}/v1/blocks/2?include_raw=1", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // stored strings come back parsed
    assert_eq!(body["block_json"]["result"]["height"], "2");
    assert!(body["results_json"].is_object());

    let resp = reqwest::get(format!("{}/v1/blocks/abc", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "height must be an integer");

    let resp = reqwest::get(format!("{}/v1/blocks/999", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not found");

    server.abort();
}

#[tokio::test]
async fn tx_list_and_detail() {
    let store = Store::in_memory().await.unwrap();
    seed_blocks(&store, 4).await;
    seed_block_with_txs(&store).await;
    let (base, server) = spawn_api(store, CorsConfig::default()).await;

    let body: Value = reqwest::get(format!("{}/v1/txs?height=5", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 2);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["tx_index"], 0);
    assert_eq!(items[1]["tx_index"], 1);
    // summary rows omit the raw tx bytes
    assert!(items[0].get("tx_b64").is_none());
    assert_eq!(items[0]["block_time"], "2024-05-01T00:00:05Z");

    // junk height filter is ignored, order typo falls back to desc
    let body: Value = reqwest::get(format!("{}/v1/txs?height=5x&order=sideways", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 2);

    // lookup is case-insensitive on the hash
    let resp = reqwest::get(format!("{}/v1/txs/aaaa1111", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tx_hash"], "AAAA1111");
    assert_eq!(body["height"], 5);
    assert!(body.get("events_json").is_none());
    assert_eq!(body["events"][0]["type"], "message");

    // unparseable stored events degrade to an empty array
    let body: Value = reqwest::get(format!("{}/v1/txs/BBBB2222", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["events"], Value::Array(Vec::new()));
    assert_eq!(body["code"], 4);
    assert_eq!(body["gas_wanted"], Value::Null);

    let resp = reqwest::get(format!("{}/v1/txs/CCCC3333", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.abort();
}

#[tokio::test]
async fn events_listing_and_filters() {
    let store = Store::in_memory().await.unwrap();
    seed_block_with_txs(&store).await;
    let (base, server) = spawn_api(store, CorsConfig::default()).await;

    let body: Value = reqwest::get(format!("{}/v1/events?height=5", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 2);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["event_index"], 0);
    assert_eq!(items[0]["source"], "begin_block");
    assert_eq!(items[1]["source"], "tx");

    // tx_hash filter upper-cases its input
    let body: Value = reqwest::get(format!("{}/v1/events?tx_hash=aaaa1111", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["event_type"], "message");

    // unknown order falls back to ascending without error
    let resp = reqwest::get(format!("{}/v1/events?order=xyz", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["items"][0]["event_index"], 0);

    let body: Value = reqwest::get(format!("{}/v1/events?type=mint&source=begin_block", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);

    server.abort();
}

#[tokio::test]
async fn unknown_paths_answer_json_not_found() {
    let store = Store::in_memory().await.unwrap();
    let (base, server) = spawn_api(store, CorsConfig::default()).await;

    let resp = reqwest::get(format!("{}/v1/nope", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not found");

    server.abort();
}

#[tokio::test]
async fn cors_allowlist() {
    let store = Store::in_memory().await.unwrap();
    seed_blocks(&store, 1).await;
    let (base, server) =
        spawn_api(store, CorsConfig::from_list("https://explorer.example")).await;
    let client = reqwest::Client::new();

    // preflight from a disallowed origin: 204, no CORS headers
    let resp = client
        .request(Method::OPTIONS, format!("{}/v1/blocks", base))
        .header("Origin", "https://evil.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.headers().get("access-control-allow-origin").is_none());

    // preflight from the allowlisted origin
    let resp = client
        .request(Method::OPTIONS, format!("{}/v1/blocks", base))
        .header("Origin", "https://explorer.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "https://explorer.example"
    );
    assert_eq!(resp.headers().get("vary").unwrap(), "Origin");
    assert_eq!(
        resp.headers().get("access-control-allow-methods").unwrap(),
        "GET, OPTIONS"
    );

    // plain GET from the allowlisted origin also carries the headers
    let resp = client
        .get(format!("{}/v1/blocks", base))
        .header("Origin", "https://explorer.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "https://explorer.example"
    );

    // no Origin header, no CORS headers
    let resp = client.get(format!("{}/v1/blocks", base)).send().await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());

    server.abort();
}

#[tokio::test]
async fn cors_disabled_without_allowlist() {
    let store = Store::in_memory().await.unwrap();
    let (base, server) = spawn_api(store, CorsConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/v1/health", base))
        .header("Origin", "https://explorer.example")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());

    // OPTIONS still answers 204 even with CORS disabled
    let resp = client
        .request(Method::OPTIONS, format!("{}/v1/health", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    server.abort();
}

#[tokio::test]
async fn cors_wildcard() {
    let store = Store::in_memory().await.unwrap();
    let (base, server) = spawn_api(store, CorsConfig::from_list("*")).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/v1/health", base))
        .header("Origin", "https://anywhere.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");

    server.abort();
}
