//! HTTP surface tests: route wiring, API-key enforcement, and the JSON
//! error envelope, driven through the router without binding a socket.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use lore_keeper::embedding::Embedder;
use lore_keeper::error::EmbeddingError;
use lore_keeper::server::{router, AppState};
use lore_keeper::store::memory::MemoryStore;
use lore_keeper::sync::LoreSync;

const API_KEY: &str = "test-key";

/// Fixed-output embedder; the HTTP tests exercise routing, not ranking.
struct ConstEmbedder;

#[async_trait]
impl Embedder for ConstEmbedder {
    fn model_name(&self) -> &str {
        "const-stub"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![text.len() as f32, 1.0])
    }
}

fn test_server() -> TestServer {
    let sync = Arc::new(LoreSync::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ConstEmbedder),
    ));
    let state = AppState {
        sync,
        api_key: Some(API_KEY.to_string()),
    };
    TestServer::new(router(state)).unwrap()
}

fn sample_entry() -> Value {
    json!({
        "title": "Gloomfang",
        "content": "A shadow cat that stalks the rooftops.",
        "category": "bestiary",
        "tags": ["predator"]
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let server = test_server();
    let res = server.get("/health").await;
    res.assert_status_ok();
    let body: Value = res.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn mutations_require_api_key() {
    let server = test_server();

    let res = server.post("/lore").json(&sample_entry()).await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = res.json();
    assert_eq!(body["error"]["code"], "unauthorized");

    let res = server
        .post("/lore")
        .add_header("x-api-key", "wrong-key")
        .json(&sample_entry())
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_api_key_config_disables_mutations() {
    let sync = Arc::new(LoreSync::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ConstEmbedder),
    ));
    let state = AppState {
        sync,
        api_key: None,
    };
    let server = TestServer::new(router(state)).unwrap();

    let res = server
        .post("/lore")
        .add_header("x-api-key", "anything")
        .json(&sample_entry())
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_read_flow() {
    let server = test_server();

    let res = server
        .post("/lore")
        .add_header("x-api-key", API_KEY)
        .json(&sample_entry())
        .await;
    res.assert_status_ok();
    let created: Value = res.json();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["title"], "Gloomfang");
    assert_eq!(created["category"], "bestiary");

    // List returns summaries by default.
    let res = server.get("/lore").await;
    res.assert_status_ok();
    let listed: Value = res.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Gloomfang");
    assert!(listed[0].get("content").is_none());

    // Full listing includes the body.
    let res = server.get("/lore?full=true").await;
    let listed: Value = res.json();
    assert!(listed[0]["content"].as_str().is_some());

    let res = server.get(&format!("/lore/{id}")).await;
    res.assert_status_ok();
    let fetched: Value = res.json();
    assert_eq!(fetched["id"], id.as_str());
}

#[tokio::test]
async fn get_unknown_id_is_404() {
    let server = test_server();
    let res = server.get("/lore/no-such-id").await;
    res.assert_status(StatusCode::NOT_FOUND);
    let body: Value = res.json();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn create_with_blank_title_is_400() {
    let server = test_server();
    let res = server
        .post("/lore")
        .add_header("x-api-key", API_KEY)
        .json(&json!({
            "title": "",
            "content": "body",
            "category": "bestiary"
        }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["error"]["code"], "validation");
}

#[tokio::test]
async fn patch_updates_fields() {
    let server = test_server();
    let res = server
        .post("/lore")
        .add_header("x-api-key", API_KEY)
        .json(&sample_entry())
        .await;
    let id = res.json::<Value>()["id"].as_str().unwrap().to_string();

    let res = server
        .patch(&format!("/lore/{id}"))
        .add_header("x-api-key", API_KEY)
        .json(&json!({ "tags": ["predator", "cave"] }))
        .await;
    res.assert_status_ok();
    let updated: Value = res.json();
    assert_eq!(updated["tags"], json!(["predator", "cave"]));
    assert_eq!(updated["title"], "Gloomfang");

    let res = server
        .patch("/lore/no-such-id")
        .add_header("x-api-key", API_KEY)
        .json(&json!({ "title": "X" }))
        .await;
    res.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_flow() {
    let server = test_server();
    let res = server
        .post("/lore")
        .add_header("x-api-key", API_KEY)
        .json(&sample_entry())
        .await;
    let id = res.json::<Value>()["id"].as_str().unwrap().to_string();

    let res = server
        .delete(&format!("/lore/{id}"))
        .add_header("x-api-key", API_KEY)
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["deleted"], true);

    let res = server
        .delete(&format!("/lore/{id}"))
        .add_header("x-api-key", API_KEY)
        .await;
    res.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_and_categories_routes() {
    let server = test_server();
    server
        .post("/lore")
        .add_header("x-api-key", API_KEY)
        .json(&sample_entry())
        .await
        .assert_status_ok();

    let res = server.get("/lore/search?q=shadow+cat").await;
    res.assert_status_ok();
    let hits: Value = res.json();
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["entry"]["title"], "Gloomfang");
    assert!(hits[0]["score"].as_f64().is_some());

    let res = server.get("/lore/categories").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>(), json!(["bestiary"]));
}
