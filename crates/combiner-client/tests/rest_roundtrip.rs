//! Integration tests for the REST clients against an in-process stand-in
//! for the Combiner Service, built on axum.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cb_domain::config::CombinerConfig;
use cb_domain::error::Error;
use cb_rest::{
    create_context_source, CombinerRestClient, ContextManagerClient, SearchContextsBody,
};
use serde_json::{json, Value};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stand-in service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn header(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| Value::String(v.to_owned()))
        .unwrap_or(Value::Null)
}

async fn token() -> Json<Value> {
    Json(json!({ "token": "tok-123" }))
}

async fn fs_list(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    let path = q.get("path").cloned().unwrap_or_default();
    if path == "slow" {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Json(json!({
        "path": path,
        "entries": ["a.txt", "b.txt"],
        "traceId": header(&headers, "x-trace-id"),
        "module": header(&headers, "x-module-id"),
        "apiKey": header(&headers, "x-api-key"),
    }))
    .into_response()
}

async fn fs_read(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "received": body, "content": "hello" }))
}

async fn fs_write(Json(body): Json<Value>) -> impl IntoResponse {
    format!("wrote {}", body["content"].as_str().unwrap_or_default().len())
}

async fn db_list(
    Path((module, collection)): Path<(String, String)>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    Json(json!([{
        "module": module,
        "collection": collection,
        "filter": q.get("filter"),
    }]))
}

async fn db_create(
    Path((module, collection)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "id": "doc-1", "module": module, "collection": collection, "doc": body })),
    )
}

async fn db_read(Path((_, _, id)): Path<(String, String, String)>) -> Response {
    match id.as_str() {
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no such document" })),
        )
            .into_response(),
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, "kaboom").into_response(),
        _ => Json(json!({ "id": id })).into_response(),
    }
}

async fn db_update(
    Path((_, _, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    Json(json!({ "id": id, "updated": body }))
}

async fn db_delete(Path((_, _, id)): Path<(String, String, String)>) -> String {
    format!("deleted {id}")
}

async fn labeling_search(Json(body): Json<Value>) -> Json<Value> {
    let name = body["query"].as_str().unwrap_or("everything").to_owned();
    Json(json!({
        "success": true,
        "data": [{
            "id": "remote-1",
            "name": name,
            "content": "from the service",
            "tags": [],
            "updatedAt": "2024-02-01T00:00:00Z"
        }]
    }))
}

async fn labeling_process(Json(body): Json<Value>) -> Json<Value> {
    let n = body["ids"].as_array().map(Vec::len).unwrap_or(0);
    Json(json!({ "success": true, "processed": n }))
}

async fn spawn_service() -> SocketAddr {
    let app = Router::new()
        .route("/get-token", get(token))
        .route("/api/fs/list", get(fs_list))
        .route("/api/fs/read", post(fs_read))
        .route("/api/fs/write", post(fs_write))
        .route("/api/db/:module/:collection", get(db_list).post(db_create))
        .route(
            "/api/db/:module/:collection/:id",
            get(db_read).put(db_update).delete(db_delete),
        )
        .route("/api/labeling/search", post(labeling_search))
        .route("/api/labeling/process", post(labeling_process));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr, module: &str) -> CombinerConfig {
    let mut cfg = CombinerConfig::for_module(module);
    cfg.base_url = format!("http://{addr}");
    cfg.rest.timeout_ms = 2000;
    cfg
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CombinerRestClient
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn session_token_reads_token_field() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();

    assert_eq!(client.session_token().await.unwrap(), "tok-123");
}

#[tokio::test]
async fn requests_carry_module_and_default_headers() {
    let addr = spawn_service().await;
    let mut cfg = config_for(addr, "notes");
    cfg.rest
        .default_headers
        .insert("X-Api-Key".into(), "secret".into());
    let client = CombinerRestClient::new(&cfg).unwrap();

    let listing = client.list_dir(".").await.unwrap();
    assert_eq!(listing["module"], "notes");
    assert_eq!(listing["apiKey"], "secret");
}

#[tokio::test]
async fn list_dir_passes_path_and_trace_id() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();

    let listing = client.list_dir("docs/my notes").await.unwrap();
    assert_eq!(listing["path"], "docs/my notes");
    assert_eq!(listing["entries"], json!(["a.txt", "b.txt"]));
    assert!(listing["traceId"].as_str().is_some_and(|t| t.len() == 36));
}

#[tokio::test]
async fn read_file_defaults_encoding() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();

    let resp = client.read_file("a.txt", None).await.unwrap();
    assert_eq!(resp["received"], json!({"path": "a.txt", "encoding": "utf-8"}));

    let resp = client.read_file("a.bin", Some("base64")).await.unwrap();
    assert_eq!(resp["received"]["encoding"], "base64");
}

#[tokio::test]
async fn non_json_success_body_is_returned_as_text() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();

    let resp = client.write_file("a.txt", "hello", None).await.unwrap();
    assert_eq!(resp, Value::String("wrote 5".into()));

    let resp = client.db_delete("drafts", "doc-1").await.unwrap();
    assert_eq!(resp, Value::String("deleted doc-1".into()));
}

#[tokio::test]
async fn db_paths_are_scoped_and_encoded() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes app")).unwrap();

    let created = client
        .db_create("drafts/2024", &json!({"title": "hi"}))
        .await
        .unwrap();
    assert_eq!(created["module"], "notes app");
    assert_eq!(created["collection"], "drafts/2024");
    assert_eq!(created["doc"], json!({"title": "hi"}));

    let read = client.db_read("drafts", "a b?c").await.unwrap();
    assert_eq!(read["id"], "a b?c");

    let updated = client
        .db_update("drafts", "doc-1", &json!({"title": "bye"}))
        .await
        .unwrap();
    assert_eq!(updated["updated"]["title"], "bye");
}

#[tokio::test]
async fn db_list_sends_filter_only_when_non_empty() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();

    let all = client.db_list("drafts", None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["filter"], Value::Null);

    let empty = serde_json::Map::new();
    let all = client.db_list("drafts", Some(&empty)).await.unwrap();
    assert_eq!(all[0]["filter"], Value::Null);

    let mut filter = serde_json::Map::new();
    filter.insert("status".into(), json!("open"));
    let some = client.db_list("drafts", Some(&filter)).await.unwrap();
    let sent: Value = serde_json::from_str(some[0]["filter"].as_str().unwrap()).unwrap();
    assert_eq!(sent, json!({"status": "open"}));
}

#[tokio::test]
async fn error_status_carries_json_payload() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();

    match client.db_read("drafts", "missing").await {
        Err(Error::Status {
            status,
            status_text,
            payload,
        }) => {
            assert_eq!(status, 404);
            assert_eq!(status_text, "Not Found");
            assert_eq!(payload, json!({"error": "no such document"}));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_falls_back_to_text_payload() {
    let addr = spawn_service().await;
    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();

    let err = client.db_read("drafts", "boom").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    match err {
        Error::Status { payload, .. } => assert_eq!(payload, Value::String("kaboom".into())),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let addr = spawn_service().await;
    let mut cfg = config_for(addr, "notes");
    cfg.rest.timeout_ms = 100;
    let client = CombinerRestClient::new(&cfg).unwrap();

    let err = client.list_dir("slow").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_service_is_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CombinerRestClient::new(&config_for(addr, "notes")).unwrap();
    let err = client.session_token().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)), "got {err:?}");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Labeling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn live_search_goes_to_the_service() {
    let addr = spawn_service().await;
    let client = ContextManagerClient::new(&config_for(addr, "")).unwrap();

    let resp = client
        .search_contexts(Some(SearchContextsBody::query("docker")))
        .await
        .unwrap();
    assert!(resp.success);
    let data = resp.data.unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].id, "remote-1");
    assert_eq!(data[0].name.as_deref(), Some("docker"));
}

#[tokio::test]
async fn toggling_test_mode_switches_backends() {
    let addr = spawn_service().await;
    let mut cfg = config_for(addr, "");
    cfg.rest.mock_delay_ms = 0;
    let client = ContextManagerClient::new(&cfg).unwrap();

    client.set_test_mode(true);
    let resp = client
        .search_contexts(Some(SearchContextsBody::query("docker")))
        .await
        .unwrap();
    assert_eq!(resp.data.unwrap()[0].id, "6");

    client.set_test_mode(false);
    let resp = client
        .search_contexts(Some(SearchContextsBody::query("docker")))
        .await
        .unwrap();
    assert_eq!(resp.data.unwrap()[0].id, "remote-1");
}

#[tokio::test]
async fn process_contexts_always_uses_network() {
    let addr = spawn_service().await;
    let mut cfg = config_for(addr, "");
    cfg.test_mode = true;
    let client = ContextManagerClient::new(&cfg).unwrap();

    let resp = client
        .process_contexts(&json!({"ids": ["1", "2", "3"]}))
        .await
        .unwrap();
    assert_eq!(resp["processed"], 3);
}

#[tokio::test]
async fn context_source_follows_test_mode() {
    let addr = spawn_service().await;
    let mut cfg = config_for(addr, "");

    let live = create_context_source(&cfg).unwrap();
    let out = live.search(SearchContextsBody::default()).await.unwrap();
    assert_eq!(out[0].id, "remote-1");

    cfg.test_mode = true;
    let offline = create_context_source(&cfg).unwrap();
    let out = offline.search(SearchContextsBody::default()).await.unwrap();
    assert_eq!(out.len(), 10);
}
