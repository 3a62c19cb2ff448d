///! Integration tests against live Postgres/Redis, driving a fully-built
///! `AppState` through `runtime_http::handle` the same way the axum
///! fallback in `main.rs` does, without binding a TCP listener.
///! All tests are `#[ignore]` — run with `cargo test -- --ignored`.
///!
///! Requirements: DATABASE_URL, REDIS_URL pointing at reachable instances
///! with the `users`/`items` tables migrated.
use std::collections::HashMap;

use http::{HeaderMap, Method, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use runtime_common::config::SystemConfig;
use runtime_http::{handle, RequestContext};
use runtime_server::config::RuntimeConfig;
use runtime_server::state::AppState;
use serde_json::{json, Value};

fn test_config() -> RuntimeConfig {
    let mut system = SystemConfig::default();
    system.server.workers = 1;
    system.rdb_pool.min = 1;
    system.rdb_pool.max = 3;
    system.kv_pool.min = 1;
    system.kv_pool.max = 3;

    RuntimeConfig {
        system,
        database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL not set"),
        redis_url: std::env::var("REDIS_URL").expect("REDIS_URL not set"),
        debug: true,
    }
}

async fn request(state: &AppState, method: Method, path: &str, body: Value) -> (StatusCode, Value) {
    let worker = state.pick_worker();
    worker.worker.ready().wait_ready().await.expect("worker never became ready");

    let body_bytes = if body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(&body).unwrap()
    };

    let mut ctx = RequestContext::new(method, path.to_string(), HashMap::new(), HeaderMap::new(), body_bytes.into());
    let response = handle(&worker.router, &worker.global_pipeline, &mut ctx, state.config.debug).await;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, parsed)
}

#[tokio::test]
#[ignore]
async fn health_reports_ok_once_worker_is_ready() {
    let (_, handle) = PrometheusBuilder::new().build_recorder();
    let state = AppState::build(test_config(), handle).await.expect("build failed");

    let (status, body) = request(&state, Method::GET, "/health", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
#[ignore]
async fn user_crud_roundtrips_through_the_full_pipeline() {
    let (_, handle) = PrometheusBuilder::new().build_recorder();
    let state = AppState::build(test_config(), handle).await.expect("build failed");

    let (status, created) = request(
        &state,
        Method::POST,
        "/users",
        json!({ "name": "Grace", "email": "grace@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("created user has an id");

    let (status, fetched) = request(&state, Method::GET, &format!("/users/{id}"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["email"], json!("grace@example.com"));

    let (status, by_email) = request(&state, Method::GET, "/users/email/grace@example.com", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_email["id"], json!(id));

    let (status, _) = request(
        &state,
        Method::PUT,
        &format!("/users/{id}"),
        json!({ "name": "Grace Hopper", "email": "grace@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&state, Method::DELETE, &format!("/users/{id}"), Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&state, Method::GET, &format!("/users/{id}"), Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn async_create_enqueues_without_blocking_the_request() {
    let (_, handle) = PrometheusBuilder::new().build_recorder();
    let state = AppState::build(test_config(), handle).await.expect("build failed");

    let (status, body) = request(
        &state,
        Method::POST,
        "/async-users",
        json!({ "name": "Ada", "email": "ada@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["jobId"].as_str().is_some());
}

#[tokio::test]
#[ignore]
async fn unknown_route_produces_a_404_error_body() {
    let (_, handle) = PrometheusBuilder::new().build_recorder();
    let state = AppState::build(test_config(), handle).await.expect("build failed");

    let (status, body) = request(&state, Method::GET, "/does-not-exist", Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
}
