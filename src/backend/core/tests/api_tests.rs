//! HTTP surface tests driven through the router with `oneshot`.
//!
//! Tests cover:
//! - Route submission and polling to completion
//! - Validation and malformed body errors
//! - Invalid, empty and unknown tokens
//! - Health and metrics endpoints
//! - Overload responses

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::*;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower::ServiceExt;
use waypoint_core::api::build_router;
use waypoint_core::config::JobsConfig;
use waypoint_core::distance::Leg;
use waypoint_core::store::InMemoryJobStore;

fn router(script: Script) -> Router {
    build_router(app_state(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(ScriptedDistance::new(script)),
        &jobs_config(),
    ))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn post_route(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/route")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Submit and Poll
// ============================================================================

#[tokio::test]
async fn test_submit_then_poll_until_success() {
    let app = router(Script::Legs(vec![Leg::ok(1000, 60), Leg::ok(2000, 120)]));

    let route = json!([["1", "1"], ["2", "2"], ["3", "3"]]);
    let (status, body) = send(&app, post_route(route.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&token).is_ok());

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    let final_body = loop {
        let (status, body) = send(&app, get(&format!("/route/{}", token))).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] != "in progress" {
            break body;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    };

    assert_eq!(
        final_body,
        json!({
            "status": "success",
            "path": [["1", "1"], ["2", "2"], ["3", "3"]],
            "total_distance": 3000,
            "total_time": 180,
        })
    );
}

#[tokio::test]
async fn test_failed_route_reports_error_text() {
    let app = router(Script::Legs(vec![Leg::ok(1000, 60), leg_failed("ZERO_RESULTS")]));

    let (_, body) = send(
        &app,
        post_route(json!([["1", "1"], ["2", "2"], ["3", "3"]]).to_string()),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let (_, body) = send(&app, get(&format!("/route/{}", token))).await;
        if body["status"] == "failure" {
            assert_eq!(body, json!({"status": "failure", "error": "ZERO_RESULTS"}));
            break;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}

// ============================================================================
// Validation Errors
// ============================================================================

#[tokio::test]
async fn test_single_point_is_unprocessable() {
    let app = router(Script::Legs(vec![]));

    let (status, body) = send(&app, post_route(json!([["1", "1"]]).to_string())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Route start & dropoff required");
}

#[tokio::test]
async fn test_too_many_points_is_unprocessable() {
    let app = router(Script::Legs(vec![]));
    let points: Vec<[String; 2]> = (0..26).map(|i| [i.to_string(), i.to_string()]).collect();

    let (status, body) = send(&app, post_route(json!(points).to_string())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Max dropoff location is 25"));
}

#[tokio::test]
async fn test_malformed_json_is_unprocessable() {
    let app = router(Script::Legs(vec![]));

    for payload in ["[[\"1\",\"1\"],", "{\"route\": 1}", "[[1, 2], [3, 4]]"] {
        let (status, body) = send(&app, post_route(payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "payload {}", payload);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

// ============================================================================
// Tokens
// ============================================================================

#[tokio::test]
async fn test_empty_and_unknown_tokens_are_invalid() {
    let app = router(Script::Legs(vec![]));
    let expected = json!({"status": "failure", "error": "Invalid Token"});

    let unknown = format!("/route/{}", uuid::Uuid::new_v4());
    for uri in ["/route/", "/route/garbage", unknown.as_str()] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK, "uri {}", uri);
        assert_eq!(body, expected, "uri {}", uri);
    }
}

// ============================================================================
// Health and Metrics
// ============================================================================

#[tokio::test]
async fn test_health_reports_store_and_pool() {
    let app = router(Script::Legs(vec![]));

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["status"], "ok");
    assert_eq!(body["pool"]["max_concurrent"], 8);
}

#[tokio::test]
async fn test_metrics_endpoint_responds() {
    let app = router(Script::Legs(vec![]));

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Overload
// ============================================================================

#[tokio::test]
async fn test_overload_returns_service_unavailable() {
    let gate = Arc::new(Semaphore::new(0));
    let jobs = JobsConfig {
        max_outstanding: 1,
        ..jobs_config()
    };
    let app = build_router(app_state(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(ScriptedDistance::gated(Script::Legs(vec![]), gate.clone())),
        &jobs,
    ));
    let route = json!([["1", "1"], ["2", "2"]]).to_string();

    let (first, _) = send(&app, post_route(route.clone())).await;
    let (second, body) = send(&app, post_route(route)).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_OVERLOADED");

    gate.add_permits(1);
}
