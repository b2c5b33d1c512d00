//! Distance Matrix client tests against a mock HTTP server.
//!
//! Tests cover:
//! - Request shape (origins, destinations, key, language)
//! - Reading legs from the matrix diagonal
//! - Per-element failures
//! - HTTP, top-level status and body errors
//! - Connection failures

use std::time::Duration;

use serde_json::json;
use waypoint_core::config::DistanceConfig;
use waypoint_core::distance::{DistanceService, ElementStatus, GoogleDistanceMatrixClient, Leg};
use waypoint_core::error::ErrorCode;
use waypoint_core::route::{RoutePath, RoutePoint, WaypointPair};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MATRIX_PATH: &str = "/maps/api/distancematrix/json";

fn client(base_url: &str) -> GoogleDistanceMatrixClient {
    GoogleDistanceMatrixClient::new(&DistanceConfig {
        api_key: Some("test-key".to_string()),
        base_url: base_url.to_string(),
        language: "en".to_string(),
        request_timeout: Duration::from_secs(2),
    })
    .unwrap()
}

fn three_point_pairs() -> Vec<WaypointPair> {
    RoutePath::new(vec![
        RoutePoint::new("1", "1"),
        RoutePoint::new("2", "2"),
        RoutePoint::new("3", "3"),
    ])
    .unwrap()
    .pairs()
}

fn element(distance: u64, duration: u64) -> serde_json::Value {
    json!({
        "status": "OK",
        "distance": {"text": "x", "value": distance},
        "duration": {"text": "y", "value": duration},
    })
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_legs_are_read_from_the_diagonal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MATRIX_PATH))
        .and(query_param("origins", "1,1|2,2"))
        .and(query_param("destinations", "2,2|3,3"))
        .and(query_param("key", "test-key"))
        .and(query_param("language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [
                {"elements": [element(1000, 60), element(9999, 999)]},
                {"elements": [element(8888, 888), element(2000, 120)]},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let legs = client(&server.uri())
        .distances(&three_point_pairs())
        .await
        .unwrap();

    assert_eq!(legs, vec![Leg::ok(1000, 60), Leg::ok(2000, 120)]);
}

#[tokio::test]
async fn test_element_failure_is_a_failed_leg() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MATRIX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [
                {"elements": [element(1000, 60), element(1, 1)]},
                {"elements": [element(1, 1), {"status": "ZERO_RESULTS"}]},
            ],
        })))
        .mount(&server)
        .await;

    let legs = client(&server.uri())
        .distances(&three_point_pairs())
        .await
        .unwrap();

    assert!(legs[0].status.is_ok());
    assert_eq!(legs[1].status, ElementStatus::ZeroResults);
}

#[tokio::test]
async fn test_empty_pairs_make_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let legs = client(&server.uri()).distances(&[]).await.unwrap();
    assert!(legs.is_empty());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_http_error_status_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MATRIX_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .distances(&three_point_pairs())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderError);
    assert!(err.job_message().contains("HTTP 500"));
}

#[tokio::test]
async fn test_top_level_status_is_reported_with_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MATRIX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "rows": [],
        })))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .distances(&three_point_pairs())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderError);
    assert_eq!(
        err.job_message(),
        "REQUEST_DENIED: The provided API key is invalid."
    );
}

#[tokio::test]
async fn test_missing_rows_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MATRIX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [{"elements": [element(1000, 60)]}],
        })))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .distances(&three_point_pairs())
        .await
        .unwrap_err();

    assert!(err.job_message().starts_with("malformed response"));
}

#[tokio::test]
async fn test_unreadable_body_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MATRIX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .distances(&three_point_pairs())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderError);
}

#[tokio::test]
async fn test_connection_refused_is_network_error_without_key() {
    let err = client("http://127.0.0.1:1")
        .distances(&three_point_pairs())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::NetworkError);
    assert!(!err.job_message().contains("test-key"));
}

#[test]
fn test_missing_api_key_is_configuration_error() {
    let err = GoogleDistanceMatrixClient::new(&DistanceConfig::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigurationError);
}
