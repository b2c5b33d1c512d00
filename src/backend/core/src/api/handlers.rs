//! API request handlers with proper error propagation.
//!
//! Handlers return `Result<_, WaypointError>` so failures become the JSON
//! error envelope through `IntoResponse`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{ErrorCode, WaypointError};
use crate::jobs::{RouteStatus, Token};
use crate::telemetry::JobMetrics;

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_status = match state.store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            e.log();
            format!("unreachable: {}", e.user_message())
        }
    };
    let healthy = store_status == "ok";

    let body = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "store": {
            "backend": state.store.backend_name(),
            "status": store_status,
        },
        "pool": state.pool.stats(),
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Route Handlers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: Token,
}

pub async fn submit_route(
    State(state): State<AppState>,
    body: Result<Json<Vec<Vec<String>>>, JsonRejection>,
) -> Result<impl IntoResponse, WaypointError> {
    let Json(raw) = body.map_err(|rejection| {
        JobMetrics::record_rejected("validation");
        WaypointError::new(ErrorCode::ValidationError, rejection.body_text())
    })?;

    let token = state.intake.submit(raw).await?;
    Ok(Json(TokenResponse { token }))
}

pub async fn route_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<RouteStatus>, WaypointError> {
    Ok(Json(state.reporter.report(&token).await?))
}

pub async fn empty_token() -> Json<RouteStatus> {
    Json(RouteStatus::invalid_token())
}
