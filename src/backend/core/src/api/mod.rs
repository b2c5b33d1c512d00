//! HTTP API for Waypoint.
//!
//! | Method | Path              | Purpose                              |
//! |--------|-------------------|--------------------------------------|
//! | POST   | `/route`          | Submit a route, get a token          |
//! | GET    | `/route/:token`   | Poll a token                         |
//! | GET    | `/route/`         | Poll with an empty token             |
//! | GET    | `/health`         | Liveness, store reachability, pool   |
//! | GET    | `/metrics`        | Prometheus text format               |

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::JobsConfig;
use crate::distance::DistanceService;
use crate::jobs::{JobPool, JobPoolConfig, RouteIntake, RouteWorker, StatusReporter};
use crate::store::JobStore;
use crate::telemetry::MetricsRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub intake: RouteIntake,
    pub reporter: StatusReporter,
    pub store: Arc<dyn JobStore>,
    pub pool: Arc<JobPool>,
    pub metrics: MetricsRegistry,
}

impl AppState {
    /// Wire intake, workers and reporter around one store and one provider.
    pub fn new(
        store: Arc<dyn JobStore>,
        distance: Arc<dyn DistanceService>,
        jobs: &JobsConfig,
        metrics: MetricsRegistry,
    ) -> Self {
        let pool = Arc::new(JobPool::new(JobPoolConfig::from(jobs)));
        let worker = RouteWorker::new(store.clone(), distance, jobs.provider_timeout);

        Self {
            intake: RouteIntake::new(store.clone(), pool.clone(), worker),
            reporter: StatusReporter::new(store.clone()),
            store,
            pool,
            metrics,
        }
    }
}

/// Build the API router.
///
/// # Example
///
/// ```rust,ignore
/// let state = AppState::new(store, distance, &config.jobs, metrics);
/// let app = build_router(state);
/// ```
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/route", post(handlers::submit_route))
        .route("/route/", get(handlers::empty_token))
        .route("/route/:token", get(handlers::route_status))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
