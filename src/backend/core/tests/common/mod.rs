//! Shared fixtures for integration tests: a scripted distance provider, a
//! store with injectable failures, and polling helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use waypoint_core::api::AppState;
use waypoint_core::config::JobsConfig;
use waypoint_core::distance::{DistanceService, ElementStatus, Leg};
use waypoint_core::error::{ErrorCode, Result, WaypointError};
use waypoint_core::jobs::{Job, JobOutcome, RouteStatus, StatusReporter, Token};
use waypoint_core::route::WaypointPair;
use waypoint_core::store::{InMemoryJobStore, JobStore};
use waypoint_core::telemetry::MetricsRegistry;

// ============================================================================
// Scripted Distance Service
// ============================================================================

/// What the scripted provider answers.
pub enum Script {
    /// The same legs for every request
    Legs(Vec<Leg>),
    /// A request-level provider error with this text
    Error(String),
    /// Legs computed from each pair
    PerPair(fn(&WaypointPair) -> Leg),
    /// Never answer
    Hang,
}

pub struct ScriptedDistance {
    script: Script,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<WaypointPair>>>,
}

impl ScriptedDistance {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            gate: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold every request until the gate receives a permit for it.
    pub fn gated(script: Script, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<WaypointPair>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DistanceService for ScriptedDistance {
    async fn distances(&self, pairs: &[WaypointPair]) -> Result<Vec<Leg>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(pairs.to_vec());

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        match &self.script {
            Script::Legs(legs) => Ok(legs.clone()),
            Script::Error(message) => Err(WaypointError::provider(message.clone())),
            Script::PerPair(f) => Ok(pairs.iter().map(f).collect()),
            Script::Hang => std::future::pending().await,
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Leg derived from the pair: distance is the sum of the integer parts of
/// both latitudes times 100, time is one tenth of that.
pub fn leg_from_latitudes(pair: &WaypointPair) -> Leg {
    let lat = |s: &str| s.split('.').next().unwrap_or("0").parse::<u64>().unwrap_or(0);
    let distance = (lat(&pair.origin.latitude) + lat(&pair.destination.latitude)) * 100;
    Leg::ok(distance, distance / 10)
}

pub fn leg_failed(code: &str) -> Leg {
    Leg::failed(ElementStatus::from(code))
}

// ============================================================================
// Failing Store
// ============================================================================

/// In-memory store whose operations can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryJobStore,
    pub fail_insert: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_get: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryJobStore {
        &self.inner
    }

    fn outage() -> WaypointError {
        WaypointError::with_internal(
            ErrorCode::DatabaseConnectionFailed,
            "Job store unavailable",
            "simulated outage",
        )
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn insert(&self, job: Job) -> Result<()> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.insert(job).await
    }

    async fn update(&self, token: Token, outcome: &JobOutcome) -> Result<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.update(token, outcome).await
    }

    async fn get(&self, token: Token) -> Result<Job> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.get(token).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

// ============================================================================
// Wiring Helpers
// ============================================================================

pub fn jobs_config() -> JobsConfig {
    JobsConfig {
        max_concurrent: 8,
        max_outstanding: 1_000,
        provider_timeout: Duration::from_secs(5),
        shutdown_timeout: Duration::from_secs(5),
    }
}

pub fn app_state(
    store: Arc<dyn JobStore>,
    distance: Arc<dyn DistanceService>,
    jobs: &JobsConfig,
) -> AppState {
    AppState::new(store, distance, jobs, MetricsRegistry::disabled())
}

pub fn raw_route(points: &[(&str, &str)]) -> Vec<Vec<String>> {
    points
        .iter()
        .map(|(lat, lng)| vec![lat.to_string(), lng.to_string()])
        .collect()
}

/// The three-point route used by the worked examples.
pub fn three_point_route() -> Vec<Vec<String>> {
    raw_route(&[("1", "1"), ("2", "2"), ("3", "3")])
}

/// Poll until the job reaches a terminal state.
pub async fn wait_terminal(reporter: &StatusReporter, token: Token) -> RouteStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = reporter.report(&token.to_string()).await.unwrap();
        if status.is_terminal() {
            return status;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} did not finish in time",
            token
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
