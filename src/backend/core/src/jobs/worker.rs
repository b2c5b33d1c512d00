//! Background worker that computes one route's totals.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::{JobOutcome, Token};
use crate::distance::{DistanceService, Leg};
use crate::error::Result;
use crate::route::RoutePath;
use crate::store::JobStore;
use crate::telemetry::{JobMetrics, SensitiveFieldRedactor};

/// Computes distance and time for a route and records the result.
///
/// Cheap to clone; one clone is moved into each spawned job.
#[derive(Clone)]
pub struct RouteWorker {
    store: Arc<dyn JobStore>,
    distance: Arc<dyn DistanceService>,
    provider_timeout: Duration,
}

impl RouteWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        distance: Arc<dyn DistanceService>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            store,
            distance,
            provider_timeout,
        }
    }

    /// Run the job to completion and write its terminal outcome exactly once.
    ///
    /// Returns the stored outcome, or `Err` when it could not be stored.
    /// Nothing is retried.
    pub async fn run(&self, token: Token, path: RoutePath) -> Result<JobOutcome> {
        let started = Instant::now();
        info!(
            token = %token,
            legs = path.len() - 1,
            provider = self.distance.provider_name(),
            "Route job started"
        );

        let outcome = self.compute(&path).await;
        let elapsed = started.elapsed();

        match &outcome {
            JobOutcome::Success {
                total_distance,
                total_time,
            } => info!(
                token = %token,
                total_distance = total_distance,
                total_time = total_time,
                elapsed_ms = elapsed.as_millis() as u64,
                "Route job succeeded"
            ),
            JobOutcome::Failure { error } => warn!(
                token = %token,
                error = %error,
                elapsed_ms = elapsed.as_millis() as u64,
                "Route job failed"
            ),
        }
        JobMetrics::record_completed(outcome.label(), elapsed);

        if let Err(e) = self.store.update(token, &outcome).await {
            error!(token = %token, error = %e, "Failed to record route job outcome");
            return Err(e);
        }

        Ok(outcome)
    }

    /// Ask the provider for every leg and fold the answer into an outcome.
    pub async fn compute(&self, path: &RoutePath) -> JobOutcome {
        let pairs = path.pairs();

        match tokio::time::timeout(self.provider_timeout, self.distance.distances(&pairs)).await {
            Err(_) => JobOutcome::failure(format!(
                "distance provider timed out after {:?}",
                self.provider_timeout
            )),
            Ok(Err(e)) => JobOutcome::failure(SensitiveFieldRedactor::global().redact(&e.job_message())),
            Ok(Ok(legs)) => aggregate(&legs, pairs.len()),
        }
    }
}

/// Sum the legs of a route.
///
/// The first leg whose status is not OK decides the failure; later legs and
/// partial sums are ignored. A provider may stop at that leg, so the count is
/// only checked when every leg is OK. A count that differs from `expected`
/// is then a malformed response.
pub fn aggregate(legs: &[Leg], expected: usize) -> JobOutcome {
    if let Some(failed) = legs.iter().find(|leg| !leg.status.is_ok()) {
        return JobOutcome::failure(failed.status.to_string());
    }

    if legs.len() != expected {
        return JobOutcome::failure(format!(
            "malformed response: expected {} legs, got {}",
            expected,
            legs.len()
        ));
    }

    let (total_distance, total_time) = legs.iter().fold((0u64, 0u64), |(d, t), leg| {
        (
            d.saturating_add(leg.distance_meters),
            t.saturating_add(leg.duration_seconds),
        )
    });

    JobOutcome::Success {
        total_distance,
        total_time,
    }
}
