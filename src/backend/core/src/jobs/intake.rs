//! Route submission: validate, persist a pending job, hand it to the pool.

use std::sync::Arc;

use tracing::info;

use super::{Job, JobPool, RouteWorker, Token};
use crate::error::Result;
use crate::route::RoutePath;
use crate::store::JobStore;
use crate::telemetry::JobMetrics;

/// Accepts routes and starts their background computation.
#[derive(Clone)]
pub struct RouteIntake {
    store: Arc<dyn JobStore>,
    pool: Arc<JobPool>,
    worker: RouteWorker,
}

impl RouteIntake {
    pub fn new(store: Arc<dyn JobStore>, pool: Arc<JobPool>, worker: RouteWorker) -> Self {
        Self {
            store,
            pool,
            worker,
        }
    }

    /// Validate a raw route and submit it.
    pub async fn submit(&self, raw: Vec<Vec<String>>) -> Result<Token> {
        let path = RoutePath::try_from(raw)
            .inspect_err(|_| JobMetrics::record_rejected("validation"))?;
        self.submit_path(path).await
    }

    /// Submit an already validated route.
    ///
    /// The token is returned as soon as the pending job is stored; the worker
    /// runs detached. If admission or the insert fails no job exists and no
    /// worker is started.
    pub async fn submit_path(&self, path: RoutePath) -> Result<Token> {
        let ticket = self
            .pool
            .try_admit()
            .inspect_err(|_| JobMetrics::record_rejected("overloaded"))?;

        let token = Token::new();
        let job = Job::pending(token, &path)?;

        // On failure the ticket is dropped here, releasing the slot
        self.store
            .insert(job)
            .await
            .inspect_err(|_| JobMetrics::record_rejected("storage"))?;

        JobMetrics::record_submitted();
        info!(token = %token, waypoints = path.len(), "Route accepted");

        let worker = self.worker.clone();
        self.pool
            .spawn(ticket, move || async move { worker.run(token, path).await });

        Ok(token)
    }
}
