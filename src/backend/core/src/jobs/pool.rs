//! Job Pool - runs route workers under a concurrency ceiling.
//!
//! The `JobPool` provides:
//! - A cap on simultaneously executing workers (tokio Semaphore)
//! - Admission control: a ceiling on admitted-but-unfinished jobs
//! - Task tracking so shutdown can wait for in-flight workers
//! - Pool statistics for the health endpoint

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::task::TaskTracker;

use super::JobOutcome;
use crate::config::JobsConfig;
use crate::error::{ErrorCode, Result, WaypointError};

/// Configuration for the job pool.
#[derive(Debug, Clone)]
pub struct JobPoolConfig {
    /// Maximum number of concurrently executing workers
    pub max_concurrent: usize,
    /// Maximum number of admitted jobs that have not finished
    pub max_outstanding: usize,
    /// Name for this pool (for logging)
    pub name: String,
}

impl Default for JobPoolConfig {
    fn default() -> Self {
        Self::from(&JobsConfig::default())
    }
}

impl From<&JobsConfig> for JobPoolConfig {
    fn from(config: &JobsConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent,
            max_outstanding: config.max_outstanding,
            name: "route-workers".to_string(),
        }
    }
}

/// A reserved slot for one job. Dropping it unused gives the slot back.
pub struct AdmissionTicket {
    _slot: OwnedSemaphorePermit,
}

impl std::fmt::Debug for AdmissionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionTicket").finish_non_exhaustive()
    }
}

/// A running worker's hold on a concurrency slot.
struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
    pool_stats: Arc<PoolStats>,
    started_at: Instant,
    finished: bool,
}

impl WorkerPermit {
    fn mark_success(mut self) {
        self.finished = true;
        self.pool_stats.record_success(self.started_at.elapsed());
    }

    fn mark_failure(mut self) {
        self.finished = true;
        self.pool_stats.record_failure(self.started_at.elapsed());
    }
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        // Reached only when the worker panicked
        if !self.finished {
            self.pool_stats.record_unknown();
        }
    }
}

/// Internal statistics tracking.
struct PoolStats {
    jobs_admitted: AtomicU64,
    jobs_rejected: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_unknown: AtomicU64,
    total_wait_time_us: AtomicU64,
    total_exec_time_us: AtomicU64,
    peak_concurrent: AtomicUsize,
    current_concurrent: AtomicUsize,
}

impl PoolStats {
    fn new() -> Self {
        Self {
            jobs_admitted: AtomicU64::new(0),
            jobs_rejected: AtomicU64::new(0),
            jobs_succeeded: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_unknown: AtomicU64::new(0),
            total_wait_time_us: AtomicU64::new(0),
            total_exec_time_us: AtomicU64::new(0),
            peak_concurrent: AtomicUsize::new(0),
            current_concurrent: AtomicUsize::new(0),
        }
    }

    fn record_acquire(&self, wait_time: Duration) {
        self.total_wait_time_us
            .fetch_add(wait_time.as_micros() as u64, Ordering::Relaxed);
        let current = self.current_concurrent.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_concurrent.fetch_max(current, Ordering::Relaxed);
    }

    fn record_release(&self, exec_time: Duration) {
        self.total_exec_time_us
            .fetch_add(exec_time.as_micros() as u64, Ordering::Relaxed);
        self.current_concurrent.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_success(&self, exec_time: Duration) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_release(exec_time);
    }

    fn record_failure(&self, exec_time: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.record_release(exec_time);
    }

    fn record_unknown(&self) {
        self.jobs_unknown.fetch_add(1, Ordering::Relaxed);
        self.current_concurrent.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Supervised scheduler for background route workers.
pub struct JobPool {
    config: JobPoolConfig,
    /// Concurrency control for executing workers
    semaphore: Arc<Semaphore>,
    /// One permit per job that may be admitted
    admission: Arc<Semaphore>,
    tracker: TaskTracker,
    stats: Arc<PoolStats>,
    created_at: Instant,
}

impl JobPool {
    /// Create a new job pool.
    pub fn new(config: JobPoolConfig) -> Self {
        tracing::info!(
            pool_name = %config.name,
            max_concurrent = config.max_concurrent,
            max_outstanding = config.max_outstanding,
            "Job pool created"
        );

        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            admission: Arc::new(Semaphore::new(config.max_outstanding)),
            tracker: TaskTracker::new(),
            stats: Arc::new(PoolStats::new()),
            created_at: Instant::now(),
            config,
        }
    }

    /// Create a job pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(JobPoolConfig::default())
    }

    /// Get the pool name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get current number of executing workers.
    pub fn active_workers(&self) -> usize {
        self.config.max_concurrent - self.semaphore.available_permits()
    }

    /// Admitted jobs that have not finished.
    pub fn outstanding(&self) -> usize {
        self.config.max_outstanding - self.admission.available_permits()
    }

    /// Whether shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Reserve a slot for a new job without waiting.
    ///
    /// Fails with `ServiceOverloaded` when the outstanding ceiling is reached
    /// or the pool is shutting down.
    pub fn try_admit(&self) -> Result<AdmissionTicket> {
        match self.admission.clone().try_acquire_owned() {
            Ok(slot) => Ok(AdmissionTicket { _slot: slot }),
            Err(TryAcquireError::NoPermits) => {
                self.stats.jobs_rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    pool_name = %self.config.name,
                    max_outstanding = self.config.max_outstanding,
                    "Job pool at capacity, rejecting submission"
                );
                Err(WaypointError::with_internal(
                    ErrorCode::ServiceOverloaded,
                    "Too many routes in progress, try again later",
                    format!(
                        "pool '{}' has {} outstanding jobs",
                        self.config.name, self.config.max_outstanding
                    ),
                ))
            }
            Err(TryAcquireError::Closed) => {
                self.stats.jobs_rejected.fetch_add(1, Ordering::Relaxed);
                Err(WaypointError::new(
                    ErrorCode::ServiceOverloaded,
                    "Service is shutting down",
                ))
            }
        }
    }

    /// Spawn a worker in the background (fire and forget).
    ///
    /// The worker runs once a concurrency slot is free. A stored success
    /// counts as a success; a stored failure or an `Err` counts as a failure.
    /// The admission slot is released when the worker finishes.
    pub fn spawn<F, Fut>(&self, ticket: AdmissionTicket, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<JobOutcome>> + Send + 'static,
    {
        self.stats.jobs_admitted.fetch_add(1, Ordering::Relaxed);

        let semaphore = self.semaphore.clone();
        let stats = self.stats.clone();
        let pool_name = self.config.name.clone();

        self.tracker.spawn(async move {
            let _ticket = ticket;
            let start = Instant::now();

            let permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    tracing::error!(pool_name = %pool_name, "Semaphore closed");
                    return;
                }
            };

            stats.record_acquire(start.elapsed());
            let permit = WorkerPermit {
                _permit: permit,
                pool_stats: stats,
                started_at: Instant::now(),
                finished: false,
            };

            match f().await {
                Ok(JobOutcome::Success { .. }) => permit.mark_success(),
                Ok(JobOutcome::Failure { .. }) | Err(_) => permit.mark_failure(),
            }
        });
    }

    /// Wait for every spawned worker to finish, then accept new ones again.
    pub async fn join_all(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop admitting jobs and wait up to `timeout` for in-flight workers.
    ///
    /// Returns `true` if every worker finished in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.admission.close();
        self.tracker.close();

        let in_flight = self.tracker.len();
        tracing::info!(
            pool_name = %self.config.name,
            in_flight = in_flight,
            timeout_secs = timeout.as_secs_f64(),
            "Draining job pool"
        );

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!(pool_name = %self.config.name, "Job pool drained");
                true
            }
            Err(_) => {
                tracing::warn!(
                    pool_name = %self.config.name,
                    remaining = self.tracker.len(),
                    "Job pool drain timed out; remaining jobs stay pending"
                );
                false
            }
        }
    }

    /// Get pool statistics.
    pub fn stats(&self) -> JobPoolStats {
        let stats = &self.stats;
        let jobs_succeeded = stats.jobs_succeeded.load(Ordering::Relaxed);
        let jobs_failed = stats.jobs_failed.load(Ordering::Relaxed);
        let jobs_admitted = stats.jobs_admitted.load(Ordering::Relaxed);
        let total_completed = jobs_succeeded + jobs_failed;

        let avg_wait_time_us = if jobs_admitted > 0 {
            stats.total_wait_time_us.load(Ordering::Relaxed) / jobs_admitted
        } else {
            0
        };

        let avg_exec_time_us = if total_completed > 0 {
            stats.total_exec_time_us.load(Ordering::Relaxed) / total_completed
        } else {
            0
        };

        JobPoolStats {
            name: self.config.name.clone(),
            max_concurrent: self.config.max_concurrent,
            max_outstanding: self.config.max_outstanding,
            active_workers: self.active_workers(),
            outstanding: self.outstanding(),
            jobs_admitted,
            jobs_rejected: stats.jobs_rejected.load(Ordering::Relaxed),
            jobs_succeeded,
            jobs_failed,
            jobs_unknown: stats.jobs_unknown.load(Ordering::Relaxed),
            peak_concurrent: stats.peak_concurrent.load(Ordering::Relaxed),
            avg_wait_time_us,
            avg_exec_time_us,
            uptime_secs: self.created_at.elapsed().as_secs(),
        }
    }
}

impl Default for JobPool {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Statistics for the job pool.
#[derive(Debug, Clone, Serialize)]
pub struct JobPoolStats {
    pub name: String,
    pub max_concurrent: usize,
    pub max_outstanding: usize,
    /// Workers currently holding a concurrency slot
    pub active_workers: usize,
    /// Admitted jobs not yet finished (running or waiting for a slot)
    pub outstanding: usize,
    pub jobs_admitted: u64,
    pub jobs_rejected: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    /// Workers that panicked
    pub jobs_unknown: u64,
    pub peak_concurrent: usize,
    /// Average wait for a concurrency slot (microseconds)
    pub avg_wait_time_us: u64,
    /// Average worker execution time (microseconds)
    pub avg_exec_time_us: u64,
    pub uptime_secs: u64,
}

impl JobPoolStats {
    /// Calculate success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.jobs_succeeded + self.jobs_failed;
        if total == 0 {
            100.0
        } else {
            (self.jobs_succeeded as f64 / total as f64) * 100.0
        }
    }
}
