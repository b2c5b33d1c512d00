//! Prometheus metrics for route submissions and job outcomes.
//!
//! Metrics are recorded through the `metrics` facade everywhere in the crate;
//! this module installs the Prometheus recorder and owns the handle that the
//! `/metrics` endpoint renders.
//!
//! # Example
//!
//! ```rust,no_run
//! use waypoint_core::telemetry::metrics::JobMetrics;
//!
//! JobMetrics::record_submitted();
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Histogram buckets for job durations (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Global labels to add to all metrics
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            duration_buckets: default_duration_buckets(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_duration_buckets() -> Vec<f64> {
    vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
}

/// Holds the Prometheus handle when metrics are enabled.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// A registry with no recorder; renders an empty body.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether a recorder is installed.
    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Initialize the metrics subsystem.
///
/// Installs the global Prometheus recorder, so it must be called at most once
/// per process.
pub fn init_metrics(config: &MetricsConfig, service_name: &str) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        tracing::info!(service_name = %service_name, "Metrics disabled");
        return Ok(MetricsRegistry::disabled());
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }
    builder = builder.set_buckets(&config.duration_buckets)?;

    let handle = builder.install_recorder()?;
    register_metric_descriptions();

    tracing::info!(service_name = %service_name, "Metrics initialized");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

fn register_metric_descriptions() {
    describe_counter!(
        "waypoint_routes_submitted_total",
        "Routes accepted by intake"
    );
    describe_counter!(
        "waypoint_routes_rejected_total",
        "Routes rejected at intake, by reason"
    );
    describe_counter!(
        "waypoint_jobs_completed_total",
        "Jobs that reached a terminal state, by outcome"
    );
    describe_counter!("waypoint_errors_total", "Errors by code and category");
    describe_histogram!(
        "waypoint_job_duration_seconds",
        "Time from worker start to terminal update"
    );
}

/// Job lifecycle metrics.
pub struct JobMetrics;

impl JobMetrics {
    /// A route passed validation and its job was created.
    pub fn record_submitted() {
        counter!("waypoint_routes_submitted_total").increment(1);
    }

    /// A route was refused at intake.
    pub fn record_rejected(reason: &'static str) {
        counter!("waypoint_routes_rejected_total", "reason" => reason).increment(1);
    }

    /// A worker finished with the given outcome (`success` or `failure`).
    pub fn record_completed(outcome: &'static str, duration: Duration) {
        counter!("waypoint_jobs_completed_total", "outcome" => outcome).increment(1);
        histogram!("waypoint_job_duration_seconds", "outcome" => outcome)
            .record(duration.as_secs_f64());
    }
}
