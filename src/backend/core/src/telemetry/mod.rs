//! Telemetry: structured logging and Prometheus metrics.
//!
//! - **Logging**: JSON/pretty/compact output through `tracing-subscriber`,
//!   with provider credentials scrubbed from error text
//! - **Metrics**: Prometheus recorder for submissions, outcomes and errors

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig, RedactionConfig, SensitiveFieldRedactor};
pub use metrics::{init_metrics, JobMetrics, MetricsConfig, MetricsRegistry};
