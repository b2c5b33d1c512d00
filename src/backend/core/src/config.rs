//! Configuration management.
//!
//! Sources, lowest precedence first: an optional file (`--config`), then
//! `WAYPOINT__*` environment variables. `DATABASE_URL` and `GOOGLE_API_KEY`
//! are honoured when the namespaced settings are absent.

use crate::error::{Result, WaypointError};
use crate::telemetry::{LoggingConfig, MetricsConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "WAYPOINT";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Deployment environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration; the in-memory store is used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Distance provider configuration
    #[serde(default)]
    pub distance: DistanceConfig,

    /// Background job configuration
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            database: None,
            distance: DistanceConfig::default(),
            jobs: JobsConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long to wait for a pooled connection
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// A database config with default pool settings.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceConfig {
    /// Google Maps API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the Distance Matrix API
    #[serde(default = "default_distance_base_url")]
    pub base_url: String,

    /// Language requested for provider messages
    #[serde(default = "default_distance_language")]
    pub language: String,

    /// HTTP timeout for a single provider request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_distance_base_url(),
            language: default_distance_language(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Workers allowed to run at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Admitted jobs that have not finished yet; intake refuses beyond this
    #[serde(default = "default_max_outstanding")]
    pub max_outstanding: usize,

    /// Upper bound on one distance computation
    #[serde(default = "default_provider_timeout", with = "humantime_serde")]
    pub provider_timeout: Duration,

    /// How long shutdown waits for in-flight workers
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_outstanding: default_max_outstanding(),
            provider_timeout: default_provider_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

// Default value functions
fn default_environment() -> String { "production".to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_acquire_timeout() -> Duration { Duration::from_secs(5) }
fn default_distance_base_url() -> String { "https://maps.googleapis.com".to_string() }
fn default_distance_language() -> String { "en".to_string() }
fn default_request_timeout() -> Duration { Duration::from_secs(8) }
fn default_max_concurrent() -> usize { 64 }
fn default_max_outstanding() -> usize { 10_000 }
fn default_provider_timeout() -> Duration { Duration::from_secs(10) }
fn default_shutdown_timeout() -> Duration { Duration::from_secs(30) }

impl Config {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self> {
        Self::build(None)
    }

    /// Load from a specific file path, with environment variables on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.apply_fallbacks(|name| std::env::var(name).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fill unset settings from the unprefixed variables older deployments use.
    pub fn apply_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.database.is_none() {
            if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
                self.database = Some(DatabaseConfig::with_url(url));
            }
        }

        if self.distance.api_key.is_none() {
            self.distance.api_key = lookup("GOOGLE_API_KEY").filter(|k| !k.is_empty());
        }
    }

    /// Reject settings the job pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.max_concurrent == 0 {
            return Err(WaypointError::configuration(
                "jobs.max_concurrent must be greater than zero",
            ));
        }
        if self.jobs.max_outstanding == 0 {
            return Err(WaypointError::configuration(
                "jobs.max_outstanding must be greater than zero",
            ));
        }
        if self.jobs.provider_timeout.is_zero() {
            return Err(WaypointError::configuration(
                "jobs.provider_timeout must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Socket address string the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
