//! Structured Logging with JSON/Pretty Formats and Credential Redaction.
//!
//! This module provides the logging setup for the server:
//!
//! - JSON format for production environments
//! - Pretty format for development
//! - Per-module log level configuration
//! - Redaction of provider credentials that leak into error text

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Global redactor instance.
static REDACTOR: OnceLock<SensitiveFieldRedactor> = OnceLock::new();

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty or compact)
    #[serde(default)]
    pub format: LogFormat,

    /// Per-module log levels
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// Whether to include file/line information
    #[serde(default = "default_include_location")]
    pub include_location: bool,

    /// Whether to include target (module path)
    #[serde(default = "default_include_target")]
    pub include_target: bool,

    /// Redaction configuration
    #[serde(default)]
    pub redaction: RedactionConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: HashMap::new(),
            include_location: default_include_location(),
            include_target: default_include_target(),
            redaction: RedactionConfig::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production/structured logging
    #[default]
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Configuration for credential redaction.
#[derive(Debug, Clone, Deserialize)]
pub struct RedactionConfig {
    /// Whether redaction is enabled
    #[serde(default = "default_redaction_enabled")]
    pub enabled: bool,

    /// Regex patterns whose matches are replaced
    #[serde(default = "default_redaction_patterns")]
    pub patterns: Vec<String>,

    /// Replacement text for redacted values
    #[serde(default = "default_redaction_replacement")]
    pub replacement: String,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: default_redaction_enabled(),
            patterns: default_redaction_patterns(),
            replacement: default_redaction_replacement(),
        }
    }
}

/// Scrubs credentials out of free-form text before it is logged or stored.
///
/// Provider transport errors render the full request URL, query string
/// included, so the API key would otherwise end up in logs and in the
/// `response_error` column.
#[derive(Debug, Clone)]
pub struct SensitiveFieldRedactor {
    patterns: Vec<regex::Regex>,
    replacement: String,
    enabled: bool,
}

impl SensitiveFieldRedactor {
    /// Create a new redactor from configuration. Invalid patterns are skipped.
    pub fn new(config: &RedactionConfig) -> Self {
        let patterns = config
            .patterns
            .iter()
            .filter_map(|pattern| match regex::Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Ignoring invalid redaction pattern");
                    None
                }
            })
            .collect();

        Self {
            patterns,
            replacement: config.replacement.clone(),
            enabled: config.enabled,
        }
    }

    /// Redact every pattern match in `value`.
    pub fn redact(&self, value: &str) -> String {
        if !self.enabled {
            return value.to_string();
        }

        let mut result = value.to_string();
        for regex in &self.patterns {
            result = regex
                .replace_all(&result, self.replacement.as_str())
                .into_owned();
        }
        result
    }

    /// Get the global redactor instance.
    pub fn global() -> &'static SensitiveFieldRedactor {
        REDACTOR.get_or_init(|| SensitiveFieldRedactor::new(&RedactionConfig::default()))
    }
}

// Default value functions
fn default_log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn default_include_location() -> bool {
    true
}

fn default_include_target() -> bool {
    true
}

fn default_redaction_enabled() -> bool {
    true
}

fn default_redaction_replacement() -> String {
    "key=[REDACTED]".to_string()
}

fn default_redaction_patterns() -> Vec<String> {
    vec![r"key=[^&\s)]+".to_string()]
}

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `config` - Logging configuration
/// * `environment` - Current environment (development/production)
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig, environment: &str) -> anyhow::Result<()> {
    let redactor_installed = install_redactor(&config.redaction);

    let mut filter = EnvFilter::try_new(&config.level)?;
    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(directive.parse()?);
    }

    // Development prefers pretty output unless a format was chosen explicitly
    let format = if environment == "development" && config.format == LogFormat::Json {
        &LogFormat::Pretty
    } else {
        &config.format
    };

    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    if !redactor_installed {
        tracing::warn!("Redactor was already in use; configured redaction patterns are ignored");
    }

    Ok(())
}

/// Install the global redactor from `config`.
///
/// Returns `false` if a redactor was already in place, for example because
/// `SensitiveFieldRedactor::global()` ran first with the defaults.
fn install_redactor(config: &RedactionConfig) -> bool {
    REDACTOR.set(SensitiveFieldRedactor::new(config)).is_ok()
}
