//! Errors raised while accepting, computing and serving route jobs.
//!
//! Every failure is a [`WaypointError`] tagged with an [`ErrorCode`]. The code
//! picks the HTTP status, the log level and the `waypoint_errors_total` labels.
//! Clients only ever see the user message; provider and database detail stays
//! in the internal message. A failed job stores [`WaypointError::job_message`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WaypointError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable error identifiers, serialized as `SCREAMING_SNAKE_CASE` in error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Job lifecycle (1xxx)
    InvalidStateTransition,
    ServiceOverloaded,

    // Job store (20xx)
    DatabaseError,
    DatabaseConnectionFailed,
    DatabaseQueryFailed,
    RecordNotFound,
    DuplicateRecord,

    // Stored or wire JSON (22xx)
    SerializationError,
    DeserializationError,

    // Distance provider (3xxx)
    ProviderError,
    ProviderTimeout,
    NetworkError,

    // Submitted route (41xx)
    ValidationError,

    // Startup (5xxx)
    ConfigurationError,

    // Everything else (9xxx)
    InternalError,
}

impl ErrorCode {
    /// Numeric form, reported alongside the string code.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::InvalidStateTransition => 1004,
            Self::ServiceOverloaded => 1010,

            Self::DatabaseError => 2000,
            Self::DatabaseConnectionFailed => 2001,
            Self::DatabaseQueryFailed => 2002,
            Self::RecordNotFound => 2004,
            Self::DuplicateRecord => 2005,

            Self::SerializationError => 2200,
            Self::DeserializationError => 2201,

            Self::ProviderError => 3000,
            Self::ProviderTimeout => 3002,
            Self::NetworkError => 3005,

            Self::ValidationError => 4100,

            Self::ConfigurationError => 5000,

            Self::InternalError => 9000,
        }
    }

    /// Status used when the error reaches an HTTP handler.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::RecordNotFound => StatusCode::NOT_FOUND,

            Self::DuplicateRecord | Self::InvalidStateTransition => StatusCode::CONFLICT,

            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,

            Self::ServiceOverloaded
            | Self::DatabaseConnectionFailed
            | Self::DatabaseError
            | Self::DatabaseQueryFailed => StatusCode::SERVICE_UNAVAILABLE,

            Self::ProviderError | Self::NetworkError => StatusCode::BAD_GATEWAY,
            Self::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,

            Self::SerializationError
            | Self::DeserializationError
            | Self::ConfigurationError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category used as a metrics label.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidStateTransition | Self::ServiceOverloaded => "job",
            Self::DatabaseError
            | Self::DatabaseConnectionFailed
            | Self::DatabaseQueryFailed
            | Self::RecordNotFound
            | Self::DuplicateRecord => "storage",
            Self::SerializationError | Self::DeserializationError => "serialization",
            Self::ProviderError | Self::ProviderTimeout | Self::NetworkError => "provider",
            Self::ValidationError => "validation",
            Self::ConfigurationError => "configuration",
            Self::InternalError => "internal",
        }
    }

    /// The wire representation, e.g. `VALIDATION_ERROR`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            Self::ServiceOverloaded => "SERVICE_OVERLOADED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::DatabaseConnectionFailed => "DATABASE_CONNECTION_FAILED",
            Self::DatabaseQueryFailed => "DATABASE_QUERY_FAILED",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::DuplicateRecord => "DUPLICATE_RECORD",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::DeserializationError => "DESERIALIZATION_ERROR",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::ProviderTimeout => "PROVIDER_TIMEOUT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// How loudly an error is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Bad routes, unknown tokens, repeated completions
    Low,
    /// Overload and slow providers
    Medium,
    /// Store queries and provider answers that went wrong
    High,
    /// Store unreachable or a broken invariant
    Critical,
}

impl ErrorSeverity {
    /// Severity implied by a code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::ValidationError
            | ErrorCode::RecordNotFound
            | ErrorCode::DuplicateRecord
            | ErrorCode::InvalidStateTransition => Self::Low,

            ErrorCode::ServiceOverloaded | ErrorCode::ProviderTimeout => Self::Medium,

            ErrorCode::DatabaseError
            | ErrorCode::DatabaseQueryFailed
            | ErrorCode::SerializationError
            | ErrorCode::DeserializationError
            | ErrorCode::ProviderError
            | ErrorCode::NetworkError
            | ErrorCode::ConfigurationError => Self::High,

            ErrorCode::DatabaseConnectionFailed | ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured context attached to an error body, such as the job token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Free-form key/value context
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Identifier of the record involved, usually a job token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Kind of record involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.context.is_empty() && self.entity_id.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// Error carried through intake, workers, stores and handlers.
#[derive(Error, Debug)]
pub struct WaypointError {
    code: ErrorCode,

    /// Returned to clients
    user_message: Cow<'static, str>,

    /// Logged, and kept as the job error for provider failures
    internal_message: Option<String>,

    details: ErrorDetails,

    /// Underlying library error, if any
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for WaypointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl WaypointError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Build an error and count it in `waypoint_errors_total`.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Like [`WaypointError::new`], with detail that is logged but not returned.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// An invariant broke; clients get a generic message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An internal error occurred",
            message,
        )
    }

    /// No record of `entity_type` exists for `entity_id`.
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} not found", entity_type),
        )
        .with_details(ErrorDetails::new().with_entity(entity_type, entity_id))
    }

    /// The submitted route was rejected.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create a distance provider error.
    ///
    /// The message is the provider's own text and becomes the job's error message.
    pub fn provider(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(ErrorCode::ProviderError, message)
    }

    /// Create a decode error for stored data that can no longer be read.
    pub fn decode(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(ErrorCode::DeserializationError, message)
    }

    /// Settings could not be loaded or are inconsistent.
    pub fn configuration(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(ErrorCode::ConfigurationError, message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach the underlying error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Replace the structured details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add one key/value pair to the details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.details = self.details.with_context(key, value);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    /// Whether this is a "record not found" error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Text recorded on a failed job: the internal detail when present,
    /// otherwise the user message.
    pub fn job_message(&self) -> String {
        match self.code {
            ErrorCode::ProviderError | ErrorCode::ProviderTimeout | ErrorCode::NetworkError => {
                match &self.internal_message {
                    Some(internal) => internal.clone(),
                    None => self.user_message.to_string(),
                }
            }
            _ => self.user_message.to_string(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Emit one event at the level implied by the severity. Critical errors
    /// also carry details and source.
    pub fn log(&self) {
        let code = self.code.as_str();
        let category = self.code.category();
        let status = self.http_status().as_u16();
        let message = self.user_message.as_ref();
        let internal = self.internal_message.as_deref().unwrap_or("");

        match self.severity() {
            ErrorSeverity::Critical => error!(
                code,
                category,
                status,
                internal,
                details = ?self.details,
                source = ?self.source,
                "{}",
                message
            ),
            ErrorSeverity::High => error!(code, category, status, internal, "{}", message),
            ErrorSeverity::Medium => warn!(code, category, status, "{}", message),
            ErrorSeverity::Low => debug!(code, category, status, "{}", message),
        }
    }

    fn record_metrics(&self) {
        counter!(
            "waypoint_errors_total",
            "code" => self.code.as_str(),
            "category" => self.code.category(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Body returned with non-2xx statuses: `{"success": false, "error": {...}}`.
///
/// Polling an unknown token is not an error at this level; it is answered
/// with a failure [`crate::jobs::Job`] view instead.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&WaypointError> for ErrorResponse {
    fn from(error: &WaypointError) -> Self {
        let details = (!error.details.is_empty()).then(|| error.details.clone());
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                details,
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for WaypointError {
    fn into_response(self) -> Response {
        self.log();
        (self.http_status(), Json(ErrorResponse::from(&self))).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Library Error Conversions
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for WaypointError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => (ErrorCode::RecordNotFound, "Job not found"),
            // Only the jobs primary key can collide: a token was reused.
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                (ErrorCode::DuplicateRecord, "Job token already exists")
            }
            sqlx::Error::Database(_) => (ErrorCode::DatabaseQueryFailed, "Job store query failed"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                (ErrorCode::DatabaseConnectionFailed, "Job store unavailable")
            }
            _ => (ErrorCode::DatabaseError, "Job store error"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<sqlx::migrate::MigrateError> for WaypointError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::with_internal(
            ErrorCode::DatabaseError,
            "Job store migration failed",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<serde_json::Error> for WaypointError {
    fn from(error: serde_json::Error) -> Self {
        let code = if error.is_syntax() || error.is_data() || error.is_eof() {
            ErrorCode::DeserializationError
        } else {
            ErrorCode::SerializationError
        };

        Self::with_internal(code, "Malformed JSON", error.to_string())
            .with_source(error)
    }
}

impl From<reqwest::Error> for WaypointError {
    fn from(error: reqwest::Error) -> Self {
        let (code, user_msg) = if error.is_timeout() {
            (
                ErrorCode::ProviderTimeout,
                "Distance service request timed out",
            )
        } else if error.is_connect() {
            (
                ErrorCode::NetworkError,
                "Failed to connect to distance service",
            )
        } else if error.is_decode() {
            (
                ErrorCode::ProviderError,
                "Distance service returned an unreadable response",
            )
        } else {
            (ErrorCode::ProviderError, "Distance service request failed")
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<config::ConfigError> for WaypointError {
    fn from(error: config::ConfigError) -> Self {
        let detail = error.to_string();
        Self::with_internal(ErrorCode::ConfigurationError, "Settings could not be loaded", detail)
            .with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::RecordNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ValidationError.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::ServiceOverloaded.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_carries_entity() {
        let error = WaypointError::not_found("Job", "abc-123");
        assert!(error.is_not_found());
        assert_eq!(error.details().entity_type.as_deref(), Some("Job"));
        assert_eq!(error.details().entity_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_provider_job_message_prefers_internal_detail() {
        let error = WaypointError::with_internal(
            ErrorCode::ProviderError,
            "Distance service request failed",
            "REQUEST_DENIED: The provided API key is invalid.",
        );
        assert_eq!(
            error.job_message(),
            "REQUEST_DENIED: The provided API key is invalid."
        );

        let error = WaypointError::provider("ZERO_RESULTS");
        assert_eq!(error.job_message(), "ZERO_RESULTS");
    }

    #[test]
    fn test_error_response_serialization() {
        let error = WaypointError::validation("Route start & dropoff required");
        let response = ErrorResponse::from(&error);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("VALIDATION_ERROR"));
        assert!(json.contains("4100"));
        assert!(json.contains("Route start & dropoff required"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_error_severity() {
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::ValidationError),
            ErrorSeverity::Low
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::ServiceOverloaded),
            ErrorSeverity::Medium
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::ProviderError),
            ErrorSeverity::High
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::DatabaseConnectionFailed),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn test_error_display() {
        let error = WaypointError::with_internal(
            ErrorCode::DatabaseError,
            "A storage error occurred",
            "Connection refused: localhost:5432",
        );

        let display = format!("{}", error);
        assert!(display.contains("DatabaseError"));
        assert!(display.contains("A storage error occurred"));
        assert!(display.contains("Connection refused"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<Vec<String>>("[1,").unwrap_err();
        let error = WaypointError::from(err);
        assert_eq!(error.code(), ErrorCode::DeserializationError);
    }
}
