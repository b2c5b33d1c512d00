//! Job records and their state machine.
//!
//! - **Token**: the opaque identifier handed back at submission
//! - **JobStatus**: `Pending`, then exactly one of `Success` / `Failure`
//! - **JobOutcome**: the terminal result a worker writes
//! - **Job**: the persisted record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ErrorCode, Result, WaypointError};
use crate::route::RoutePath;

// ═══════════════════════════════════════════════════════════════════════════════
// Token
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of one route job (a random UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub Uuid);

impl Token {
    /// Create a new random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a caller-supplied token. Anything that is not a UUID is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for Token {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted; the worker has not written a result yet
    Pending,
    /// Every leg resolved; totals are set
    Success,
    /// The provider call or a leg failed; the error message is set
    Failure,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Column value in `travel_details.status`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            other => Err(WaypointError::decode(format!(
                "unknown job status '{}'",
                other
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Outcome
// ═══════════════════════════════════════════════════════════════════════════════

/// Terminal result written by a worker, exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Success {
        /// Meters
        total_distance: u64,
        /// Seconds
        total_time: u64,
    },
    Failure {
        error: String,
    },
}

impl JobOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// The status this outcome moves a job to.
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Success { .. } => JobStatus::Success,
            Self::Failure { .. } => JobStatus::Failure,
        }
    }

    /// Metrics label.
    pub fn label(&self) -> &'static str {
        self.status().as_str()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Record
// ═══════════════════════════════════════════════════════════════════════════════

/// A route job as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub token: Token,
    /// The submitted path as JSON text; decoded only when reported
    pub path: String,
    pub status: JobStatus,
    /// Meters; meaningful only on success
    pub total_distance: u64,
    /// Seconds; meaningful only on success
    pub total_time: u64,
    /// Set only on failure
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh pending job for a validated path.
    pub fn pending(token: Token, path: &RoutePath) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            token,
            path: path.encode()?,
            status: JobStatus::Pending,
            total_distance: 0,
            total_time: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move a pending job to its terminal state.
    ///
    /// Terminal jobs are left untouched and an `InvalidStateTransition` error
    /// is returned.
    pub fn complete(&mut self, outcome: &JobOutcome) -> Result<()> {
        if self.status.is_terminal() {
            return Err(WaypointError::with_internal(
                ErrorCode::InvalidStateTransition,
                "Job already completed",
                format!("job {} is {}", self.token, self.status),
            )
            .with_context("token", self.token.to_string()));
        }

        match outcome {
            JobOutcome::Success {
                total_distance,
                total_time,
            } => {
                self.total_distance = *total_distance;
                self.total_time = *total_time;
                self.error_message = None;
            }
            JobOutcome::Failure { error } => {
                self.total_distance = 0;
                self.total_time = 0;
                self.error_message = Some(error.clone());
            }
        }
        self.status = outcome.status();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Decode the stored path. Fails only if the stored text is corrupt.
    pub fn decode_path(&self) -> Result<RoutePath> {
        serde_json::from_str(&self.path).map_err(|e| WaypointError::decode(e.to_string()))
    }
}
