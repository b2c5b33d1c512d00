//! Poll results for a token.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{JobStatus, Token};
use crate::error::Result;
use crate::route::RoutePath;
use crate::store::JobStore;

/// Message returned for empty, malformed and unknown tokens.
pub const INVALID_TOKEN: &str = "Invalid Token";

/// What a poller sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum RouteStatus {
    #[serde(rename = "in progress")]
    InProgress,

    #[serde(rename = "failure")]
    Failure { error: String },

    #[serde(rename = "success")]
    Success {
        path: RoutePath,
        total_distance: u64,
        total_time: u64,
    },
}

impl RouteStatus {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn invalid_token() -> Self {
        Self::failure(INVALID_TOKEN)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Reads jobs and renders them for polling. Never writes.
#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn JobStore>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Report the state of the job behind `raw_token`.
    ///
    /// Unknown tokens are a normal answer, not an error. Only a storage
    /// failure is returned as `Err`.
    pub async fn report(&self, raw_token: &str) -> Result<RouteStatus> {
        let Some(token) = Token::parse(raw_token) else {
            debug!(token = %raw_token, "Unparseable token polled");
            return Ok(RouteStatus::invalid_token());
        };

        let job = match self.store.get(token).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                debug!(token = %token, "Unknown token polled");
                return Ok(RouteStatus::invalid_token());
            }
            Err(e) => return Err(e),
        };

        let status = match job.status {
            JobStatus::Pending => RouteStatus::InProgress,
            JobStatus::Failure => RouteStatus::failure(job.error_message.unwrap_or_default()),
            JobStatus::Success => match job.decode_path() {
                Ok(path) => RouteStatus::Success {
                    path,
                    total_distance: job.total_distance,
                    total_time: job.total_time,
                },
                Err(e) => {
                    warn!(token = %token, error = %e, "Stored route path could not be decoded");
                    RouteStatus::failure(e.user_message())
                }
            },
        };

        Ok(status)
    }
}
