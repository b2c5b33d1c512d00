//! Distance computation.
//!
//! A [`DistanceService`] takes the consecutive legs of a route in one request
//! and answers with one [`Leg`] per pair, in the same order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::route::WaypointPair;

mod google;

pub use google::GoogleDistanceMatrixClient;

/// External provider of per-leg distance and duration.
#[async_trait]
pub trait DistanceService: Send + Sync {
    /// Resolve every pair. The result has exactly one leg per pair, in order.
    ///
    /// An `Err` means the request as a whole failed; per-pair problems are
    /// reported through [`Leg::status`].
    async fn distances(&self, pairs: &[WaypointPair]) -> Result<Vec<Leg>>;

    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

/// Provider result for one waypoint pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub status: ElementStatus,
    /// Meters
    pub distance_meters: u64,
    /// Seconds
    pub duration_seconds: u64,
}

impl Leg {
    pub fn ok(distance_meters: u64, duration_seconds: u64) -> Self {
        Self {
            status: ElementStatus::Ok,
            distance_meters,
            duration_seconds,
        }
    }

    pub fn failed(status: ElementStatus) -> Self {
        Self {
            status,
            distance_meters: 0,
            duration_seconds: 0,
        }
    }
}

/// Per-pair status as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementStatus {
    Ok,
    NotFound,
    ZeroResults,
    MaxRouteLengthExceeded,
    /// Any code this crate does not name, kept verbatim
    Other(String),
}

impl ElementStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "NOT_FOUND",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::MaxRouteLengthExceeded => "MAX_ROUTE_LENGTH_EXCEEDED",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for ElementStatus {
    fn from(code: String) -> Self {
        match code.as_str() {
            "OK" => Self::Ok,
            "NOT_FOUND" => Self::NotFound,
            "ZERO_RESULTS" => Self::ZeroResults,
            "MAX_ROUTE_LENGTH_EXCEEDED" => Self::MaxRouteLengthExceeded,
            _ => Self::Other(code),
        }
    }
}

impl From<&str> for ElementStatus {
    fn from(code: &str) -> Self {
        Self::from(code.to_string())
    }
}

impl From<ElementStatus> for String {
    fn from(status: ElementStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ElementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
