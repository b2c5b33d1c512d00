//! Google Distance Matrix client.
//!
//! One request per route: origins are points `0..n-1`, destinations are
//! points `1..n`, so leg `i` sits on the diagonal at `rows[i].elements[i]`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{DistanceService, ElementStatus, Leg};
use crate::config::DistanceConfig;
use crate::error::{Result, WaypointError};
use crate::route::WaypointPair;

const MATRIX_PATH: &str = "/maps/api/distancematrix/json";

/// Distance Matrix API client.
#[derive(Debug, Clone)]
pub struct GoogleDistanceMatrixClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
}

impl GoogleDistanceMatrixClient {
    /// Build a client from configuration. An API key is required.
    pub fn new(config: &DistanceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                WaypointError::configuration(
                    "distance.api_key (or GOOGLE_API_KEY) must be set",
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), MATRIX_PATH),
            api_key,
            language: config.language.clone(),
        })
    }

    /// Set custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn join_points<'a>(points: impl Iterator<Item = &'a crate::route::RoutePoint>) -> String {
        points
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[async_trait]
impl DistanceService for GoogleDistanceMatrixClient {
    async fn distances(&self, pairs: &[WaypointPair]) -> Result<Vec<Leg>> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let origins = Self::join_points(pairs.iter().map(|p| &p.origin));
        let destinations = Self::join_points(pairs.iter().map(|p| &p.destination));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("language", self.language.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WaypointError::from(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WaypointError::provider(format!(
                "distance matrix request failed with HTTP {}",
                status.as_u16()
            )));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|e| WaypointError::from(e.without_url()))?;

        debug!(legs = pairs.len(), status = %body.status, "Distance matrix response received");
        body.into_legs(pairs.len())
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Wire Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<MatrixValue>,
    #[serde(default)]
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: u64,
}

impl MatrixResponse {
    fn into_legs(self, expected: usize) -> Result<Vec<Leg>> {
        if self.status != "OK" {
            let message = match self.error_message.filter(|m| !m.is_empty()) {
                Some(detail) => format!("{}: {}", self.status, detail),
                None => self.status,
            };
            return Err(WaypointError::provider(message));
        }

        // The first failed leg ends the walk; later rows are not inspected.
        let mut rows = self.rows.into_iter();
        let mut legs = Vec::with_capacity(expected);
        for i in 0..expected {
            let row = rows.next().ok_or_else(|| {
                WaypointError::provider(format!(
                    "malformed response: expected {} rows, got {}",
                    expected, i
                ))
            })?;
            let row_len = row.elements.len();
            let element = row.elements.into_iter().nth(i).ok_or_else(|| {
                WaypointError::provider(format!(
                    "malformed response: row {} has {} elements",
                    i, row_len
                ))
            })?;

            let leg = element.into_leg(i)?;
            let failed = !leg.status.is_ok();
            legs.push(leg);
            if failed {
                return Ok(legs);
            }
        }

        let extra = rows.count();
        if extra > 0 {
            return Err(WaypointError::provider(format!(
                "malformed response: expected {} rows, got {}",
                expected,
                expected + extra
            )));
        }

        Ok(legs)
    }
}

impl MatrixElement {
    fn into_leg(self, index: usize) -> Result<Leg> {
        let status = ElementStatus::from(self.status);
        if !status.is_ok() {
            return Ok(Leg::failed(status));
        }

        match (self.distance, self.duration) {
            (Some(distance), Some(duration)) => Ok(Leg::ok(distance.value, duration.value)),
            _ => Err(WaypointError::provider(format!(
                "malformed response: element {} is OK without distance or duration",
                index
            ))),
        }
    }
}
