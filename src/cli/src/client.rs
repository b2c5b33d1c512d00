//! HTTP client for the Waypoint API server.

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /route`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenResponse {
    pub token: Uuid,
}

/// Body of `GET /route/:token`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status")]
pub enum RouteStatus {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "failure")]
    Failure { error: String },
    #[serde(rename = "success")]
    Success {
        path: Vec<[String; 2]>,
        total_distance: u64,
        total_time: u64,
    },
}

impl RouteStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// The server's error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// HTTP client for the Waypoint API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a route of `[latitude, longitude]` points.
    pub async fn submit_route(&self, points: &[[String; 2]]) -> Result<TokenResponse> {
        let url = format!("{}/route", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(points)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        Self::decode(resp, &url).await
    }

    /// Poll the status of a submitted route.
    pub async fn route_status(&self, token: &str) -> Result<RouteStatus> {
        let url = format!("{}/route/{}", self.base_url, token);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        Self::decode(resp, &url).await
    }

    /// Fetch the health report. A degraded server still returns its report.
    pub async fn health(&self) -> Result<serde_json::Value> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    async fn decode<T: DeserializeOwned>(resp: Response, url: &str) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => anyhow::bail!(
                    "API error ({}, {}): {}",
                    status,
                    envelope.error.code,
                    envelope.error.message
                ),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}
