use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::setup::CycleSetup;

pub const CALCULATE_CYCLE_PATH: &str = "/api/calculate-cycle";
pub const DEFAULT_FETCH_ERROR: &str = "Failed to calculate cycle phase";

/// Body of `POST /api/calculate-cycle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateCycleRequest {
    pub last_period_date: String,
    pub cycle_length: u32,
    pub current_date: String,
}

/// Reply from the calculation service. Only `success` is required on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePhaseResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CyclePhaseResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CycleServiceError {
    #[error("Failed to calculate cycle phase: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

#[async_trait]
pub trait CyclePhaseFetcher: Send + Sync {
    /// Where `current_date` falls in the cycle described by `setup`.
    async fn fetch(
        &self,
        setup: &CycleSetup,
        current_date: NaiveDate,
    ) -> Result<CyclePhaseResult, CycleServiceError>;
}

/// Talks to the local calculation service over HTTP. No retries.
pub struct HttpCycleFetcher {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCycleFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), CALCULATE_CYCLE_PATH)
    }
}

#[async_trait]
impl CyclePhaseFetcher for HttpCycleFetcher {
    async fn fetch(
        &self,
        setup: &CycleSetup,
        current_date: NaiveDate,
    ) -> Result<CyclePhaseResult, CycleServiceError> {
        let body = CalculateCycleRequest {
            last_period_date: setup.last_period_date.clone(),
            cycle_length: setup.cycle_length,
            current_date: current_date.format("%Y-%m-%d").to_string(),
        };
        let url = self.endpoint();
        debug!(%url, ?body, "requesting cycle phase");

        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;

        // Error bodies may still carry a usable `error` field.
        let parsed = serde_json::from_str::<CyclePhaseResult>(&text).ok();

        match parsed {
            Some(result) if status.is_success() && result.success => Ok(result),
            Some(result) => {
                let message = result
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FETCH_ERROR.to_string());
                warn!(%status, %message, "cycle service rejected request");
                Err(CycleServiceError::Rejected(message))
            }
            None => {
                warn!(%status, "cycle service returned an unreadable body");
                Err(CycleServiceError::Rejected(DEFAULT_FETCH_ERROR.to_string()))
            }
        }
    }
}
