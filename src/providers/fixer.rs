use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::rates::{ExchangeRateSnapshot, RateFetcher};

const LATEST_ENDPOINT: &str = "latest";

#[derive(Debug, Deserialize)]
struct FixerResponse {
    success: Option<bool>,
    base: Option<String>,
    date: Option<NaiveDate>,
    rates: Option<HashMap<String, Decimal>>,
    error: Option<FixerErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FixerErrorBody {
    code: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    info: Option<String>,
}

impl std::fmt::Display for FixerErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.kind.as_deref().unwrap_or("unknown_error"),
            self.code.map_or("no code".to_string(), |c| c.to_string())
        )?;
        if let Some(info) = &self.info {
            write!(f, ": {info}")?;
        }
        Ok(())
    }
}

/// Rate fetcher for fixer.io style endpoints: `{base_url}/{latest|YYYY-MM-DD}`.
pub struct FixerRateProvider {
    base_url: String,
    timeout: Option<Duration>,
}

impl FixerRateProvider {
    pub fn new(base_url: &str) -> Self {
        FixerRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn endpoint_url(&self, endpoint: &str, base: &str, access_key: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/{}", self.base_url, endpoint),
            &[("base", base), ("access_key", access_key)],
        )
        .with_context(|| format!("Invalid rate provider URL: {}", self.base_url))
    }

    async fn fetch_snapshot(
        &self,
        endpoint: &str,
        base: &str,
        access_key: &str,
    ) -> Result<ExchangeRateSnapshot> {
        let url = self.endpoint_url(endpoint, base, access_key)?;
        debug!("Requesting rates from {}/{} for base {}", self.base_url, endpoint, base);

        let mut builder = reqwest::Client::builder().user_agent("stronger/0.1");
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for rates: {}", e.without_url(), endpoint))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for rates: {}",
                response.status(),
                endpoint
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| {
                anyhow!("Failed to read response for {}: {}", endpoint, e.without_url())
            })?;

        let data: FixerResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", endpoint, e))?;

        if data.success == Some(false) {
            return Err(match data.error {
                Some(error) => anyhow!("Provider error for {}: {}", endpoint, error),
                None => anyhow!("Provider error for {}: request unsuccessful", endpoint),
            });
        }

        let rates = data
            .rates
            .ok_or_else(|| anyhow!("No rate data found for {}", endpoint))?;
        let snapshot =
            ExchangeRateSnapshot::new(data.base.as_deref().unwrap_or(base), data.date, rates);
        debug!(
            base = snapshot.base(),
            count = snapshot.rate_count(),
            date = ?snapshot.date(),
            "Received rate snapshot"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl RateFetcher for FixerRateProvider {
    #[instrument(name = "FixerLatestFetch", skip(self, access_key), fields(base = %base))]
    async fn fetch_latest(&self, base: &str, access_key: &str) -> Result<ExchangeRateSnapshot> {
        self.fetch_snapshot(LATEST_ENDPOINT, base, access_key).await
    }

    #[instrument(
        name = "FixerHistoricalFetch",
        skip(self, access_key),
        fields(base = %base, date = %date)
    )]
    async fn fetch_historical(
        &self,
        date: NaiveDate,
        base: &str,
        access_key: &str,
    ) -> Result<ExchangeRateSnapshot> {
        let endpoint = date.format("%Y-%m-%d").to_string();
        self.fetch_snapshot(&endpoint, base, access_key).await
    }
}
