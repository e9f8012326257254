use super::util::with_retry;
use crate::core::config::ProviderConfig;
use crate::core::rates::{RateProvider, RateTable};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    rates: Option<BTreeMap<String, f64>>,
}

/// Rate provider for the open.er-api.com `latest` endpoint and compatible APIs.
pub struct OpenErApiProvider {
    base_url: String,
    retries: usize,
    retry_delay_ms: u64,
}

impl OpenErApiProvider {
    pub fn new(base_url: &str) -> Self {
        OpenErApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            retries: 0,
            retry_delay_ms: 0,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        OpenErApiProvider {
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
            ..Self::new(&config.base_url)
        }
    }

    async fn request(&self, url: &str, base: &str) -> Result<String> {
        let client = reqwest::Client::builder().user_agent("fxconv/1.0").build()?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        Ok(response.text().await?)
    }
}

fn parse_rates(base: &str, text: &str) -> Result<RateTable> {
    let data: LatestRatesResponse = match serde_json::from_str(text) {
        Ok(data) => data,
        Err(e) => {
            error!(error = ?e, response = %text, "Failed to parse rates response");
            return Err(anyhow!(
                "Failed to parse JSON response for {}: {}",
                base,
                e
            ));
        }
    };

    if data.result.as_deref() == Some("error") {
        return Err(anyhow!(
            "Provider error: {} for base currency: {}",
            data.error_type.as_deref().unwrap_or("unknown"),
            base
        ));
    }

    let rates = data
        .rates
        .ok_or_else(|| anyhow!("No rates found for base currency: {}", base))?;

    let mut table = RateTable::new(data.base_code.as_deref().unwrap_or(base), rates);
    table.last_updated = data
        .time_last_update_unix
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
    Ok(table)
}

#[async_trait]
impl RateProvider for OpenErApiProvider {
    #[instrument(name = "OpenErApiFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RateTable> {
        let url = format!("{}/{}", self.base_url, base);
        debug!("Requesting exchange rates from {}", url);

        let text = with_retry(
            || self.request(&url, base),
            self.retries,
            self.retry_delay_ms,
        )
        .await?;

        parse_rates(base, &text)
    }
}
