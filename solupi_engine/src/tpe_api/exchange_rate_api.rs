//! A [`RateSource`] backed by the exchangerate-api.com v6 REST API.
use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use serde_json::Value;
use solupi_common::Secret;

use crate::traits::{PriceOracleError, RateSource};

pub const EXCHANGE_RATE_API_URL: &str = "https://v6.exchangerate-api.com/v6";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ExchangeRateApiSource {
    base_url: String,
    api_key: Secret<String>,
    client: Arc<Client>,
}

impl ExchangeRateApiSource {
    pub fn new(api_key: Secret<String>) -> Result<Self, PriceOracleError> {
        Self::new_with_url(EXCHANGE_RATE_API_URL, api_key, DEFAULT_TIMEOUT)
    }

    pub fn new_with_url(base_url: &str, api_key: Secret<String>, timeout: Duration) -> Result<Self, PriceOracleError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| PriceOracleError::Network(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), api_key, client: Arc::new(client) })
    }
}

impl RateSource for ExchangeRateApiSource {
    async fn fetch_usd_inr(&self) -> Result<f64, PriceOracleError> {
        if self.api_key.is_empty() {
            return Err(PriceOracleError::NotConfigured);
        }
        let url = format!("{}/{}/latest/USD", self.base_url, self.api_key.reveal());
        trace!("💱️ Fetching USD exchange rates");
        let response = self.client.get(url).send().await.map_err(|e| PriceOracleError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PriceOracleError::UpstreamStatus(response.status().as_u16()));
        }
        let body = response.json::<Value>().await.map_err(|e| PriceOracleError::InvalidResponse(e.to_string()))?;
        inr_rate_from_response(&body)
    }
}

/// Extracts `conversion_rates.INR` from a `latest/USD` response.
pub fn inr_rate_from_response(body: &Value) -> Result<f64, PriceOracleError> {
    let rate = body
        .get("conversion_rates")
        .and_then(|rates| rates.get("INR"))
        .and_then(Value::as_f64)
        .ok_or_else(|| PriceOracleError::InvalidResponse("conversion_rates.INR is missing".into()))?;
    if !(rate.is_finite() && rate > 0.0) {
        return Err(PriceOracleError::InvalidResponse(format!("{rate} is not a valid rate")));
    }
    Ok(rate)
}
