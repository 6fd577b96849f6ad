use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PriceOracleError {
    #[error("Could not reach the exchange rate provider: {0}")]
    Network(String),
    #[error("The exchange rate provider returned status {0}")]
    UpstreamStatus(u16),
    #[error("The exchange rate provider response is invalid: {0}")]
    InvalidResponse(String),
    #[error("No exchange rate provider is configured")]
    NotConfigured,
}

/// An upstream source of the base exchange rate.
#[allow(async_fn_in_trait)]
pub trait RateSource {
    /// Fetch the current number of rupees per US dollar.
    async fn fetch_usd_inr(&self) -> Result<f64, PriceOracleError>;
}
