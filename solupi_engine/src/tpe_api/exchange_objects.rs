use std::fmt::Display;

use serde::{Deserialize, Serialize};
use solupi_common::{AmountConversionError, MicroUsdc, Paise};

/// Default conversion rate used for payouts, in rupees per USDC.
pub const DEFAULT_INR_PER_USDC: i64 = 83;
const MICRO_PER_CENT: i64 = 10_000;

/// The rate at which fiat order amounts are converted into token payouts, expressed as the price of one USDC in
/// paise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRate {
    price_per_usdc: Paise,
}

impl ConversionRate {
    pub fn new(price_per_usdc: Paise) -> Result<Self, AmountConversionError> {
        if !price_per_usdc.is_positive() {
            return Err(AmountConversionError::new(format!("Conversion rate must be positive. Got {price_per_usdc}")));
        }
        Ok(Self { price_per_usdc })
    }

    pub fn price_per_usdc(&self) -> Paise {
        self.price_per_usdc
    }

    /// Converts a fiat amount to USDC, rounded to whole cents, and expresses it in micro units.
    pub fn convert(&self, amount: Paise) -> Result<MicroUsdc, AmountConversionError> {
        let rate = i128::from(self.price_per_usdc.value());
        let scaled = i128::from(amount.value()) * 100;
        // round half away from zero
        let cents = if scaled >= 0 { (scaled + rate / 2) / rate } else { (scaled - rate / 2) / rate };
        let micro = cents
            .checked_mul(i128::from(MICRO_PER_CENT))
            .and_then(|m| i64::try_from(m).ok())
            .ok_or_else(|| AmountConversionError::new(format!("{amount} is too large to convert")))?;
        Ok(MicroUsdc::from(micro))
    }
}

impl Default for ConversionRate {
    fn default() -> Self {
        Self { price_per_usdc: Paise::from_rupees(DEFAULT_INR_PER_USDC) }
    }
}

impl Display for ConversionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1 USDC => {}", self.price_per_usdc)
    }
}

/// A price quote for the user-facing buy rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// The upstream USD/INR rate
    pub raw_rate: f64,
    /// The markup, in percent
    pub markup_rate: f64,
    /// The marked-up rate, rounded to two decimals
    pub final_rate: f64,
    /// True if the upstream source was unavailable and `final_rate` is the fixed fallback
    pub is_fallback: bool,
}
