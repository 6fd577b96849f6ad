//! The price oracle quotes the user-facing buy rate: the upstream USD/INR rate plus a fixed markup.
//!
//! Pricing must never block order creation, so [`PriceOracle::quote`] cannot fail. If the upstream source is
//! unavailable, a fixed fallback rate is returned and flagged as such.
use std::fmt::Debug;

use log::*;

use crate::{tpe_api::exchange_objects::PriceQuote, traits::RateSource};

pub const DEFAULT_MARKUP_PERCENT: f64 = 2.5;
pub const FALLBACK_RATE: f64 = 93.0;

pub struct PriceOracle<S> {
    source: S,
    markup_percent: f64,
}

impl<S> Debug for PriceOracle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PriceOracle (markup: {}%)", self.markup_percent)
    }
}

impl<S> PriceOracle<S>
where S: RateSource
{
    pub fn new(source: S) -> Self {
        Self { source, markup_percent: DEFAULT_MARKUP_PERCENT }
    }

    pub fn with_markup(mut self, markup_percent: f64) -> Self {
        self.markup_percent = markup_percent;
        self
    }

    pub async fn quote(&self) -> PriceQuote {
        match self.source.fetch_usd_inr().await {
            Ok(raw_rate) => {
                let final_rate = round2(raw_rate * (1.0 + self.markup_percent / 100.0));
                trace!("💱️ USD/INR {raw_rate} + {}% => {final_rate}", self.markup_percent);
                PriceQuote { raw_rate, markup_rate: self.markup_percent, final_rate, is_fallback: false }
            },
            Err(e) => {
                warn!("💱️ Could not fetch the USD/INR rate. Using the fallback rate of {FALLBACK_RATE}. {e}");
                PriceQuote {
                    raw_rate: FALLBACK_RATE,
                    markup_rate: self.markup_percent,
                    final_rate: FALLBACK_RATE,
                    is_fallback: true,
                }
            },
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
