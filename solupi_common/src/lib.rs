mod fiat;
mod helpers;
mod token;

pub mod op;
pub mod retry;
mod secret;

pub use fiat::{Paise, INR_CURRENCY_CODE};
pub use helpers::parse_boolean_flag;
pub use retry::{with_retry, RetryPolicy};
pub use secret::Secret;
pub use token::{MicroUsdc, USDC_CURRENCY_CODE, USDC_DECIMALS};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

impl AmountConversionError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self(msg.into())
    }
}
