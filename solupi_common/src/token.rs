use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::{op, AmountConversionError};

pub const USDC_CURRENCY_CODE: &str = "USDC";
/// Decimal places of the USDC SPL token mint.
pub const USDC_DECIMALS: u8 = 6;
const MICRO_PER_USDC: i64 = 1_000_000;

//--------------------------------------     MicroUsdc      ---------------------------------------------------------
/// A token amount in the smallest unit of USDC (10^-6).
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MicroUsdc(i64);

op!(binary MicroUsdc, Add, add);
op!(binary MicroUsdc, Sub, sub);
op!(inplace MicroUsdc, SubAssign, sub_assign);
op!(unary MicroUsdc, Neg, neg);

impl Sum for MicroUsdc {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for MicroUsdc {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for MicroUsdc {
    type Error = AmountConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| AmountConversionError::new(format!("{value} is too large to convert to MicroUsdc")))
    }
}

impl TryFrom<MicroUsdc> for u64 {
    type Error = AmountConversionError;

    fn try_from(value: MicroUsdc) -> Result<Self, Self::Error> {
        u64::try_from(value.0).map_err(|_| AmountConversionError::new(format!("{value} is negative")))
    }
}

impl Display for MicroUsdc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = MICRO_PER_USDC.unsigned_abs();
        write!(f, "{sign}{}.{:06} {USDC_CURRENCY_CODE}", abs / unit, abs % unit)
    }
}

impl MicroUsdc {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_usdc(usdc: i64) -> Self {
        Self(usdc * MICRO_PER_USDC)
    }

    /// Converts a whole-token amount to micro units, rounding to the nearest micro unit.
    pub fn try_from_usdc_f64(usdc: f64) -> Result<Self, AmountConversionError> {
        if !usdc.is_finite() {
            return Err(AmountConversionError::new(format!("{usdc} is not a finite number")));
        }
        let micro = (usdc * MICRO_PER_USDC as f64).round();
        if micro.abs() > i64::MAX as f64 {
            return Err(AmountConversionError::new(format!("{usdc} USDC is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(micro as i64))
    }

    pub fn as_usdc_f64(&self) -> f64 {
        self.0 as f64 / MICRO_PER_USDC as f64
    }
}
