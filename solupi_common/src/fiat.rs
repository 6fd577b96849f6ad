use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;

use crate::{op, AmountConversionError};

pub const INR_CURRENCY_CODE: &str = "INR";

//--------------------------------------       Paise        ---------------------------------------------------------
/// A fiat amount in paise, i.e. hundredths of a rupee.
///
/// On the wire (JSON) the amount is written as a decimal rupee value, so `Paise(123450)` serializes as `1234.5`.
/// Deserialization accepts either a JSON number or a string such as `"1,234.50"`.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Paise(i64);

op!(binary Paise, Add, add);
op!(binary Paise, Sub, sub);
op!(inplace Paise, SubAssign, sub_assign);
op!(unary Paise, Neg, neg);

impl Mul<i64> for Paise {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Paise {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Paise {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Paise {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub const fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Converts a floating point rupee amount, rounding to the nearest paisa.
    pub fn try_from_rupees_f64(rupees: f64) -> Result<Self, AmountConversionError> {
        if !rupees.is_finite() {
            return Err(AmountConversionError::new(format!("{rupees} is not a finite number")));
        }
        let paise = (rupees * 100.0).round();
        if paise.abs() > i64::MAX as f64 {
            return Err(AmountConversionError::new(format!("{rupees} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(paise as i64))
    }

    pub fn as_rupees_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// Parses decimal rupee strings. Thousands separators are ignored and at most two decimal places are accepted,
/// so `"1,234.50"`, `"1234.5"` and `"500"` are all valid.
impl FromStr for Paise {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().replace(',', "");
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        let all_digits = |v: &str| v.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) || frac.len() > 2 {
            return Err(AmountConversionError::new(format!("'{s}' is not a valid rupee amount")));
        }
        let whole = whole.parse::<i64>().map_err(|e| AmountConversionError::new(format!("'{s}': {e}")))?;
        let frac = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or_default() * 10,
            _ => frac.parse::<i64>().unwrap_or_default(),
        };
        let paise = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| AmountConversionError::new(format!("'{s}' is out of range")))?;
        Ok(Self(if negative { -paise } else { paise }))
    }
}

impl Display for Paise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₹{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Paise {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_rupees_f64())
    }
}

impl<'de> Deserialize<'de> for Paise {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Paise::try_from_rupees_f64(v).map_err(de::Error::custom),
            Raw::Text(s) => Paise::from_str(&s).map_err(de::Error::custom),
        }
    }
}
