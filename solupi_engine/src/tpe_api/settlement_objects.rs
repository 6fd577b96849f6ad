use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, Paise},
    tpe_api::{
        errors::{ErrorKind, SettlementError},
        exchange_objects::ConversionRate,
    },
};

/// Payments may fall short of the order amount by at most this much and still settle.
pub const DEFAULT_PAYMENT_TOLERANCE: Paise = Paise::from_rupees(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    pub tolerance: Paise,
    pub conversion_rate: ConversionRate,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self { tolerance: DEFAULT_PAYMENT_TOLERANCE, conversion_rate: ConversionRate::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Completed(Order),
}

impl SettlementOutcome {
    pub fn order(&self) -> &Order {
        match self {
            SettlementOutcome::Completed(order) => order,
        }
    }
}

/// A serializable summary of a settlement run, suitable for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub settled: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl From<&Result<SettlementOutcome, SettlementError>> for SettlementReport {
    fn from(result: &Result<SettlementOutcome, SettlementError>) -> Self {
        match result {
            Ok(SettlementOutcome::Completed(order)) => Self {
                settled: true,
                kind: None,
                message: format!("Order {} completed", order.id),
            },
            Err(e) => Self { settled: false, kind: Some(e.kind()), message: e.user_message() },
        }
    }
}
