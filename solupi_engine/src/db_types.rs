//! Data types that are shared between the storage backends, the settlement engine and API consumers.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use solupi_common::{MicroUsdc, Paise};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// Number of digits in a UPI retrieval reference number.
pub const REFERENCE_CODE_LENGTH: usize = 12;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been created and is waiting for the user to pay and report the payment reference.
    Pending,
    /// The user has reported a payment that has not been matched yet.
    AwaitingPayment,
    /// The order has been claimed by the settlement engine and a payout is in flight.
    Processing,
    /// The payout has been confirmed on chain.
    Completed,
    /// The payout outcome is unknown and requires operator review.
    Failed,
    /// The order was cancelled by the user.
    Cancelled,
}

impl OrderStatusType {
    /// Orders in these states can still be claimed for settlement.
    pub const PAYABLE: [OrderStatusType; 2] = [OrderStatusType::Pending, OrderStatusType::AwaitingPayment];

    pub fn is_payable(&self) -> bool {
        Self::PAYABLE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "PENDING",
            OrderStatusType::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatusType::Processing => "PROCESSING",
            OrderStatusType::Completed => "COMPLETED",
            OrderStatusType::Failed => "FAILED",
            OrderStatusType::Cancelled => "CANCELLED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "AWAITING_PAYMENT" => Ok(Self::AwaitingPayment),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     ReferenceCode     ---------------------------------------------------------
/// The bank's retrieval reference number (RRN). It is the join key between orders and ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ReferenceCode(String);

impl ReferenceCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == REFERENCE_CODE_LENGTH && self.0.chars().all(|c| c.is_ascii_digit())
    }
}

/// Validating constructor. Surrounding whitespace is ignored.
impl FromStr for ReferenceCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = Self(s.trim().to_string());
        if code.is_well_formed() {
            Ok(code)
        } else {
            Err(ConversionError(format!("Reference code must be exactly {REFERENCE_CODE_LENGTH} digits. Got '{s}'")))
        }
    }
}

impl Display for ReferenceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    /// The fiat amount the user pays
    pub amount: Paise,
    /// The user's wallet address that receives the tokens
    pub destination_address: String,
    pub status: OrderStatusType,
    pub reference_code: Option<ReferenceCode>,
    /// Transaction signature of the payout. Set at most once.
    pub chain_tx_id: Option<String>,
    /// The associated token account that received the payout
    pub recipient_account: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: String,
    pub amount: Paise,
    pub destination_address: String,
}

impl NewOrder {
    pub fn new<U: Into<String>, A: Into<String>>(user_id: U, amount: Paise, destination_address: A) -> Self {
        Self { user_id: user_id.into(), amount, destination_address: destination_address.into() }
    }
}

//--------------------------------------      PaymentFact      ---------------------------------------------------------
/// The structured content of a bank notification, as recovered by the email parser. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFact {
    pub reference_code: Option<ReferenceCode>,
    pub amount: Option<Paise>,
    pub sender: Option<String>,
    pub observed_at: DateTime<Utc>,
}

//--------------------------------------      LedgerEntry      ---------------------------------------------------------
/// An observed incoming payment.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub reference_code: ReferenceCode,
    pub sender: String,
    pub amount: Paise,
    pub observed_at: DateTime<Utc>,
    /// Set once the payment has been consumed by an order
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub reference_code: ReferenceCode,
    pub sender: String,
    pub amount: Paise,
    pub observed_at: DateTime<Utc>,
}

pub const UNKNOWN_SENDER: &str = "Unknown";

impl NewLedgerEntry {
    pub fn new(reference_code: ReferenceCode, amount: Paise) -> Self {
        Self { reference_code, sender: UNKNOWN_SENDER.to_string(), amount, observed_at: Utc::now() }
    }

    pub fn with_sender<S: Into<String>>(mut self, sender: S) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

impl TryFrom<PaymentFact> for NewLedgerEntry {
    type Error = ConversionError;

    /// A fact without a reference code cannot be stored. Missing senders become "Unknown" and missing amounts zero.
    fn try_from(fact: PaymentFact) -> Result<Self, Self::Error> {
        let reference_code = fact
            .reference_code
            .ok_or_else(|| ConversionError("The payment notification has no reference code".into()))?;
        Ok(Self {
            reference_code,
            sender: fact.sender.unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            amount: fact.amount.unwrap_or_default(),
            observed_at: fact.observed_at,
        })
    }
}

//--------------------------------------     PayoutAttempt     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatusType {
    /// Recorded before the transfer is submitted. If an attempt stays here, the outcome is unknown.
    Submitted,
    Confirmed,
    Failed,
}

impl Display for PayoutStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatusType::Submitted => f.write_str("SUBMITTED"),
            PayoutStatusType::Confirmed => f.write_str("CONFIRMED"),
            PayoutStatusType::Failed => f.write_str("FAILED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PayoutAttempt {
    pub id: i64,
    pub order_id: i64,
    pub reference_code: ReferenceCode,
    pub amount: MicroUsdc,
    pub signature: Option<String>,
    pub recipient_account: Option<String>,
    pub status: PayoutStatusType,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The result of a confirmed on-chain transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub signature: String,
    pub recipient_account: String,
}

impl PayoutReceipt {
    pub fn new<S: Into<String>, R: Into<String>>(signature: S, recipient_account: R) -> Self {
        Self { signature: signature.into(), recipient_account: recipient_account.into() }
    }
}
