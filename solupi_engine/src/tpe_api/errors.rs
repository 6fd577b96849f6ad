use serde::{Deserialize, Serialize};
use solupi_common::AmountConversionError;
use thiserror::Error;

use crate::{
    db::traits::StoreError,
    db_types::{OrderStatusType, Paise, ReferenceCode},
    traits::PayoutError,
};

/// Broad classification of failures. Callers use it to decide whether to retry, report or page someone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input. User-correctable, nothing was changed.
    Validation,
    /// The requested record does not exist.
    NotFound,
    /// The caller is not allowed to touch the record.
    Forbidden,
    /// The record is in the wrong state. Never retried.
    Conflict,
    /// The counterpart event has not happened yet. A later trigger will retry.
    NotYetAvailable,
    /// A network dependency failed after internal retries.
    TransientNetwork,
    /// Requires operator action (platform funding, credentials).
    Irrecoverable,
    /// Storage failure or a bug.
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("No order carries reference {0} yet")]
    NoOrderForReference(ReferenceCode),
    #[error("Payment for reference {0} has not been received yet")]
    PaymentNotReceived(ReferenceCode),
    #[error("Order {0} has already been processed")]
    AlreadyProcessed(i64),
    #[error("Order {order_id} cannot be settled in status {status}")]
    OrderNotPayable { order_id: i64, status: OrderStatusType },
    #[error("Payment reference {0} has already been used")]
    ReferenceAlreadyUsed(ReferenceCode),
    #[error("Order {0} was claimed by another settlement run")]
    ClaimLost(i64),
    #[error("Insufficient payment. Received {received}, expected {expected}. Short by {shortfall}")]
    InsufficientPayment { received: Paise, expected: Paise, shortfall: Paise },
    #[error("Invalid destination address: {0}")]
    InvalidDestination(String),
    #[error("Payout failed: {0}")]
    Payout(#[from] PayoutError),
    #[error("Could not convert the order amount: {0}")]
    Conversion(#[from] AmountConversionError),
    #[error("Order {0} could not be marked as completed after the payout")]
    CompletionRejected(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Settlement aborted unexpectedly: {0}")]
    Panicked(String),
}

impl From<StoreError> for SettlementError {
    fn from(e: StoreError) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        use SettlementError::*;
        match self {
            NoOrderForReference(_) | PaymentNotReceived(_) => ErrorKind::NotYetAvailable,
            AlreadyProcessed(_) | OrderNotPayable { .. } | ReferenceAlreadyUsed(_) | ClaimLost(_) => ErrorKind::Conflict,
            InsufficientPayment { .. } | InvalidDestination(_) => ErrorKind::Validation,
            Payout(e) => match e {
                PayoutError::InvalidAddress(_) => ErrorKind::Validation,
                PayoutError::InsufficientBalance { .. } | PayoutError::InvalidCredential(_) => ErrorKind::Irrecoverable,
                PayoutError::Network(_) | PayoutError::Rejected(_) | PayoutError::OutcomeUnknown(_) => {
                    ErrorKind::TransientNetwork
                },
            },
            Conversion(_) | CompletionRejected(_) | DatabaseError(_) | Panicked(_) => ErrorKind::Internal,
        }
    }

    /// A message that is safe to show to end users.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "An internal error occurred while settling the order".to_string(),
            ErrorKind::Irrecoverable => "The payout is temporarily unavailable. Please contact support".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} does not belong to this user")]
    NotOrderOwner(i64),
    #[error("Order {order_id} cannot be modified in status {status}")]
    InvalidStatus { order_id: i64, status: OrderStatusType },
    #[error("Reference code {0} is already attached to another order")]
    DuplicateReference(ReferenceCode),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for OrderFlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateReference(r) => OrderFlowError::DuplicateReference(r),
            StoreError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl OrderFlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderFlowError::ValidationError(_) => ErrorKind::Validation,
            OrderFlowError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderFlowError::NotOrderOwner(_) => ErrorKind::Forbidden,
            OrderFlowError::InvalidStatus { .. } | OrderFlowError::DuplicateReference(_) => ErrorKind::Conflict,
            OrderFlowError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum IngestionError {
    #[error("Could not parse email")]
    ParseFailed,
    #[error("The payment notification has no reference code")]
    MissingReference,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for IngestionError {
    fn from(e: StoreError) -> Self {
        IngestionError::DatabaseError(e.to_string())
    }
}

impl IngestionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestionError::ParseFailed | IngestionError::MissingReference => ErrorKind::Validation,
            IngestionError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}
