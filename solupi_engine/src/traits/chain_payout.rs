use thiserror::Error;

use crate::db_types::{MicroUsdc, PayoutReceipt};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayoutError {
    #[error("Invalid destination address: {0}")]
    InvalidAddress(String),
    #[error("Insufficient USDC balance. Have {available}, need {required}")]
    InsufficientBalance { available: MicroUsdc, required: MicroUsdc },
    #[error("The platform signing credential is invalid: {0}")]
    InvalidCredential(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("The transfer was rejected: {0}")]
    Rejected(String),
    #[error("The outcome of transfer {0} could not be determined")]
    OutcomeUnknown(String),
}

impl PayoutError {
    /// True if the failure is due to the platform itself (funding, credentials) and needs operator action.
    pub fn needs_operator(&self) -> bool {
        matches!(self, PayoutError::InsufficientBalance { .. } | PayoutError::InvalidCredential(_))
    }

    /// True if the transfer may have landed on chain. Every other error means the funds did not move.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, PayoutError::OutcomeUnknown(_))
    }
}

/// A signed transfer that has not been submitted yet.
///
/// The signature is known before submission, so it can be recorded first. `transaction` is whatever the rail needs
/// to submit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransfer<T> {
    pub signature: String,
    pub recipient_account: String,
    pub transaction: T,
}

impl<T> PreparedTransfer<T> {
    pub fn new<S: Into<String>, R: Into<String>>(signature: S, recipient_account: R, transaction: T) -> Self {
        Self { signature: signature.into(), recipient_account: recipient_account.into(), transaction }
    }

    pub fn receipt(&self) -> PayoutReceipt {
        PayoutReceipt::new(self.signature.clone(), self.recipient_account.clone())
    }
}

/// A token payout rail.
///
/// Implementations must be cheap to clone and safe to share between tasks. Network-facing steps are expected to be
/// retried internally with bounded backoff.
///
/// A payout is made in two steps. [`ChainPayout::prepare_transfer`] resolves the recipient, checks funding and signs
/// the transfer without sending it. [`ChainPayout::submit_transfer`] sends it and waits for the outcome. Submitting
/// the same prepared transfer more than once can move funds at most once.
///
/// An `Err` from `submit_transfer` means the funds did not move, except for [`PayoutError::OutcomeUnknown`], which
/// means the transfer may still land and must be checked with [`ChainPayout::confirm`].
#[allow(async_fn_in_trait)]
pub trait ChainPayout: Clone {
    /// The rail-specific signed transaction carried by a [`PreparedTransfer`].
    type Transaction;

    /// Loads the platform credential and prepares the platform token account. Idempotent.
    async fn initialize(&self) -> Result<(), PayoutError>;

    /// Validates `address`, makes sure the recipient can receive the token, checks the platform balance covers
    /// `amount`, and signs the transfer.
    async fn prepare_transfer(
        &self,
        address: &str,
        amount: MicroUsdc,
    ) -> Result<PreparedTransfer<Self::Transaction>, PayoutError>;

    /// Sends a prepared transfer and waits for confirmation.
    async fn submit_transfer(
        &self,
        transfer: &PreparedTransfer<Self::Transaction>,
    ) -> Result<PayoutReceipt, PayoutError>;

    /// Checks whether a previously submitted transfer has been confirmed on chain. A transfer that failed on chain
    /// is reported as [`PayoutError::Rejected`].
    async fn confirm(&self, signature: &str) -> Result<bool, PayoutError>;

    /// The platform's token balance.
    async fn balance(&self) -> Result<MicroUsdc, PayoutError>;
}
