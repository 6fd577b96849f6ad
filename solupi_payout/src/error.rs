use solupi_common::MicroUsdc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SolanaPayoutError {
    #[error("Invalid Solana address: {0}")]
    InvalidAddress(String),
    #[error("The platform key could not be loaded: {0}")]
    InvalidCredential(String),
    #[error("Invalid mint address: {0}")]
    InvalidMint(String),
    #[error("Insufficient USDC balance. Have {available}, need {required}")]
    InsufficientBalance { available: MicroUsdc, required: MicroUsdc },
    #[error("Invalid token amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid transaction signature: {0}")]
    InvalidSignature(String),
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Could not build the transaction: {0}")]
    TransactionBuildError(String),
    #[error("The transaction failed on chain: {0}")]
    TransactionFailed(String),
    /// The transaction was sent, but whether it landed could not be determined. It may still confirm.
    #[error("The outcome of transaction {signature} is unknown: {reason}")]
    OutcomeUnknown { signature: String, reason: String },
}

impl From<solana_client::client_error::ClientError> for SolanaPayoutError {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        SolanaPayoutError::RpcError(e.to_string())
    }
}
