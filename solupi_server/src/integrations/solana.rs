use log::*;
use solupi_engine::{
    db_types::{MicroUsdc, PayoutReceipt},
    traits::{ChainPayout, PayoutError, PreparedTransfer},
};
use solupi_payout::{SignedTransfer, SolanaConfig, SolanaPayout, SolanaPayoutError};

/// The Solana USDC payout rail, as seen by the settlement engine.
#[derive(Debug, Clone)]
pub struct SolanaChain {
    client: SolanaPayout,
}

impl SolanaChain {
    pub fn new(config: SolanaConfig) -> Self {
        Self { client: SolanaPayout::new(config) }
    }

    pub fn client(&self) -> &SolanaPayout {
        &self.client
    }
}

impl ChainPayout for SolanaChain {
    type Transaction = SignedTransfer;

    async fn initialize(&self) -> Result<(), PayoutError> {
        let info = self.client.initialize().await.map_err(to_payout_error)?;
        info!("⛓️ Payout wallet {} ready. Token account: {}", info.wallet_address, info.token_account);
        Ok(())
    }

    async fn prepare_transfer(
        &self,
        address: &str,
        amount: MicroUsdc,
    ) -> Result<PreparedTransfer<SignedTransfer>, PayoutError> {
        let signed = self.client.prepare_transfer(address, amount).await.map_err(to_payout_error)?;
        let signature = signed.signature.to_string();
        let recipient_account = signed.recipient_token_account.to_string();
        Ok(PreparedTransfer::new(signature, recipient_account, signed))
    }

    async fn submit_transfer(
        &self,
        transfer: &PreparedTransfer<SignedTransfer>,
    ) -> Result<PayoutReceipt, PayoutError> {
        let receipt = self.client.submit_transfer(&transfer.transaction).await.map_err(to_payout_error)?;
        info!("⛓️ Sent {} to {}. {}", receipt.amount, receipt.recipient, receipt.explorer_url);
        Ok(PayoutReceipt::new(receipt.signature, receipt.recipient_token_account))
    }

    async fn confirm(&self, signature: &str) -> Result<bool, PayoutError> {
        self.client.confirm(signature).await.map_err(to_payout_error)
    }

    async fn balance(&self) -> Result<MicroUsdc, PayoutError> {
        self.client.balance().await.map_err(to_payout_error)
    }
}

pub fn to_payout_error(e: SolanaPayoutError) -> PayoutError {
    match e {
        SolanaPayoutError::InvalidAddress(s) => PayoutError::InvalidAddress(s),
        SolanaPayoutError::InsufficientBalance { available, required } => {
            PayoutError::InsufficientBalance { available, required }
        },
        SolanaPayoutError::InvalidCredential(s) => PayoutError::InvalidCredential(s),
        SolanaPayoutError::InvalidMint(s) => PayoutError::InvalidCredential(format!("Invalid mint: {s}")),
        SolanaPayoutError::RpcError(s) => PayoutError::Network(s),
        SolanaPayoutError::OutcomeUnknown { signature, .. } => PayoutError::OutcomeUnknown(signature),
        e @ (SolanaPayoutError::InvalidAmount(_) |
        SolanaPayoutError::InvalidSignature(_) |
        SolanaPayoutError::TransactionBuildError(_) |
        SolanaPayoutError::TransactionFailed(_)) => PayoutError::Rejected(e.to_string()),
    }
}
