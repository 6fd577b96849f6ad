use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use solupi_common::MicroUsdc;

/// A signed USDC transfer that has not been sent yet.
///
/// The signature identifies the transfer on chain before it is submitted. Submitting the same `SignedTransfer` any
/// number of times moves the funds at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub signature: Signature,
    pub amount: MicroUsdc,
    pub recipient: Pubkey,
    pub recipient_token_account: Pubkey,
    pub transaction: Transaction,
}

/// The result of a confirmed USDC transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub signature: String,
    pub amount: MicroUsdc,
    pub recipient: String,
    /// The recipient's associated token account
    pub recipient_token_account: String,
    pub explorer_url: String,
}

/// The platform's token account, resolved once at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub wallet_address: String,
    pub token_account: String,
    pub mint: String,
    pub decimals: u8,
}
