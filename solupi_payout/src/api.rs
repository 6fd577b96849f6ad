use std::{fmt::Debug, str::FromStr, sync::Arc};

use log::*;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use solupi_common::{with_retry, MicroUsdc};
use spl_associated_token_account::{
    get_associated_token_address,
    instruction::create_associated_token_account_idempotent,
};
use tokio::sync::OnceCell;

use crate::{
    helpers::{decode_keypair, explorer_url, from_base_units, parse_address, to_base_units},
    PlatformInfo,
    SignedTransfer,
    SolanaConfig,
    SolanaPayoutError,
    TransferReceipt,
};

struct PlatformAccount {
    keypair: Keypair,
    mint: Pubkey,
    token_account: Pubkey,
    decimals: u8,
}

/// Sends USDC from the platform wallet to user wallets.
///
/// Cheap to clone. All clones share one RPC client and one lazily loaded platform account.
#[derive(Clone)]
pub struct SolanaPayout {
    config: SolanaConfig,
    rpc: Arc<RpcClient>,
    platform: Arc<OnceCell<PlatformAccount>>,
}

impl Debug for SolanaPayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SolanaPayout ({}, {})", self.config.rpc_url, self.config.network)
    }
}

impl SolanaPayout {
    pub fn new(config: SolanaConfig) -> Self {
        let rpc = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            config.rpc_timeout,
            CommitmentConfig::confirmed(),
        );
        Self { config, rpc: Arc::new(rpc), platform: Arc::new(OnceCell::new()) }
    }

    pub fn config(&self) -> &SolanaConfig {
        &self.config
    }

    /// Loads the platform key and makes sure the platform's token account exists.
    ///
    /// Concurrent callers wait for a single initialisation. A failed initialisation is retried on the next call.
    pub async fn initialize(&self) -> Result<PlatformInfo, SolanaPayoutError> {
        let platform = self.platform().await?;
        Ok(PlatformInfo {
            wallet_address: platform.keypair.pubkey().to_string(),
            token_account: platform.token_account.to_string(),
            mint: platform.mint.to_string(),
            decimals: platform.decimals,
        })
    }

    async fn platform(&self) -> Result<&PlatformAccount, SolanaPayoutError> {
        self.platform.get_or_try_init(|| self.load_platform()).await
    }

    async fn load_platform(&self) -> Result<PlatformAccount, SolanaPayoutError> {
        let keypair = decode_keypair(self.config.private_key.reveal())?;
        let mint = Pubkey::from_str(&self.config.usdc_mint)
            .map_err(|e| SolanaPayoutError::InvalidMint(format!("{}. {e}", self.config.usdc_mint)))?;
        info!("⛓️ Platform wallet loaded: {}", keypair.pubkey());
        let supply = with_retry("Fetch mint info", self.config.retry, || async move {
            self.rpc.get_token_supply(&mint).await.map_err(SolanaPayoutError::from)
        })
        .await?;
        let token_account = get_associated_token_address(&keypair.pubkey(), &mint);
        self.ensure_token_account(&keypair, &keypair.pubkey(), &mint).await?;
        info!("⛓️ Platform USDC account: {token_account} (mint {mint}, {} decimals)", supply.decimals);
        Ok(PlatformAccount { keypair, mint, token_account, decimals: supply.decimals })
    }

    /// Creates the associated token account of `owner` if it does not exist yet, paid for by `payer`.
    async fn ensure_token_account(
        &self,
        payer: &Keypair,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, SolanaPayoutError> {
        let address = get_associated_token_address(owner, mint);
        let existing = with_retry("Fetch token account", self.config.retry, || async move {
            self.rpc
                .get_account_with_commitment(&address, self.rpc.commitment())
                .await
                .map_err(SolanaPayoutError::from)
        })
        .await?;
        if existing.value.is_some() {
            trace!("⛓️ Token account {address} for {owner} exists");
            return Ok(address);
        }
        debug!("⛓️ Creating token account {address} for {owner}");
        let ix = create_associated_token_account_idempotent(&payer.pubkey(), owner, mint, &spl_token::id());
        let signature = self.send_signed(payer, &[ix], "Create token account").await?;
        info!("⛓️ Created token account {address} for {owner}. Transaction {signature}");
        Ok(address)
    }

    /// Signs `instructions` with a fresh blockhash. Nothing is sent.
    async fn sign(&self, payer: &Keypair, instructions: &[Instruction]) -> Result<Transaction, SolanaPayoutError> {
        let blockhash = with_retry("Fetch latest blockhash", self.config.retry, || async move {
            self.rpc.get_latest_blockhash().await.map_err(SolanaPayoutError::from)
        })
        .await?;
        Ok(Transaction::new_signed_with_payer(instructions, Some(&payer.pubkey()), &[payer], blockhash))
    }

    async fn send_signed(
        &self,
        payer: &Keypair,
        instructions: &[Instruction],
        label: &str,
    ) -> Result<Signature, SolanaPayoutError> {
        let tx = self.sign(payer, instructions).await?;
        self.submit(&tx, label).await
    }

    /// Submits a signed transaction until it is confirmed or the retries run out.
    ///
    /// Every retry resends the identical transaction, so it can land at most once. If every attempt fails, the
    /// signature status decides the outcome. An error other than [`SolanaPayoutError::OutcomeUnknown`] means the
    /// transaction has not landed and never will.
    async fn submit(&self, tx: &Transaction, label: &str) -> Result<Signature, SolanaPayoutError> {
        let signature = tx.signatures[0];
        let sent = with_retry(label, self.config.retry, || async move {
            self.rpc.send_and_confirm_transaction(tx).await.map_err(SolanaPayoutError::from)
        })
        .await;
        let error = match sent {
            Ok(signature) => return Ok(signature),
            Err(e) => e,
        };
        debug!("⛓️ {label} ({signature}) did not confirm. Checking its status before giving up. {error}");
        match self.rpc.get_signature_status(&signature).await {
            Ok(Some(Ok(()))) => {
                info!("⛓️ {label} ({signature}) landed despite the submission error");
                return Ok(signature);
            },
            Ok(Some(Err(e))) => return Err(SolanaPayoutError::TransactionFailed(format!("{signature}. {e}"))),
            Ok(None) => {},
            Err(e) => return Err(outcome_unknown(&signature, format!("{error}. Status check failed: {e}"))),
        }
        let blockhash = &tx.message.recent_blockhash;
        match self.rpc.is_blockhash_valid(blockhash, CommitmentConfig::processed()).await {
            Ok(false) => {
                debug!("⛓️ The blockhash of {signature} has expired, so it can no longer land");
                Err(error)
            },
            Ok(true) => Err(outcome_unknown(&signature, format!("{error}. The transaction may still land"))),
            Err(e) => Err(outcome_unknown(&signature, format!("{error}. Blockhash check failed: {e}"))),
        }
    }

    /// Validates the recipient, makes sure it has a token account, checks the platform balance covers `amount` and
    /// signs the transfer. Nothing is sent to the recipient yet.
    pub async fn prepare_transfer(
        &self,
        address: &str,
        amount: MicroUsdc,
    ) -> Result<SignedTransfer, SolanaPayoutError> {
        let recipient = parse_address(address)?;
        let platform = self.platform().await?;
        let raw_amount = to_base_units(amount, platform.decimals)?;
        if raw_amount == 0 {
            return Err(SolanaPayoutError::InvalidAmount(format!("{amount} is too small to transfer")));
        }
        let recipient_account = self.ensure_token_account(&platform.keypair, &recipient, &platform.mint).await?;

        let available = self.platform_balance(platform).await?;
        if available < amount {
            warn!("⛓️ Platform balance of {available} cannot cover a transfer of {amount}");
            return Err(SolanaPayoutError::InsufficientBalance { available, required: amount });
        }

        let ix = spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &platform.token_account,
            &platform.mint,
            &recipient_account,
            &platform.keypair.pubkey(),
            &[],
            raw_amount,
            platform.decimals,
        )
        .map_err(|e| SolanaPayoutError::TransactionBuildError(e.to_string()))?;
        let transaction = self.sign(&platform.keypair, &[ix]).await?;
        let signature = transaction.signatures[0];
        debug!("⛓️ Transfer of {amount} to {recipient} signed as {signature}");
        Ok(SignedTransfer { signature, amount, recipient, recipient_token_account: recipient_account, transaction })
    }

    /// Sends a prepared transfer and waits for confirmation.
    pub async fn submit_transfer(&self, transfer: &SignedTransfer) -> Result<TransferReceipt, SolanaPayoutError> {
        info!("⛓️ Sending {} to {} ({})", transfer.amount, transfer.recipient, transfer.recipient_token_account);
        let signature = self.submit(&transfer.transaction, "USDC transfer").await?.to_string();
        info!("⛓️ Transfer of {} to {} confirmed. Transaction {signature}", transfer.amount, transfer.recipient);
        Ok(TransferReceipt {
            explorer_url: explorer_url(&signature, &self.config.network),
            signature,
            amount: transfer.amount,
            recipient: transfer.recipient.to_string(),
            recipient_token_account: transfer.recipient_token_account.to_string(),
        })
    }

    /// Sends `amount` USDC to the wallet at `address` and waits for confirmation.
    pub async fn transfer(&self, address: &str, amount: MicroUsdc) -> Result<TransferReceipt, SolanaPayoutError> {
        let prepared = self.prepare_transfer(address, amount).await?;
        self.submit_transfer(&prepared).await
    }

    /// Checks whether the transaction with `signature` has been confirmed.
    ///
    /// Returns `Ok(false)` if the transaction is unknown or still pending, and an error if it failed on chain.
    pub async fn confirm(&self, signature: &str) -> Result<bool, SolanaPayoutError> {
        let sig = Signature::from_str(signature)
            .map_err(|e| SolanaPayoutError::InvalidSignature(format!("{signature}. {e}")))?;
        let sig = &sig;
        let status = with_retry("Fetch signature status", self.config.retry, || async move {
            self.rpc.get_signature_status(sig).await.map_err(SolanaPayoutError::from)
        })
        .await?;
        match status {
            None => {
                debug!("⛓️ Transaction {signature} has not been confirmed yet");
                Ok(false)
            },
            Some(Ok(())) => Ok(true),
            Some(Err(e)) => Err(SolanaPayoutError::TransactionFailed(format!("{signature}. {e}"))),
        }
    }

    /// The platform's USDC balance.
    pub async fn balance(&self) -> Result<MicroUsdc, SolanaPayoutError> {
        let platform = self.platform().await?;
        self.platform_balance(platform).await
    }

    async fn platform_balance(&self, platform: &PlatformAccount) -> Result<MicroUsdc, SolanaPayoutError> {
        let balance = with_retry("Fetch platform balance", self.config.retry, || async move {
            self.rpc.get_token_account_balance(&platform.token_account).await.map_err(SolanaPayoutError::from)
        })
        .await?;
        let raw = balance
            .amount
            .parse::<u64>()
            .map_err(|e| SolanaPayoutError::InvalidAmount(format!("Balance '{}'. {e}", balance.amount)))?;
        from_base_units(raw, platform.decimals)
    }

    pub fn explorer_url(&self, signature: &str) -> String {
        explorer_url(signature, &self.config.network)
    }
}

fn outcome_unknown(signature: &Signature, reason: String) -> SolanaPayoutError {
    SolanaPayoutError::OutcomeUnknown { signature: signature.to_string(), reason }
}
