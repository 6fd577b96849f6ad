//! A USDC payout client for Solana.
//!
//! [`SolanaPayout`] holds the platform's signing key and token account and sends SPL-token transfers to user wallets.
//! Every RPC call has a timeout, and every network-facing step is retried with a bounded exponential backoff.
mod api;
mod config;
mod data_objects;
mod error;
pub mod helpers;

pub use api::SolanaPayout;
pub use config::{SolanaConfig, DEFAULT_NETWORK, DEFAULT_RPC_URL, DEFAULT_USDC_MINT};
pub use data_objects::{PlatformInfo, SignedTransfer, TransferReceipt};
pub use error::SolanaPayoutError;
