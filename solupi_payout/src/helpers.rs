use std::str::FromStr;

use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use solupi_common::{MicroUsdc, USDC_DECIMALS};

use crate::SolanaPayoutError;

pub fn parse_address(address: &str) -> Result<Pubkey, SolanaPayoutError> {
    Pubkey::from_str(address.trim()).map_err(|e| SolanaPayoutError::InvalidAddress(format!("{address}. {e}")))
}

/// Decodes a secret key given either as a base58 string or as a JSON byte array (the `solana-keygen` file format).
pub fn decode_keypair(secret: &str) -> Result<Keypair, SolanaPayoutError> {
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(SolanaPayoutError::InvalidCredential("No private key has been configured".into()));
    }
    let bytes = if secret.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(secret)
            .map_err(|e| SolanaPayoutError::InvalidCredential(format!("Not a valid JSON byte array. {e}")))?
    } else {
        bs58::decode(secret)
            .into_vec()
            .map_err(|e| SolanaPayoutError::InvalidCredential(format!("Not a valid base58 string. {e}")))?
    };
    Keypair::from_bytes(&bytes).map_err(|e| SolanaPayoutError::InvalidCredential(e.to_string()))
}

pub fn explorer_url(signature: &str, network: &str) -> String {
    format!("https://explorer.solana.com/tx/{signature}?cluster={network}")
}

/// Converts a micro-USDC amount into the mint's base units.
pub fn to_base_units(amount: MicroUsdc, decimals: u8) -> Result<u64, SolanaPayoutError> {
    let micro = u64::try_from(amount).map_err(|e| SolanaPayoutError::InvalidAmount(e.to_string()))?;
    let overflow = || SolanaPayoutError::InvalidAmount(format!("{amount} does not fit the mint's precision"));
    if decimals >= USDC_DECIMALS {
        let scale = 10u64.checked_pow(u32::from(decimals - USDC_DECIMALS)).ok_or_else(overflow)?;
        micro.checked_mul(scale).ok_or_else(overflow)
    } else {
        let scale = 10u64.pow(u32::from(USDC_DECIMALS - decimals));
        if micro % scale != 0 {
            return Err(overflow());
        }
        Ok(micro / scale)
    }
}

/// Converts base units of a mint with `decimals` places into micro-USDC, truncating any excess precision.
pub fn from_base_units(raw: u64, decimals: u8) -> Result<MicroUsdc, SolanaPayoutError> {
    let micro = if decimals >= USDC_DECIMALS {
        let scale = 10u64.checked_pow(u32::from(decimals - USDC_DECIMALS)).unwrap_or(u64::MAX);
        raw / scale
    } else {
        let scale = 10u64.pow(u32::from(USDC_DECIMALS - decimals));
        raw.checked_mul(scale).ok_or_else(|| SolanaPayoutError::InvalidAmount(format!("{raw} base units")))?
    };
    MicroUsdc::try_from(micro).map_err(|e| SolanaPayoutError::InvalidAmount(e.to_string()))
}
