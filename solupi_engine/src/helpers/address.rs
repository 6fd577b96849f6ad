use once_cell::sync::Lazy;
use regex::Regex;

static BASE58_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").unwrap());

/// A cheap format check for wallet addresses: 32 to 44 characters of the base58 alphabet. This does not prove that
/// the address decodes to a valid public key; the payout client does that before any transfer.
pub fn is_valid_wallet_address(address: &str) -> bool {
    BASE58_ADDRESS.is_match(address)
}
