use std::time::Duration;

use log::*;
use solupi_common::{RetryPolicy, Secret};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
/// The devnet USDC mint.
pub const DEFAULT_USDC_MINT: &str = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr";
pub const DEFAULT_NETWORK: &str = "devnet";
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub rpc_url: String,
    /// The platform's secret key, base58 encoded or as a JSON byte array
    pub private_key: Secret<String>,
    pub usdc_mint: String,
    /// The cluster name, used for explorer links
    pub network: String,
    pub rpc_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            private_key: Secret::default(),
            usdc_mint: DEFAULT_USDC_MINT.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl SolanaConfig {
    pub fn new_from_env_or_default() -> Self {
        let rpc_url = std::env::var("SOLUPI_RPC_URL").unwrap_or_else(|_| {
            warn!("🪛️ SOLUPI_RPC_URL not set, using {DEFAULT_RPC_URL}");
            DEFAULT_RPC_URL.to_string()
        });
        let private_key = Secret::new(std::env::var("SOLUPI_PRIVATE_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SOLUPI_PRIVATE_KEY not set. Payouts will fail until a platform key is configured");
            String::default()
        }));
        let usdc_mint = std::env::var("SOLUPI_USDC_MINT").unwrap_or_else(|_| {
            warn!("🪛️ SOLUPI_USDC_MINT not set, using the devnet USDC mint {DEFAULT_USDC_MINT}");
            DEFAULT_USDC_MINT.to_string()
        });
        let network = std::env::var("SOLUPI_NETWORK").unwrap_or_else(|_| {
            info!("🪛️ SOLUPI_NETWORK not set, using {DEFAULT_NETWORK}");
            DEFAULT_NETWORK.to_string()
        });
        let rpc_timeout = std::env::var("SOLUPI_RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SOLUPI_RPC_TIMEOUT_SECS value '{s}'. {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RPC_TIMEOUT);
        Self { rpc_url, private_key, usdc_mint, network, rpc_timeout, retry: RetryPolicy::default() }
    }
}
