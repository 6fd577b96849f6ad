use std::{env, path::PathBuf, str::FromStr, time::Duration};

use log::*;
use solupi_common::{parse_boolean_flag, Paise, Secret};
use solupi_engine::{
    ConversionRate,
    SettlementConfig,
    DEFAULT_INR_PER_USDC,
    DEFAULT_MARKUP_PERCENT,
    DEFAULT_PAYMENT_TOLERANCE,
    DEFAULT_RECONCILE_AFTER,
    DEFAULT_SENDER_FILTER,
};
use solupi_payout::SolanaConfig;

const DEFAULT_SOLUPI_HOST: &str = "127.0.0.1";
const DEFAULT_SOLUPI_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/solupi_store.db";
const DEFAULT_MAIL_LOOKBACK: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_MAIL_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// INR per USDC, used to size payouts
    pub conversion_rate: ConversionRate,
    /// Payments this much below the order amount still settle the order
    pub payment_tolerance: Paise,
    /// Markup applied to the quoted price on `/api/prices`, in percent
    pub markup_percent: f64,
    pub exchange_rate_api_key: Secret<String>,
    /// Key for the HMAC signature that the mail relay sends with every webhook call
    pub webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked. Only for local testing
    pub webhook_hmac_checks: bool,
    /// Orders that have been PROCESSING for longer than this are reconciled
    pub reconcile_after: Duration,
    pub mail: MailConfig,
    pub solana: SolanaConfig,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    /// The Maildir that bank notifications are delivered to. The mail watcher is disabled if this is not set.
    pub maildir: Option<PathBuf>,
    pub sender_filter: String,
    /// How far back the start-up backfill looks
    pub lookback: Duration,
    pub poll_interval: Duration,
    /// If true, the start-up backfill is skipped
    pub skip_backfill: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            maildir: None,
            sender_filter: DEFAULT_SENDER_FILTER.to_string(),
            lookback: DEFAULT_MAIL_LOOKBACK,
            poll_interval: DEFAULT_MAIL_POLL_INTERVAL,
            skip_backfill: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SOLUPI_HOST.to_string(),
            port: DEFAULT_SOLUPI_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            conversion_rate: ConversionRate::default(),
            payment_tolerance: DEFAULT_PAYMENT_TOLERANCE,
            markup_percent: DEFAULT_MARKUP_PERCENT,
            exchange_rate_api_key: Secret::default(),
            webhook_secret: Secret::default(),
            webhook_hmac_checks: true,
            reconcile_after: DEFAULT_RECONCILE_AFTER,
            mail: MailConfig::default(),
            solana: SolanaConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SOLUPI_HOST").ok().unwrap_or_else(|| DEFAULT_SOLUPI_HOST.into());
        let port = parse_env("SOLUPI_PORT", DEFAULT_SOLUPI_PORT);
        let database_url = env::var("SOLUPI_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SOLUPI_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.into()
        });
        let conversion_rate = env::var("SOLUPI_USD_TO_INR_RATE")
            .ok()
            .and_then(|s| {
                Paise::from_str(&s)
                    .map_err(|e| e.to_string())
                    .and_then(|p| ConversionRate::new(p).map_err(|e| e.to_string()))
                    .map_err(|e| error!("🪛️ {s} is not a valid value for SOLUPI_USD_TO_INR_RATE. {e}"))
                    .ok()
            })
            .unwrap_or_else(|| {
                info!("🪛️ Using the default conversion rate of ₹{DEFAULT_INR_PER_USDC} per USDC");
                ConversionRate::default()
            });
        let payment_tolerance = env::var("SOLUPI_PAYMENT_TOLERANCE")
            .ok()
            .and_then(|s| {
                Paise::from_str(&s)
                    .map_err(|e| error!("🪛️ {s} is not a valid value for SOLUPI_PAYMENT_TOLERANCE. {e}"))
                    .ok()
            })
            .filter(|p| p.value() >= 0)
            .unwrap_or(DEFAULT_PAYMENT_TOLERANCE);
        let markup_percent = parse_env("SOLUPI_MARKUP_PERCENT", DEFAULT_MARKUP_PERCENT);
        let exchange_rate_api_key = Secret::new(env::var("SOLUPI_EXCHANGE_RATE_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SOLUPI_EXCHANGE_RATE_API_KEY is not set. Price quotes will use the fallback rate");
            String::default()
        }));
        let webhook_secret = Secret::new(env::var("SOLUPI_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SOLUPI_WEBHOOK_SECRET is not set. Email webhook calls will be rejected until it is");
            String::default()
        }));
        let webhook_hmac_checks = parse_boolean_flag(env::var("SOLUPI_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !webhook_hmac_checks {
            warn!("🪛️ Webhook signature checks are DISABLED. Anyone can submit payment notifications");
        }
        let reconcile_after = Duration::from_secs(
            60 * parse_env("SOLUPI_RECONCILE_AFTER_MINS", DEFAULT_RECONCILE_AFTER.as_secs() / 60),
        );
        let mail = MailConfig::from_env_or_default();
        let solana = SolanaConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            conversion_rate,
            payment_tolerance,
            markup_percent,
            exchange_rate_api_key,
            webhook_secret,
            webhook_hmac_checks,
            reconcile_after,
            mail,
            solana,
        }
    }

    pub fn settlement_config(&self) -> SettlementConfig {
        SettlementConfig { tolerance: self.payment_tolerance, conversion_rate: self.conversion_rate }
    }
}

impl MailConfig {
    pub fn from_env_or_default() -> Self {
        let maildir = env::var("SOLUPI_MAILDIR").ok().filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        if maildir.is_none() {
            warn!("🪛️ SOLUPI_MAILDIR is not set. Bank notifications will only be received via the webhook");
        }
        let sender_filter = env::var("SOLUPI_MAIL_SENDER_FILTER").unwrap_or_else(|_| DEFAULT_SENDER_FILTER.into());
        let lookback =
            Duration::from_secs(3600 * parse_env("SOLUPI_MAIL_LOOKBACK_HOURS", DEFAULT_MAIL_LOOKBACK.as_secs() / 3600));
        let poll_interval =
            Duration::from_secs(parse_env("SOLUPI_MAIL_POLL_SECS", DEFAULT_MAIL_POLL_INTERVAL.as_secs()).max(1));
        let skip_backfill = parse_boolean_flag(env::var("SOLUPI_SKIP_BACKFILL").ok(), false);
        Self { maildir, sender_filter, lookback, poll_interval, skip_backfill }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8360);
        assert_eq!(config.payment_tolerance, Paise::from_rupees(1));
        assert_eq!(config.conversion_rate.price_per_usdc(), Paise::from_rupees(83));
        assert_eq!(config.reconcile_after, Duration::from_secs(600));
        assert!(config.mail.maildir.is_none());
        assert_eq!(config.mail.sender_filter, "slice");
        assert!(config.webhook_hmac_checks);
        assert!(config.webhook_secret.is_empty());
    }

    #[test]
    fn secrets_are_not_printed() {
        let mut config = ServerConfig::default();
        config.exchange_rate_api_key = Secret::new("fx-key-123".into());
        config.solana.private_key = Secret::new("platform-key-456".into());
        config.webhook_secret = Secret::new("relay-key-789".into());
        let printed = format!("{config:?}");
        assert!(!printed.contains("relay-key-789"));
        assert!(!printed.contains("fx-key-123"));
        assert!(!printed.contains("platform-key-456"));
    }

    #[test]
    fn env_parsing() {
        env::set_var("SOLUPI_TEST_PORT", "9000");
        assert_eq!(parse_env("SOLUPI_TEST_PORT", 8360u16), 9000);
        env::set_var("SOLUPI_TEST_PORT", "ninety");
        assert_eq!(parse_env("SOLUPI_TEST_PORT", 8360u16), 8360);
        env::remove_var("SOLUPI_TEST_PORT");
        assert_eq!(parse_env("SOLUPI_TEST_PORT", 8360u16), 8360);
    }
}
