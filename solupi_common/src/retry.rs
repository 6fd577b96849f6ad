//! Bounded exponential-backoff retry for fallible async operations.
//!
//! Every network-facing call in the payout path goes through [`with_retry`]. The operation is attempted at most
//! [`RetryPolicy::max_attempts`] times; the delay between attempts starts at [`RetryPolicy::initial_delay`] and doubles
//! after every failure. When the final attempt fails, its error is returned unchanged.
use std::{fmt::Display, future::Future, time::Duration};

use log::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), initial_delay }
    }

    /// A policy that never waits. Handy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

pub async fn with_retry<T, E, F, Fut>(label: &str, policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => {
                if attempt > 1 {
                    debug!("🔁️ {label} succeeded on attempt {attempt}/{max_attempts}");
                }
                return Ok(v);
            },
            Err(e) if attempt >= max_attempts => {
                warn!("🔁️ {label} failed after {attempt} attempts. Giving up. {e}");
                return Err(e);
            },
            Err(e) => {
                warn!("🔁️ {label} failed on attempt {attempt}/{max_attempts}. Retrying in {delay:?}. {e}");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            },
        }
    }
}
