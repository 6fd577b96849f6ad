//! # External collaborators of the settlement engine.
//!
//! The engine never talks to a blockchain, an FX provider or a mail server directly. Instead, it is generic over the
//! traits in this module, and concrete implementations are wired in by the binary (or replaced with stubs in tests).
//!
//! * [`ChainPayout`] executes token transfers to user wallets and checks their confirmation status.
//! * [`RateSource`] supplies the base USD/INR exchange rate used by the price oracle.
//! * [`Mailbox`] supplies raw bank notification emails to the ingestion pipeline.
mod chain_payout;
mod mailbox;
mod rate_source;

pub use chain_payout::{ChainPayout, PayoutError, PreparedTransfer};
pub use mailbox::{Mailbox, MailboxError, RawMessage};
pub use rate_source::{PriceOracleError, RateSource};
