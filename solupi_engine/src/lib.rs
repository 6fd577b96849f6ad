//! SolUPI Settlement Engine
//!
//! The settlement engine lets users buy USDC on Solana by paying in INR over UPI. Bank notification emails are turned
//! into payment facts, matched against pending purchase orders, and settled with an on-chain token transfer, exactly
//! once per matched payment.
//!
//! This library contains the provider-agnostic core of the system. It is divided into:
//! 1. Storage ([`mod@db`]). The storage contracts, and the SQLite backend that implements them. The data types used by
//!    the storage layer are defined in the [`db_types`] module and are public.
//! 2. The public API ([`mod@tpe_api`]): settlement, the order lifecycle, email ingestion, reconciliation and pricing.
//! 3. The collaborator traits ([`mod@traits`]) for the blockchain payout rail, the FX rate source and the mailbox.
//!    Concrete implementations live outside this crate.
//!
//! The engine also publishes events (e.g. when an order is completed) that can be subscribed to via
//! [`events::EventHooks`].
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
mod tpe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    InsertLedgerResult,
    LedgerManagement,
    OrderManagement,
    OrderPage,
    OrderPageQuery,
    PayoutRecords,
    SettlementDatabase,
    StoreError,
};
pub use events::{EventHandlers, EventHooks, EventProducers};
pub use tpe_api::{
    errors::{ErrorKind, IngestionError, OrderFlowError, SettlementError},
    exchange_objects::{ConversionRate, PriceQuote, DEFAULT_INR_PER_USDC},
    exchange_rate_api::ExchangeRateApiSource,
    ingestion_api::{IngestionApi, IngestionOutcome, DEFAULT_SENDER_FILTER},
    order_flow_api::OrderFlowApi,
    order_objects::AttachReferenceResult,
    price_oracle::{PriceOracle, DEFAULT_MARKUP_PERCENT, FALLBACK_RATE},
    reconciliation_api::{ReconciliationApi, ReconciliationResult, DEFAULT_RECONCILE_AFTER},
    settlement_api::SettlementApi,
    settlement_objects::{SettlementConfig, SettlementOutcome, SettlementReport, DEFAULT_PAYMENT_TOLERANCE},
};
