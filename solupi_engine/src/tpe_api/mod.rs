//! # SolUPI settlement engine public API
//!
//! The `tpe_api` module exposes the programmatic API of the settlement engine. The API is modular, so that clients
//! can pick the functionality they need.
//!
//! * [`settlement_api`] matches observed payments to orders and pays them out. Every other API funnels into it.
//! * [`order_flow_api`] is the user-facing order lifecycle: create, attach a payment reference, poll, cancel.
//! * [`ingestion_api`] turns bank notification emails into ledger entries.
//! * [`reconciliation_api`] recovers orders that were left in `PROCESSING` by a crash.
//! * [`price_oracle`] quotes the user-facing USD/INR buy rate.
//!
//! # API usage
//!
//! An API instance is created by supplying a storage backend and a payout rail:
//!
//! ```rust,ignore
//! use solupi_engine::{EventProducers, OrderFlowApi, SettlementApi, SettlementConfig, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let settlement = SettlementApi::new(db, payout, SettlementConfig::default(), EventProducers::default());
//! let api = OrderFlowApi::new(settlement);
//! let order = api.create_order(new_order).await?;
//! ```

pub mod errors;
pub mod exchange_objects;
pub mod exchange_rate_api;
pub mod ingestion_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod price_oracle;
pub mod reconciliation_api;
pub mod settlement_api;
pub mod settlement_objects;
