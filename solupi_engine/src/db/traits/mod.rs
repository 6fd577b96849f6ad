//! #  Storage contracts.
//!
//! This module defines the interfaces a storage backend must provide to drive the settlement engine.
//!
//! ## Orders
//! Purchase orders move through an explicit status state machine (see [`crate::db_types::OrderStatusType`]). Every
//! status change goes through a conditional update (compare-and-swap on the current status) so that concurrent
//! callers can never both observe success.
//!
//! ## Ledger
//! The ledger is an append-mostly record of observed bank payments, keyed uniquely by reference code. The only mutable
//! field is the `used` flag, which is set exactly once when the payment is consumed by an order.
//!
//! ## Traits
//! * [`SettlementDatabase`] is the umbrella trait a backend implements to be used by the engine.
//! * [`OrderManagement`] stores and transitions orders.
//! * [`LedgerManagement`] stores and consumes payment facts.
//! * [`PayoutRecords`] keeps the audit trail of on-chain payout attempts.
mod data_objects;
mod ledger_management;
mod order_management;
mod payout_records;
mod settlement_database;

pub use data_objects::{InsertLedgerResult, OrderPage, OrderPageQuery};
pub use ledger_management::LedgerManagement;
pub use order_management::OrderManagement;
pub use payout_records::PayoutRecords;
pub use settlement_database::{SettlementDatabase, StoreError};
