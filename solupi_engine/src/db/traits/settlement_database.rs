use thiserror::Error;

use crate::{
    db::traits::{LedgerManagement, OrderManagement, PayoutRecords},
    db_types::ReferenceCode,
};

/// The umbrella trait for storage backends of the settlement engine.
///
/// Backends are cheap to clone; every clone shares the same underlying connection pool.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + OrderManagement + LedgerManagement + PayoutRecords {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Reference code {0} is already attached to another order")]
    DuplicateReference(ReferenceCode),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
}
