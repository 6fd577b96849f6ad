use crate::{
    db::traits::{InsertLedgerResult, StoreError},
    db_types::{LedgerEntry, NewLedgerEntry, ReferenceCode},
};

/// The transaction ledger: payments observed in the bank's notification stream.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Inserts the entry, keyed uniquely by its reference code. If an entry with the same reference already exists,
    /// nothing is written and its id is returned as [`InsertLedgerResult::AlreadyExists`].
    async fn store_entry(&self, entry: NewLedgerEntry) -> Result<InsertLedgerResult, StoreError>;

    async fn fetch_entry(&self, id: i64) -> Result<Option<LedgerEntry>, StoreError>;

    async fn fetch_entry_by_reference(&self, reference: &ReferenceCode) -> Result<Option<LedgerEntry>, StoreError>;

    /// Atomically flips `used` from false to true. Returns false if the entry was already used (or does not exist).
    async fn mark_used(&self, id: i64) -> Result<bool, StoreError>;
}
