use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertLedgerResult},
    db_types::{LedgerEntry, NewLedgerEntry, ReferenceCode},
};

/// Inserts the ledger entry unless one with the same reference code exists. Concurrent inserts of the same reference
/// are resolved by the unique constraint: the loser reads back the winner's id.
pub async fn idempotent_insert(
    entry: NewLedgerEntry,
    conn: &mut SqliteConnection,
) -> Result<InsertLedgerResult, SqliteDatabaseError> {
    let result = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO ledger_entries (reference_code, sender, amount, observed_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id;
        "#,
    )
    .bind(&entry.reference_code)
    .bind(&entry.sender)
    .bind(entry.amount)
    .bind(entry.observed_at)
    .fetch_one(&mut *conn)
    .await;
    match result {
        Ok(id) => {
            debug!("🗃️ Ledger entry #{id} for {} ({}) saved", entry.reference_code, entry.amount);
            Ok(InsertLedgerResult::Inserted(id))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let existing = fetch_entry_by_reference(&entry.reference_code, conn).await?.ok_or_else(|| {
                SqliteDatabaseError::QueryError(format!("Ledger entry for {} vanished", entry.reference_code))
            })?;
            trace!("🗃️ Ledger entry for {} already exists as #{}", entry.reference_code, existing.id);
            Ok(InsertLedgerResult::AlreadyExists(existing.id))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_entry_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<LedgerEntry>, SqliteDatabaseError> {
    let entry = sqlx::query_as::<_, LedgerEntry>("SELECT * FROM ledger_entries WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

pub async fn fetch_entry_by_reference(
    reference: &ReferenceCode,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, SqliteDatabaseError> {
    let entry = sqlx::query_as::<_, LedgerEntry>("SELECT * FROM ledger_entries WHERE reference_code = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

pub async fn mark_used(id: i64, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE ledger_entries SET used = TRUE WHERE id = $1 AND used = FALSE")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
