use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{MicroUsdc, Order, PayoutAttempt, PayoutReceipt},
};

pub async fn insert_attempt(
    order: &Order,
    amount: MicroUsdc,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let reference = order.reference_code.as_ref().ok_or_else(|| {
        SqliteDatabaseError::QueryError(format!("Order #{} has no reference code to pay out against", order.id))
    })?;
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO payout_attempts (order_id, reference_code, amount) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(order.id)
    .bind(reference)
    .bind(amount)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn mark_signed(
    id: i64,
    signature: &str,
    recipient_account: &str,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE payout_attempts
            SET signature = $1, recipient_account = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'SUBMITTED';
        "#,
    )
    .bind(signature)
    .bind(recipient_account)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::QueryError(format!("Payout attempt #{id} is not awaiting submission")));
    }
    Ok(())
}

pub async fn mark_confirmed(
    id: i64,
    receipt: &PayoutReceipt,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            UPDATE payout_attempts
            SET status = 'CONFIRMED', signature = $1, recipient_account = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3;
        "#,
    )
    .bind(&receipt.signature)
    .bind(&receipt.recipient_account)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_failed(id: i64, reason: &str, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query("UPDATE payout_attempts SET status = 'FAILED', error = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(reason)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_latest_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutAttempt>, SqliteDatabaseError> {
    let attempt = sqlx::query_as::<_, PayoutAttempt>(
        "SELECT * FROM payout_attempts WHERE order_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(attempt)
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PayoutAttempt>, SqliteDatabaseError> {
    let attempts = sqlx::query_as::<_, PayoutAttempt>("SELECT * FROM payout_attempts WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(attempts)
}
