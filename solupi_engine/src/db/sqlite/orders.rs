use std::time::Duration;

use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{OrderPage, OrderPageQuery},
    },
    db_types::{NewOrder, Order, OrderStatusType, PayoutReceipt, ReferenceCode},
};

/// Inserts a new order into the database using the given connection. New orders always start out `PENDING`.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (user_id, amount, destination_address)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.amount)
    .bind(order.destination_address)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} for {} has been saved in the DB", order.id, order.amount);
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_reference(
    reference: &ReferenceCode,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE reference_code = $1 ORDER BY id DESC LIMIT 1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    user_id: Option<String>,
    statuses: Vec<OrderStatusType>,
}

impl OrderQueryFilter {
    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.statuses.is_empty()
    }

    fn push_where_clause(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if self.is_empty() {
            return;
        }
        builder.push(" WHERE ");
        let mut where_clause = builder.separated(" AND ");
        if let Some(user_id) = &self.user_id {
            where_clause.push("user_id = ");
            where_clause.push_bind_unseparated(user_id.clone());
        }
        if !self.statuses.is_empty() {
            let statuses = self.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
            where_clause.push(format!("status IN ({statuses})"));
        }
    }
}

impl From<&OrderPageQuery> for OrderQueryFilter {
    fn from(query: &OrderPageQuery) -> Self {
        let filter = OrderQueryFilter::default().with_user_id(query.user_id.clone());
        match query.status {
            Some(status) => filter.with_status(status),
            None => filter,
        }
    }
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`, newest first.
pub async fn fetch_orders(
    filter: &OrderQueryFilter,
    limit: Option<(i64, i64)>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    filter.push_where_clause(&mut builder);
    builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some((limit, offset)) = limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_orders: {:?}", orders.len());
    Ok(orders)
}

pub async fn count_orders(filter: &OrderQueryFilter, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    filter.push_where_clause(&mut builder);
    let count = builder.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}

pub async fn fetch_orders_for_user(
    query: &OrderPageQuery,
    conn: &mut SqliteConnection,
) -> Result<OrderPage, SqliteDatabaseError> {
    let filter = OrderQueryFilter::from(query);
    let total = count_orders(&filter, &mut *conn).await?;
    let orders = fetch_orders(&filter, Some((i64::from(query.limit), query.offset())), conn).await?;
    Ok(OrderPage::new(orders, total, query))
}

/// Sets the payment reference on a payable order. A unique index guarantees a reference can only ever be attached to
/// one order. Returns `None` if the order is not payable.
pub async fn attach_reference(
    id: i64,
    reference: &ReferenceCode,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET reference_code = $1, status = 'AWAITING_PAYMENT', updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status IN ('PENDING', 'AWAITING_PAYMENT');
        "#,
    )
    .bind(reference)
    .bind(id)
    .execute(&mut *conn)
    .await;
    match result {
        Ok(r) if r.rows_affected() == 0 => {
            trace!("🗃️ Order #{id} is not payable. Reference {reference} not attached");
            Ok(None)
        },
        Ok(_) => fetch_order_by_id(id, conn).await,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(SqliteDatabaseError::DuplicateReference(reference.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

/// Conditional status update. Returns true only if the order was in one of the `from` states and has been moved to
/// `to`.
pub async fn transition_status(
    id: i64,
    from: &[OrderStatusType],
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    if from.is_empty() {
        return Ok(false);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(to);
    builder.push(", updated_at = CURRENT_TIMESTAMP WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in from {
        statuses.push_bind(*status);
    }
    statuses.push_unseparated(")");
    let result = builder.build().execute(conn).await?;
    let updated = result.rows_affected() == 1;
    trace!("🗃️ Order #{id} status transition to {to}: {}", if updated { "applied" } else { "not applied" });
    Ok(updated)
}

/// Records the payout and marks the order `COMPLETED`. Only a `PROCESSING` order without a transaction id qualifies;
/// `None` is returned otherwise.
pub async fn complete_order(
    id: i64,
    receipt: &PayoutReceipt,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'COMPLETED',
                chain_tx_id = $1,
                recipient_account = $2,
                completed_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'PROCESSING' AND chain_tx_id IS NULL;
        "#,
    )
    .bind(&receipt.signature)
    .bind(&receipt.recipient_account)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        debug!("🗃️ Order #{id} could not be completed. It is not PROCESSING, or already carries a transaction");
        return Ok(None);
    }
    fetch_order_by_id(id, conn).await
}

pub async fn release_processing_orders(
    reference: &ReferenceCode,
    conn: &mut SqliteConnection,
) -> Result<u64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET status = 'PENDING', updated_at = CURRENT_TIMESTAMP
            WHERE reference_code = $1 AND status = 'PROCESSING';
        "#,
    )
    .bind(reference)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_stale_orders(
    status: OrderStatusType,
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let modifier = format!("-{} seconds", older_than.as_secs());
    let orders = sqlx::query_as::<_, Order>(
        r#"
            SELECT * FROM orders
            WHERE status = $1 AND datetime(updated_at) <= datetime('now', $2)
            ORDER BY updated_at ASC;
        "#,
    )
    .bind(status)
    .bind(modifier)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
