use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use super::{json_column, millis_column, optional_millis_column, to_millis};
use crate::{
    db_types::{AccountId, NewOrder, Order, OrderAnnotation, OrderId, OrderStatusType},
    traits::LedgerError,
};

impl<'r> FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            account_id: row.try_get("account_id")?,
            order_id: row.try_get("order_id")?,
            amount: row.try_get("amount")?,
            plan: row.try_get("plan")?,
            plan_details: json_column(row, "plan_details")?,
            shop_name: row.try_get("shop_name")?,
            status: OrderStatusType::from(status),
            created_at: millis_column(row, "created_at")?,
            last_checked_at: optional_millis_column(row, "last_checked_at")?,
            processed_at: optional_millis_column(row, "processed_at")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

/// Inserts a new order into the database using the given connection, in the `Initiated` state. This is not atomic.
/// You can embed this call inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the
/// connection argument.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let plan_details = serde_json::to_string(&order.plan_details)?;
    let result = sqlx::query(
        r#"
            INSERT INTO orders (account_id, order_id, amount, plan, plan_details, shop_name, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(order.account_id.as_str())
    .bind(order.order_id.as_str())
    .bind(order.amount.as_str())
    .bind(order.plan.as_str())
    .bind(plan_details)
    .bind(order.shop_name.as_str())
    .bind(OrderStatusType::Initiated.as_str())
    .bind(to_millis(order.created_at))
    .execute(conn)
    .await;
    match result {
        Ok(_) => {
            debug!("🗃️ Order {} for account {} saved", order.order_id, order.account_id);
            Ok(())
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerError::OrderAlreadyExists(order.account_id.clone(), order.order_id.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order(
    account_id: &AccountId,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE account_id = $1 AND order_id = $2")
        .bind(account_id.as_str())
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Deletes the live order. Returns `false` if there was nothing to delete.
pub async fn delete_order(
    account_id: &AccountId,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let result = sqlx::query("DELETE FROM orders WHERE account_id = $1 AND order_id = $2")
        .bind(account_id.as_str())
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Writes the fields that are set in the annotation, leaving the others untouched.
///
/// A `ReconcileFailed` order only accepts another `ReconcileFailed` annotation. Anything else leaves it alone and
/// reports `false`, so that a stale read can never clear the review marker.
pub async fn annotate_order(
    account_id: &AccountId,
    order_id: &OrderId,
    annotation: OrderAnnotation,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let OrderAnnotation { status, last_checked_at, processed_at, last_error } = annotation;
    let result = sqlx::query(
        r#"
    UPDATE orders SET
        status = COALESCE($1, status),
        last_checked_at = COALESCE($2, last_checked_at),
        processed_at = COALESCE($3, processed_at),
        last_error = COALESCE($4, last_error)
    WHERE account_id = $5 AND order_id = $6 AND (status <> 'ReconcileFailed' OR $1 = 'ReconcileFailed')
    "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(last_checked_at.map(to_millis))
    .bind(processed_at.map(to_millis))
    .bind(last_error)
    .bind(account_id.as_str())
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    let updated = result.rows_affected() == 1;
    trace!("🗃️ Annotation of order {order_id} for {account_id}: updated={updated}");
    Ok(updated)
}

/// Moves an order that is waiting for review back to `Pending`. Returns `false` if the order is not live or is not
/// waiting for review any more.
pub async fn release_order(
    account_id: &AccountId,
    order_id: &OrderId,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
    UPDATE orders SET status = 'Pending', last_error = $1
    WHERE account_id = $2 AND order_id = $3 AND status IN ('ReconcileFailed', 'Unhandled')
    "#,
    )
    .bind(note)
    .bind(account_id.as_str())
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    let released = result.rows_affected() == 1;
    trace!("🗃️ Release of order {order_id} for {account_id}: released={released}");
    Ok(released)
}

fn push_status_filter(builder: &mut QueryBuilder<'_, Sqlite>, statuses: &[OrderStatusType]) {
    builder.push("status IN (");
    let mut list = builder.separated(", ");
    for status in statuses {
        list.push_bind(status.as_str());
    }
    list.push_unseparated(")");
}

/// Fetches orders with any of the given statuses that were created strictly before `before`, oldest first.
pub async fn fetch_orders_created_before(
    statuses: &[OrderStatusType],
    before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, LedgerError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE ");
    push_status_filter(&mut builder, statuses);
    builder.push(" AND created_at < ");
    builder.push_bind(to_millis(before));
    builder.push(" ORDER BY created_at ASC");
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

pub async fn fetch_orders_with_status(
    statuses: &[OrderStatusType],
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, LedgerError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE ");
    push_status_filter(&mut builder, statuses);
    builder.push(" ORDER BY created_at ASC");
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

pub async fn fetch_orders_for_account(
    account_id: &AccountId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, LedgerError> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE account_id = $1 ORDER BY created_at DESC")
        .bind(account_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(orders)
}
