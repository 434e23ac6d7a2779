use chrono::{DateTime, Utc};
use log::{debug, trace};
use meg_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Carrier, DisputeStatus, NewTransaction, Transaction, TransactionStatus},
    traits::EscrowDatabaseError,
};

/// Inserts a new transaction into the database using the given connection.
///
/// A UNIQUE constraint on `payment_intent_id` guarantees at most one local row per processor
/// authorization, so a retried insert surfaces as `DuplicateTransaction` instead of a double
/// booking.
pub async fn insert_transaction(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, EscrowDatabaseError> {
    let b = &tx.breakdown;
    let result = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                buyer_id, seller_id, listing_id,
                sale_price, tax_rate_bps, tax_amount, shipping_cost,
                platform_fee, processor_fee, seller_payout, total_amount,
                payment_intent_id, payment_status,
                ship_to_name, ship_to_line1, ship_to_line2, ship_to_city, ship_to_postal_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *;
        "#,
    )
    .bind(&tx.buyer_id)
    .bind(&tx.seller_id)
    .bind(&tx.listing_id)
    .bind(tx.sale_price)
    .bind(i64::from(b.tax_rate_bps))
    .bind(b.tax_amount)
    .bind(b.shipping_cost)
    .bind(b.platform_fee)
    .bind(b.processor_fee)
    .bind(b.seller_payout)
    .bind(b.total_amount)
    .bind(&tx.payment_intent_id)
    .bind(&tx.payment_status)
    .bind(&tx.ship_to.name)
    .bind(&tx.ship_to.line1)
    .bind(&tx.ship_to.line2)
    .bind(&tx.ship_to.city)
    .bind(&tx.ship_to.postal_code)
    .fetch_all(conn)
    .await;
    match result {
        Ok(mut rows) => {
            let row: Transaction = rows.pop().ok_or(sqlx::Error::RowNotFound)?;
            debug!("🗃️ Transaction #{} inserted for authorization [{}]", row.id, row.payment_intent_id);
            Ok(row)
        },
        Err(e) if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) => {
            Err(EscrowDatabaseError::DuplicateTransaction(tx.payment_intent_id))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_transaction(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_by_payment_intent(
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE payment_intent_id = $1")
        .bind(payment_intent_id)
        .fetch_optional(conn)
        .await
}

/// CAS `Pending → PaymentReceived`. Returns `None` when the row is not in `Pending`, which is how
/// webhook redelivery becomes a no-op.
///
/// Every CAS update in this module drains the RETURNING rows with `fetch_all`. `fetch_optional`
/// hands back the first row before the statement has run to completion, so a read on another pool
/// connection can still see the old row.
pub async fn mark_payment_received(
    payment_intent_id: &str,
    payment_status: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, EscrowDatabaseError> {
    let mut rows: Vec<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'PaymentReceived', payment_status = $2, funds_held = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE payment_intent_id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(payment_intent_id)
    .bind(payment_status)
    .fetch_all(conn)
    .await?;
    Ok(rows.pop())
}

/// Stores the processor's status string verbatim without a lifecycle change.
pub async fn record_payment_status(
    payment_intent_id: &str,
    payment_status: &str,
    conn: &mut SqliteConnection,
) -> Result<(), EscrowDatabaseError> {
    sqlx::query("UPDATE transactions SET payment_status = $2, updated_at = CURRENT_TIMESTAMP WHERE payment_intent_id = $1")
        .bind(payment_intent_id)
        .bind(payment_status)
        .execute(conn)
        .await?;
    Ok(())
}

/// CAS `PaymentReceived → Shipped`.
pub async fn record_shipment(
    id: i64,
    tracking_number: &str,
    carrier: Carrier,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, EscrowDatabaseError> {
    let mut rows: Vec<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'Shipped', tracking_number = $2, carrier = $3,
                shipped_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'PaymentReceived'
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(tracking_number)
    .bind(carrier)
    .fetch_all(conn)
    .await?;
    Ok(rows.pop())
}

/// Candidate set for the delivery reconciliation job. Already-delivered rows are excluded here,
/// which is what makes overlapping runs safe.
pub async fn fetch_shipped_with_tracking(conn: &mut SqliteConnection) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as(
        "SELECT * FROM transactions WHERE status = 'Shipped' AND tracking_number IS NOT NULL ORDER BY shipped_at ASC",
    )
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} shipped transactions with tracking numbers", rows.len());
    Ok(rows)
}

/// CAS `Shipped → Delivered`, stamping the delivery time and the escrow release deadline.
pub async fn mark_delivered(
    id: i64,
    delivered_at: DateTime<Utc>,
    escrow_release_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, EscrowDatabaseError> {
    let mut rows: Vec<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'Delivered', delivered_at = $2, escrow_release_at = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Shipped'
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(delivered_at)
    .bind(escrow_release_at)
    .fetch_all(conn)
    .await?;
    Ok(rows.pop())
}

pub async fn fetch_release_candidates(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM transactions
            WHERE status = 'Delivered'
              AND funds_held = 1
              AND escrow_release_at IS NOT NULL
              AND escrow_release_at <= $1
              AND (dispute_status IS NULL OR dispute_status <> 'Open')
            ORDER BY escrow_release_at ASC;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await
}

/// CAS `Delivered → Completed`. The guard re-checks funds-held and the open-dispute condition so
/// a racing dispute-open and release cannot both succeed.
pub async fn mark_completed(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, EscrowDatabaseError> {
    let mut rows: Vec<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'Completed', funds_held = 0,
                completed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Delivered' AND funds_held = 1
              AND (dispute_status IS NULL OR dispute_status <> 'Open')
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(rows.pop())
}

/// CAS `{Shipped, Delivered} → Disputed`. Funds remain held.
pub async fn open_dispute(
    id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, EscrowDatabaseError> {
    let mut rows: Vec<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'Disputed', dispute_status = 'Open', dispute_reason = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status IN ('Shipped', 'Delivered')
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(reason)
    .fetch_all(conn)
    .await?;
    Ok(rows.pop())
}

/// CAS `Disputed → final_status`, recording the outcome and any refunded amount. The original
/// charge breakdown is never rewritten.
pub async fn resolve_dispute(
    id: i64,
    outcome: DisputeStatus,
    refunded: Option<Money>,
    final_status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, EscrowDatabaseError> {
    let mut rows: Vec<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = $2, dispute_status = $3, refunded_amount = $4, funds_held = 0,
                completed_at = CASE WHEN $2 = 'Completed' THEN CURRENT_TIMESTAMP ELSE completed_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Disputed'
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(final_status)
    .bind(outcome)
    .bind(refunded)
    .fetch_all(conn)
    .await?;
    Ok(rows.pop())
}
