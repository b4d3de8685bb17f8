use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::LedgerError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, LedgerError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, method, amount, status, provider_reference, proof_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.method)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(payment.provider_reference)
    .bind(payment.proof_url)
    .fetch_one(conn)
    .await?;
    debug!("💳️ Payment #{} ({}) recorded for order #{}", payment.id, payment.status, payment.order_id);
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, LedgerError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

/// The most recently created payment for the order.
pub async fn latest_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, LedgerError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Finds an existing payment for the order with the given provider reference. Used to deduplicate webhook replays.
pub async fn fetch_by_provider_reference(
    order_id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, LedgerError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 AND provider_reference = $2")
        .bind(order_id)
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Transitions a payment's status. Transitions are monotonic: a paid payment can never move back to pending.
pub async fn set_payment_status(
    payment_id: i64,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Payment, LedgerError> {
    let current = fetch_payment(payment_id, &mut *conn)
        .await?
        .ok_or(LedgerError::DatabaseError(format!("Payment {payment_id} vanished mid-transaction")))?;
    if current.status == PaymentStatus::Paid && status == PaymentStatus::Pending {
        return Err(LedgerError::PaymentStatusRegression(payment_id));
    }
    if current.status == status {
        return Ok(current);
    }
    let payment = sqlx::query_as("UPDATE payments SET status = $1 WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(payment_id)
        .fetch_one(conn)
        .await?;
    debug!("💳️ Payment #{payment_id} moved to status {status}");
    Ok(payment)
}

pub async fn set_provider_reference(
    payment_id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, LedgerError> {
    let payment = sqlx::query_as("UPDATE payments SET provider_reference = $1 WHERE id = $2 RETURNING *")
        .bind(reference)
        .bind(payment_id)
        .fetch_one(conn)
        .await?;
    Ok(payment)
}
