//! Payment intake state machine.
//!
//! Three independent entry points (customer proof upload, staff confirmation, and the provider webhook) converge on
//! the same payment/order transition and the same notification path, so manual and automated payment flows cannot
//! diverge. Payment states only ever move from `pending` to `paid`; orders follow (`pending_payment` on evidence,
//! `paid` on confirmation) and never regress once paid.
use std::{fmt::Debug, sync::OnceLock};

use dukkan_common::Money;
use log::*;
use regex::Regex;
use serde_json::{json, Value};

use crate::{
    api::notifier::Notifier,
    db_types::{NewNotification, NewPayment, Order, Payment, PaymentMethod, PaymentStatus},
    traits::{LedgerError, LedgerStore, NotificationStore, PaymentUpsert, PushTokenStore},
};

/// Extracts the order id from a provider reference of the form `ORDER-<id>`.
pub fn parse_order_reference(reference: &str) -> Result<i64, LedgerError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^ORDER-(\d+)$").expect("hard-coded regex is valid"));
    re.captures(reference)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .ok_or_else(|| LedgerError::InvalidReference(reference.to_string()))
}

pub struct PaymentIntakeApi<B> {
    db: B,
    notifier: Notifier<B>,
}

impl<B> Debug for PaymentIntakeApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentIntakeApi")
    }
}

impl<B> PaymentIntakeApi<B> {
    pub fn new(db: B, notifier: Notifier<B>) -> Self {
        Self { db, notifier }
    }
}

impl<B> PaymentIntakeApi<B>
where B: LedgerStore + NotificationStore + PushTokenStore + Send + Sync + 'static
{
    pub async fn order(&self, order_id: i64) -> Result<Order, LedgerError> {
        self.db.fetch_order(order_id).await?.ok_or(LedgerError::OrderNotFound(order_id))
    }

    /// Customer-initiated entry point: proof of an out-of-band payment. Records a pending payment (defaulting the
    /// amount to the order total), moves the order to `pending_payment` and fans out a `payment_proof_uploaded`
    /// notification.
    pub async fn submit_proof(
        &self,
        order_id: i64,
        method: PaymentMethod,
        amount: Option<Money>,
        proof_url: Option<String>,
        provider_reference: Option<String>,
    ) -> Result<(Payment, Order), LedgerError> {
        let order = self.order(order_id).await?;
        let amount = amount.unwrap_or(order.total);
        let payment = NewPayment::pending(order_id, method, amount)
            .with_proof_url(proof_url)
            .with_provider_reference(provider_reference);
        let upsert = self.db.insert_payment(payment).await?;
        if upsert.inserted {
            info!("💳️ Proof of payment submitted for order #{order_id} via {method}");
            let note = NewNotification::new(
                "payment_proof_uploaded",
                "Payment proof uploaded",
                format!("Proof of a {method} payment of {amount} was submitted for order #{order_id}"),
            )
            .with_data(correlation(&upsert.order, &upsert.payment));
            self.notifier.notify(note).await?;
        }
        Ok((upsert.payment, upsert.order))
    }

    /// Staff-initiated entry point. Marks the given payment (or the most recent payment for the order) and the
    /// order itself as paid.
    pub async fn confirm(
        &self,
        order_id: i64,
        payment_id: Option<i64>,
        provider_reference: Option<&str>,
    ) -> Result<(Payment, Order), LedgerError> {
        let (payment, order) = self.db.confirm_payment(order_id, payment_id, provider_reference).await?;
        info!("💳️ Payment #{} for order #{order_id} confirmed by staff", payment.id);
        let note = NewNotification::new(
            "payment_confirmed",
            "Payment confirmed",
            format!("Payment of {} for order #{order_id} was confirmed", payment.amount),
        )
        .with_data(correlation(&order, &payment));
        self.notifier.notify(note).await?;
        Ok((payment, order))
    }

    /// Provider-initiated entry point. The signature check happens in the transport layer before this is called.
    ///
    /// Replays carrying a provider reference already on record return the stored payment and trigger no second
    /// notification.
    pub async fn ingest_webhook(
        &self,
        reference: &str,
        status: &str,
        provider_reference: Option<String>,
        amount: Option<Money>,
    ) -> Result<PaymentUpsert, LedgerError> {
        let order_id = parse_order_reference(reference)?;
        let order = self.order(order_id).await?;
        let status =
            if status.eq_ignore_ascii_case("paid") { PaymentStatus::Paid } else { PaymentStatus::Pending };
        let amount = amount.unwrap_or(order.total);
        let payment = NewPayment {
            order_id,
            method: PaymentMethod::Kuraimi,
            amount,
            status,
            provider_reference,
            proof_url: None,
        };
        let upsert = self.db.insert_payment(payment).await?;
        if upsert.inserted {
            info!("💳️ Webhook recorded a {status} payment for order #{order_id}");
            let (kind, title) = match status {
                PaymentStatus::Paid => ("payment_received", "Payment received"),
                PaymentStatus::Pending => ("payment_pending", "Payment pending"),
            };
            let note = NewNotification::new(
                kind,
                title,
                format!("The payment provider reported a {status} payment of {amount} for order #{order_id}"),
            )
            .with_data(correlation(&upsert.order, &upsert.payment));
            self.notifier.notify(note).await?;
        } else {
            debug!("💳️ Webhook replay for order #{order_id} ignored");
        }
        Ok(upsert)
    }
}

/// The opaque payload correlating a notification to the records that triggered it.
fn correlation(order: &Order, payment: &Payment) -> Value {
    let mut data = json!({ "orderId": order.id, "paymentId": payment.id });
    if let Some(user) = &order.user_id {
        data["userId"] = json!(user);
    }
    data
}
