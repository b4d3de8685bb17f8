use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use dukkan_common::Money;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------   OrderStatus     ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// The mutable pre-checkout aggregate of items for a user.
    Cart,
    /// The order has been placed but no payment evidence has been submitted yet.
    Pending,
    /// Checkout is complete, or payment evidence is pending verification.
    PendingPayment,
    /// Payment has been confirmed in full.
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Cart => "cart",
            OrderStatus::Pending => "pending",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "pending" => Ok(Self::Pending),
            "pending_payment" => Ok(Self::PendingPayment),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status in record: {value}. Defaulting to pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------   PaymentMethod   ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Kuraimi,
    Card,
    Cash,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Kuraimi => "kuraimi",
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_transfer" => Ok(Self::BankTransfer),
            "kuraimi" => Ok(Self::Kuraimi),
            "card" => Ok(Self::Card),
            "cash" => Ok(Self::Cash),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------   PaymentStatus   ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------      Order        ------------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: Option<String>,
    pub status: OrderStatus,
    /// Always equals the sum of the item subtotals. Recomputed inside the same transaction as every item mutation.
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    OrderItem      ------------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Snapshot of the product price at add time. Refreshed whenever the same product is added again.
    pub price: Money,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.price * self.quantity
    }
}

//--------------------------------------     Product       ------------------------------------------------------------
/// The slice of the product catalog the ledger needs: a price to snapshot. Catalog CRUD lives elsewhere.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Money,
}

//--------------------------------------     Payment       ------------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    /// External id reported by the payment provider, when there is one. Used to deduplicate webhook replays.
    pub provider_reference: Option<String>,
    /// Locator of customer-submitted payment evidence, when any was uploaded.
    pub proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub order_id: i64,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub proof_url: Option<String>,
}

impl NewPayment {
    pub fn pending(order_id: i64, method: PaymentMethod, amount: Money) -> Self {
        Self { order_id, method, amount, status: PaymentStatus::Pending, provider_reference: None, proof_url: None }
    }

    pub fn with_provider_reference(mut self, reference: Option<String>) -> Self {
        self.provider_reference = reference;
        self
    }

    pub fn with_proof_url(mut self, url: Option<String>) -> Self {
        self.proof_url = url;
        self
    }
}

//--------------------------------------   Notification    ------------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    /// Opaque structured payload correlating the notification to other records, e.g. `{"orderId": 7}`.
    pub data: Json<Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: Value,
}

impl NewNotification {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(kind: S1, title: S2, message: S3) -> Self {
        Self { kind: kind.into(), title: title.into(), message: message.into(), data: Value::Null }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// The user the notification targets, if the payload names one. Absence means "broadcast to everyone".
    pub fn target_user(&self) -> Option<&str> {
        self.data.get("userId").and_then(|v| v.as_str())
    }
}

//--------------------------------------   DirectOrder     ------------------------------------------------------------
/// A client-assembled order, created in one call without a prior cart. Client-supplied totals are not trusted; the
/// total is recomputed from the item lines against current catalog prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectOrderRequest {
    pub user_id: Option<String>,
    pub items: Vec<DirectOrderItem>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_status_round_trip() {
        for s in
            [OrderStatus::Cart, OrderStatus::PendingPayment, OrderStatus::Paid, OrderStatus::Cancelled]
        {
            assert_eq!(s.to_string().parse::<OrderStatus>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(OrderStatus::from("garbage".to_string()), OrderStatus::Pending);
    }

    #[test]
    fn target_user_from_payload() {
        let n = NewNotification::new("order_paid", "Order paid", "Order #1 paid")
            .with_data(serde_json::json!({"orderId": 1, "userId": "u-77"}));
        assert_eq!(n.target_user(), Some("u-77"));
        let broadcast = NewNotification::new("order_paid", "Order paid", "Order #1 paid");
        assert!(broadcast.target_user().is_none());
    }
}
