use dukkan_common::Money;
use thiserror::Error;

use crate::{
    db_types::{NewPayment, Order, OrderItem, Payment, Product},
    traits::PaymentUpsert,
};

/// The highest level of behaviour for backends supporting the order ledger and payment intake.
///
/// Implementations must guarantee that
/// * "find cart or create one" is atomic for a given user, so at most one cart-status order per user can ever exist,
///   even under concurrent first-add calls;
/// * every item mutation and the subsequent total recompute happen inside a single transaction, so `Order::total`
///   never drifts from the item set.
#[allow(async_fn_in_trait)]
pub trait LedgerStore: Clone {
    /// The URL of the backing store.
    fn url(&self) -> &str;

    /// Returns the user's cart-status order, creating one with a zero total if none exists. Must be atomic with
    /// respect to concurrent callers for the same user.
    async fn get_or_create_cart(&self, user_id: &str) -> Result<Order, LedgerError>;

    /// Adds `quantity` of a product to the user's cart at the given price snapshot. If an item for the product already
    /// exists, its quantity is incremented and its price snapshot refreshed. Recomputes and persists the order total
    /// in the same transaction. Creates the cart if the user has none.
    async fn add_item_to_cart(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
        price: Money,
    ) -> Result<Order, LedgerError>;

    /// Removes `quantity` of a product from the user's cart. Deletes the item when the remaining quantity would drop
    /// to zero or below. Recomputes the total in the same transaction.
    async fn remove_item_from_cart(&self, user_id: &str, product_id: i64, quantity: i64) -> Result<Order, LedgerError>;

    /// Recomputes the total and transitions the user's cart to `pending_payment`. Fails on an empty cart, leaving no
    /// state change behind.
    async fn checkout_cart(&self, user_id: &str) -> Result<Order, LedgerError>;

    /// Builds an order and its items in one call, without a prior cart. Item prices are the given snapshots; the
    /// total is recomputed from them, never taken from the client.
    async fn insert_direct_order(
        &self,
        user_id: Option<&str>,
        items: &[(Product, i64)],
        status: Option<crate::db_types::OrderStatus>,
    ) -> Result<Order, LedgerError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, LedgerError>;

    /// All non-cart orders for the user, most recent first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LedgerError>;

    /// Records a payment against an order and advances the order status in the same transaction:
    /// * a `paid` payment marks the order `paid`;
    /// * a `pending` payment moves a cart/pending order to `pending_payment`, and never regresses a paid order.
    ///
    /// When the payment carries a provider reference that already exists for the order, the stored payment is
    /// returned with `inserted == false` and nothing is changed (webhook replay dedup).
    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentUpsert, LedgerError>;

    /// Marks the given payment (or the most recently created payment for the order, when `payment_id` is `None`) as
    /// paid, together with the order. Optionally records a provider reference on the payment.
    async fn confirm_payment(
        &self,
        order_id: i64,
        payment_id: Option<i64>,
        provider_reference: Option<&str>,
    ) -> Result<(Payment, Order), LedgerError>;

    /// Closes the store.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Read access to the product catalog. The catalog itself is maintained elsewhere; the ledger only needs to resolve
/// ids to current prices for snapshotting.
#[allow(async_fn_in_trait)]
pub trait ProductCatalog: Clone {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, LedgerError>;
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("No cart exists for user {0}")]
    CartNotFound(String),
    #[error("Order {order_id} has no item for product {product_id}")]
    ItemNotFound { order_id: i64, product_id: i64 },
    #[error("Cart {0} has no items; nothing to check out")]
    EmptyCart(i64),
    #[error("An order must contain at least one item")]
    EmptyOrderRequest,
    #[error("Quantity must be a positive integer, got {0}")]
    InvalidQuantity(i64),
    #[error("Order {0} has no payment record")]
    PaymentNotFound(i64),
    #[error("Payment {payment_id} does not belong to order {order_id}")]
    PaymentOrderMismatch { payment_id: i64, order_id: i64 },
    #[error("Payment {0} is already paid and cannot move back to pending")]
    PaymentStatusRegression(i64),
    #[error("Payment reference '{0}' is not of the form ORDER-<id>")]
    InvalidReference(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
