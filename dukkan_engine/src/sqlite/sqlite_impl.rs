//! `SqliteDatabase` is a concrete implementation of the Dukkan storage backend.
//!
//! Unsurprisingly, it uses SQLite and implements all the traits defined in the [`crate::traits`] module. Every
//! mutation that touches an order's item set and its total runs inside a single transaction, so the total can never
//! drift from the items, and SQLite's single-writer model serializes concurrent mutations of the same order.
use std::fmt::Debug;

use dukkan_common::Money;
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, notifications, orders, payments, products, push_tokens};
use crate::{
    db_types::{
        NewNotification,
        NewPayment,
        Notification,
        Order,
        OrderItem,
        OrderStatus,
        Payment,
        PaymentStatus,
        Product,
    },
    traits::{
        LedgerError,
        LedgerStore,
        NotificationPage,
        NotificationQuery,
        NotificationStore,
        PaymentUpsert,
        ProductCatalog,
        PushTokenStore,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating the file if it does not exist yet.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the embedded schema migrations. Call once at startup.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::DatabaseError(format!("Migration failure: {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// The order status that should follow from recording a payment with the given status. Paid orders never regress.
    fn next_order_status(order: &Order, payment_status: PaymentStatus) -> Option<OrderStatus> {
        match payment_status {
            PaymentStatus::Paid if order.status != OrderStatus::Paid => Some(OrderStatus::Paid),
            PaymentStatus::Paid => None,
            PaymentStatus::Pending => match order.status {
                OrderStatus::Cart | OrderStatus::Pending => Some(OrderStatus::PendingPayment),
                _ => None,
            },
        }
    }
}

impl LedgerStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn get_or_create_cart(&self, user_id: &str) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let cart = orders::ensure_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn add_item_to_cart(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
        price: Money,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let cart = orders::ensure_cart(user_id, &mut tx).await?;
        orders::upsert_item(cart.id, product_id, quantity, price, &mut tx).await?;
        let cart = orders::recompute_total(cart.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {quantity} x product {product_id} added to cart #{} (total {})", cart.id, cart.total);
        Ok(cart)
    }

    async fn remove_item_from_cart(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let cart =
            orders::fetch_cart(user_id, &mut tx).await?.ok_or_else(|| LedgerError::CartNotFound(user_id.into()))?;
        orders::decrement_item(cart.id, product_id, quantity, &mut tx).await?;
        let cart = orders::recompute_total(cart.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {quantity} x product {product_id} removed from cart #{} (total {})", cart.id, cart.total);
        Ok(cart)
    }

    async fn checkout_cart(&self, user_id: &str) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let cart =
            orders::fetch_cart(user_id, &mut tx).await?.ok_or_else(|| LedgerError::CartNotFound(user_id.into()))?;
        if orders::count_items(cart.id, &mut tx).await? == 0 {
            // Returning before the commit rolls the transaction back, so an empty checkout leaves no state change.
            return Err(LedgerError::EmptyCart(cart.id));
        }
        orders::recompute_total(cart.id, &mut tx).await?;
        let order = orders::set_order_status(cart.id, OrderStatus::PendingPayment, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Cart #{} checked out at {} for user {user_id}", order.id, order.total);
        Ok(order)
    }

    async fn insert_direct_order(
        &self,
        user_id: Option<&str>,
        items: &[(Product, i64)],
        status: Option<OrderStatus>,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(user_id, status.unwrap_or(OrderStatus::Pending), &mut tx).await?;
        for (product, quantity) in items {
            orders::upsert_item(order.id, product.id, *quantity, product.price, &mut tx).await?;
        }
        let order = orders::recompute_total(order.id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Direct order #{} created with {} lines (total {})", order.id, items.len(), order.total);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(order_id, &mut conn).await
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_items(order_id, &mut conn).await
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentUpsert, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_id(payment.order_id, &mut tx)
            .await?
            .ok_or(LedgerError::OrderNotFound(payment.order_id))?;
        if let Some(reference) = payment.provider_reference.as_deref() {
            if let Some(existing) = payments::fetch_by_provider_reference(order.id, reference, &mut tx).await? {
                info!("🗃️ Payment with provider reference {reference} already recorded for order #{}", order.id);
                return Ok(PaymentUpsert { payment: existing, order, inserted: false });
            }
        }
        let status = payment.status;
        let payment = payments::insert_payment(payment, &mut tx).await?;
        let order = match Self::next_order_status(&order, status) {
            Some(next) => orders::set_order_status(order.id, next, &mut tx).await?,
            None => order,
        };
        tx.commit().await?;
        Ok(PaymentUpsert { payment, order, inserted: true })
    }

    async fn confirm_payment(
        &self,
        order_id: i64,
        payment_id: Option<i64>,
        provider_reference: Option<&str>,
    ) -> Result<(Payment, Order), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order_by_id(order_id, &mut tx).await?.ok_or(LedgerError::OrderNotFound(order_id))?;
        let payment = match payment_id {
            Some(id) => {
                let p = payments::fetch_payment(id, &mut tx).await?.ok_or(LedgerError::PaymentNotFound(order_id))?;
                if p.order_id != order_id {
                    return Err(LedgerError::PaymentOrderMismatch { payment_id: id, order_id });
                }
                p
            },
            None => payments::latest_for_order(order_id, &mut tx)
                .await?
                .ok_or(LedgerError::PaymentNotFound(order_id))?,
        };
        let mut payment = payments::set_payment_status(payment.id, PaymentStatus::Paid, &mut tx).await?;
        if let Some(reference) = provider_reference {
            payment = payments::set_provider_reference(payment.id, reference, &mut tx).await?;
        }
        let order = match order.status {
            OrderStatus::Paid => order,
            _ => orders::set_order_status(order_id, OrderStatus::Paid, &mut tx).await?,
        };
        tx.commit().await?;
        info!("🗃️ Payment #{} confirmed; order #{order_id} is paid", payment.id);
        Ok((payment, order))
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl ProductCatalog for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }
}

impl NotificationStore for SqliteDatabase {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let notification = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        Ok(notification)
    }

    async fn search_notifications(&self, query: NotificationQuery) -> Result<NotificationPage, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        notifications::search_notifications(query, &mut conn).await
    }

    async fn mark_notification_read(&self, id: i64) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_read(id, &mut conn).await
    }

    async fn mark_all_notifications_read(&self) -> Result<u64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_all_read(&mut conn).await
    }
}

impl PushTokenStore for SqliteDatabase {
    async fn register_push_token(&self, subscriber: &str, token: &str) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        push_tokens::register(subscriber, token, &mut conn).await
    }

    async fn unregister_push_token(&self, subscriber: &str, token: &str) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        push_tokens::unregister(subscriber, token, &mut conn).await
    }

    async fn fetch_push_tokens(&self, subscriber: Option<&str>) -> Result<Vec<String>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        push_tokens::fetch_tokens(subscriber, &mut conn).await
    }
}
