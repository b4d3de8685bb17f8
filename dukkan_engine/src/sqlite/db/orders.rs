use dukkan_common::Money;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderItem, OrderStatus},
    traits::LedgerError,
};

/// Returns the user's cart, creating one if none exists. The `INSERT OR IGNORE` races on the partial unique index
/// `one_cart_per_user`, so concurrent callers converge on a single cart row.
pub async fn ensure_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    sqlx::query("INSERT OR IGNORE INTO orders (user_id, status, total) VALUES ($1, 'cart', 0)")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let cart = fetch_cart(user_id, conn).await?.ok_or_else(|| {
        LedgerError::DatabaseError(format!("Cart for user {user_id} missing immediately after upsert"))
    })?;
    trace!("📝️ Cart #{} resolved for user {user_id}", cart.id);
    Ok(cart)
}

pub async fn fetch_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND status = 'cart'")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// All non-cart orders for the user, newest first.
pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, LedgerError> {
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND status <> 'cart' ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(orders)
}

pub async fn insert_order(
    user_id: Option<&str>,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let order: Order = sqlx::query_as("INSERT INTO orders (user_id, status, total) VALUES ($1, $2, 0) RETURNING *")
        .bind(user_id)
        .bind(status)
        .fetch_one(conn)
        .await?;
    debug!("📝️ Order #{} created with status {status}", order.id);
    Ok(order)
}

pub async fn set_order_status(
    order_id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let order = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(LedgerError::OrderNotFound(order_id))?;
    debug!("📝️ Order #{order_id} moved to status {status}");
    Ok(order)
}

/// Recomputes the order total as Σ price × quantity over the current item set. This is the single source of truth for
/// `Order::total`; call it inside the same transaction as any item mutation.
pub async fn recompute_total(order_id: i64, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let order: Order = sqlx::query_as(
        r#"
            UPDATE orders
            SET total      = COALESCE((SELECT SUM(price * quantity) FROM order_items WHERE order_id = $1), 0),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(LedgerError::OrderNotFound(order_id))?;
    trace!("📝️ Order #{order_id} total recomputed to {}", order.total);
    Ok(order)
}

/// Adds quantity of a product to the order, creating the item row or incrementing the existing one. A repeat add also
/// refreshes the price snapshot to the current product price.
pub async fn upsert_item(
    order_id: i64,
    product_id: i64,
    quantity: i64,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, LedgerError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id, product_id)
                DO UPDATE SET quantity = quantity + excluded.quantity, price = excluded.price
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

/// Decrements the item's quantity, deleting the row when it would drop to zero or below. Returns `ItemNotFound` if
/// the order has no item for the product.
pub async fn decrement_item(
    order_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let item: Option<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 AND product_id = $2")
            .bind(order_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;
    let item = item.ok_or(LedgerError::ItemNotFound { order_id, product_id })?;
    let remaining = item.quantity - quantity;
    if remaining > 0 {
        sqlx::query("UPDATE order_items SET quantity = $1 WHERE id = $2")
            .bind(remaining)
            .bind(item.id)
            .execute(conn)
            .await?;
        trace!("📝️ Item for product {product_id} on order #{order_id} decremented to {remaining}");
    } else {
        sqlx::query("DELETE FROM order_items WHERE id = $1").bind(item.id).execute(conn).await?;
        trace!("📝️ Item for product {product_id} removed from order #{order_id}");
    }
    Ok(())
}

pub async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, LedgerError> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn count_items(order_id: i64, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(conn)
        .await?;
    Ok(count.0)
}
