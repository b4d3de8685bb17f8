use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{DirectOrderRequest, Order, OrderItem, Product},
    traits::{LedgerError, LedgerStore, ProductCatalog},
};

/// `OrderLedgerApi` is the primary API for cart mutations and checkout.
///
/// Quantity validation and product-price resolution happen here; the atomicity guarantees (one cart per user, total
/// always matching the item set) are the backend's contract.
pub struct OrderLedgerApi<B> {
    db: B,
}

impl<B> Debug for OrderLedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLedgerApi")
    }
}

impl<B> OrderLedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderLedgerApi<B>
where B: LedgerStore + ProductCatalog
{
    /// The user's cart, created with a zero total if none exists yet.
    pub async fn cart(&self, user_id: &str) -> Result<Order, LedgerError> {
        self.db.get_or_create_cart(user_id).await
    }

    /// Adds `quantity` of the product to the user's cart, snapshotting the current catalog price. A repeat add
    /// increments the existing line and refreshes its snapshot.
    pub async fn add_item(&self, user_id: &str, product_id: i64, quantity: i64) -> Result<Order, LedgerError> {
        check_quantity(quantity)?;
        let product =
            self.db.fetch_product(product_id).await?.ok_or(LedgerError::ProductNotFound(product_id))?;
        let order = self.db.add_item_to_cart(user_id, product_id, quantity, product.price).await?;
        debug!("🛒️ User {user_id} added {quantity} x {} (cart total now {})", product.name, order.total);
        Ok(order)
    }

    pub async fn remove_item(&self, user_id: &str, product_id: i64, quantity: i64) -> Result<Order, LedgerError> {
        check_quantity(quantity)?;
        self.db.remove_item_from_cart(user_id, product_id, quantity).await
    }

    /// Transitions the user's cart to `pending_payment`. The cart must contain at least one item.
    pub async fn checkout(&self, user_id: &str) -> Result<Order, LedgerError> {
        let order = self.db.checkout_cart(user_id).await?;
        info!("🛒️ User {user_id} checked out order #{} at {}", order.id, order.total);
        Ok(order)
    }

    /// Builds an order and its items in one call, without a prior cart. The client-supplied total, if any, is
    /// ignored: every line is re-priced against the catalog and the total recomputed from those snapshots.
    pub async fn create_direct(&self, request: DirectOrderRequest) -> Result<Order, LedgerError> {
        if request.items.is_empty() {
            return Err(LedgerError::EmptyOrderRequest);
        }
        let mut lines: Vec<(Product, i64)> = Vec::with_capacity(request.items.len());
        for item in &request.items {
            check_quantity(item.quantity)?;
            let product = self
                .db
                .fetch_product(item.product_id)
                .await?
                .ok_or(LedgerError::ProductNotFound(item.product_id))?;
            lines.push((product, item.quantity));
        }
        self.db.insert_direct_order(request.user_id.as_deref(), &lines, request.status).await
    }

    /// All non-cart orders for the user, most recent first.
    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LedgerError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn order_with_items(&self, order_id: i64) -> Result<(Order, Vec<OrderItem>), LedgerError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(LedgerError::OrderNotFound(order_id))?;
        let items = self.db.fetch_order_items(order_id).await?;
        Ok((order, items))
    }
}

fn check_quantity(quantity: i64) -> Result<(), LedgerError> {
    if quantity < 1 {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    Ok(())
}
