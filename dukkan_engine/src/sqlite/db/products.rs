use dukkan_common::Money;
use sqlx::SqliteConnection;

use crate::{db_types::Product, traits::LedgerError};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, LedgerError> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Seeds or updates a catalog entry. The catalog is maintained out of band; this exists for bootstrapping and tests.
pub async fn upsert_product(
    product_id: i64,
    name: &str,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<Product, LedgerError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (id, name, price)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name, price = excluded.price
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .bind(name)
    .bind(price)
    .fetch_one(conn)
    .await?;
    Ok(product)
}
