use dukkan_common::Money;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{db_types::Product, sqlite::db::products, traits::LedgerError, SqliteDatabase};

/// Creates a fresh database at `url` (dropping any leftover from a previous run) and runs the migrations on it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/dukkan_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// Seeds a catalog entry so cart tests have something to add.
pub async fn seed_product(db: &SqliteDatabase, id: i64, name: &str, price: Money) -> Result<Product, LedgerError> {
    let mut tx = db.pool().begin().await?;
    let product = products::upsert_product(id, name, price, &mut tx).await?;
    tx.commit().await?;
    Ok(product)
}
