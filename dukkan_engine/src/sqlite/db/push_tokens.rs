use sqlx::SqliteConnection;

use crate::traits::LedgerError;

pub async fn register(subscriber: &str, token: &str, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query("INSERT OR IGNORE INTO push_tokens (subscriber, token) VALUES ($1, $2)")
        .bind(subscriber)
        .bind(token)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn unregister(subscriber: &str, token: &str, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query("DELETE FROM push_tokens WHERE subscriber = $1 AND token = $2")
        .bind(subscriber)
        .bind(token)
        .execute(conn)
        .await?;
    Ok(())
}

/// Tokens for one subscriber, or every registered token when no subscriber is given.
pub async fn fetch_tokens(subscriber: Option<&str>, conn: &mut SqliteConnection) -> Result<Vec<String>, LedgerError> {
    let rows: Vec<(String,)> = match subscriber {
        Some(s) => {
            sqlx::query_as("SELECT token FROM push_tokens WHERE subscriber = $1").bind(s).fetch_all(conn).await?
        },
        None => sqlx::query_as("SELECT DISTINCT token FROM push_tokens").fetch_all(conn).await?,
    };
    Ok(rows.into_iter().map(|(t,)| t).collect())
}
