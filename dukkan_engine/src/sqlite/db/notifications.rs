use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewNotification, Notification},
    traits::{LedgerError, NotificationPage, NotificationQuery},
};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, LedgerError> {
    let data = serde_json::to_string(&notification.data)
        .map_err(|e| LedgerError::DatabaseError(format!("Could not serialize notification payload: {e}")))?;
    let notification = sqlx::query_as(
        r#"
            INSERT INTO notifications (kind, title, message, data)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(notification.kind)
    .bind(notification.title)
    .bind(notification.message)
    .bind(data)
    .fetch_one(conn)
    .await?;
    Ok(notification)
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, query: &'a NotificationQuery) {
    if !has_filters(query) {
        return;
    }
    builder.push(" WHERE ");
    let mut clause = builder.separated(" AND ");
    if query.unread_only {
        clause.push("is_read = 0");
    }
    if let Some(kind) = &query.kind {
        clause.push("kind = ");
        clause.push_bind_unseparated(kind.as_str());
    }
    if let Some(since) = &query.since {
        clause.push("created_at >= ");
        clause.push_bind_unseparated(since);
    }
    if let Some(user_id) = &query.user_id {
        clause.push("json_extract(data, '$.userId') = ");
        clause.push_bind_unseparated(user_id.as_str());
    }
}

fn has_filters(query: &NotificationQuery) -> bool {
    query.unread_only || query.kind.is_some() || query.since.is_some() || query.user_id.is_some()
}

/// Fetches a page of notifications matching the filter, newest first, plus the total match count.
pub async fn search_notifications(
    query: NotificationQuery,
    conn: &mut SqliteConnection,
) -> Result<NotificationPage, LedgerError> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM notifications");
    push_filters(&mut count_builder, &query);
    let total: (i64,) = count_builder.build_query_as().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM notifications");
    push_filters(&mut builder, &query);
    builder.push(" ORDER BY created_at DESC, id DESC");
    builder.push(" LIMIT ");
    builder.push_bind(i64::from(query.limit()));
    builder.push(" OFFSET ");
    builder.push_bind(i64::from(query.offset()));
    trace!("🔔️ Executing query: {}", builder.sql());
    let items = builder.build_query_as::<Notification>().fetch_all(conn).await?;

    Ok(NotificationPage { items, total: total.0, page: query.page(), limit: query.limit() })
}

pub async fn mark_read(id: i64, conn: &mut SqliteConnection) -> Result<bool, LedgerError> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_read(conn: &mut SqliteConnection) -> Result<u64, LedgerError> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE is_read = 0").execute(conn).await?;
    Ok(result.rows_affected())
}
