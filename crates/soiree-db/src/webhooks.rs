use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

pub async fn create_webhook(
    pool: &DbPool,
    id: i64,
    owner_id: i64,
    name: &str,
    url: &str,
) -> Result<WebhookRow, DbError> {
    let row = sqlx::query_as::<_, WebhookRow>(
        "INSERT INTO webhooks (id, owner_id, name, url)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, owner_id, name, url, created_at",
    )
    .bind(id)
    .bind(owner_id)
    .bind(name)
    .bind(url)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_webhook(pool: &DbPool, id: i64) -> Result<Option<WebhookRow>, DbError> {
    let row = sqlx::query_as::<_, WebhookRow>(
        "SELECT id, owner_id, name, url, created_at FROM webhooks WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_owned_webhooks(pool: &DbPool, owner_id: i64) -> Result<Vec<WebhookRow>, DbError> {
    let rows = sqlx::query_as::<_, WebhookRow>(
        "SELECT id, owner_id, name, url, created_at
         FROM webhooks WHERE owner_id = ?1
         ORDER BY datetime(created_at) ASC, id ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete_webhook(pool: &DbPool, id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM webhooks WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
