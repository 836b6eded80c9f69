use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub event_id: i64,
    pub author_id: i64,
    pub text: String,
    pub location: Option<String>,
    pub parent_comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A comment joined with its author's profile and its reply count, the
/// shape the thread listing renders.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub event_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub author_color: String,
    pub text: String,
    pub location: Option<String>,
    pub parent_comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub reply_count: i64,
}

const VIEW_QUERY: &str = "SELECT c.id, c.event_id, c.author_id, u.name AS author_name, \
                          u.profile_color AS author_color, c.text, c.location, \
                          c.parent_comment_id, c.created_at, COUNT(r.id) AS reply_count \
                          FROM comments c \
                          INNER JOIN users u ON u.id = c.author_id \
                          LEFT JOIN comments r ON r.parent_comment_id = c.id";

pub async fn create_comment(
    pool: &DbPool,
    id: i64,
    event_id: i64,
    author_id: i64,
    text: &str,
    location: Option<&str>,
    parent_comment_id: Option<i64>,
) -> Result<CommentRow, DbError> {
    let row = sqlx::query_as::<_, CommentRow>(
        "INSERT INTO comments (id, event_id, author_id, text, location, parent_comment_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING id, event_id, author_id, text, location, parent_comment_id, created_at",
    )
    .bind(id)
    .bind(event_id)
    .bind(author_id)
    .bind(text)
    .bind(location)
    .bind(parent_comment_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_comment(pool: &DbPool, id: i64) -> Result<Option<CommentRow>, DbError> {
    let row = sqlx::query_as::<_, CommentRow>(
        "SELECT id, event_id, author_id, text, location, parent_comment_id, created_at
         FROM comments WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_comment_view(pool: &DbPool, id: i64) -> Result<Option<CommentView>, DbError> {
    let row = sqlx::query_as::<_, CommentView>(&format!(
        "{VIEW_QUERY} WHERE c.id = ?1 GROUP BY c.id",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Top-level comments for an event, oldest first, reply counts aggregated
/// in the same query.
pub async fn list_top_level(pool: &DbPool, event_id: i64) -> Result<Vec<CommentView>, DbError> {
    let rows = sqlx::query_as::<_, CommentView>(&format!(
        "{VIEW_QUERY} WHERE c.event_id = ?1 AND c.parent_comment_id IS NULL
         GROUP BY c.id ORDER BY datetime(c.created_at) ASC, c.id ASC",
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_replies(pool: &DbPool, parent_id: i64) -> Result<Vec<CommentView>, DbError> {
    let rows = sqlx::query_as::<_, CommentView>(&format!(
        "{VIEW_QUERY} WHERE c.parent_comment_id = ?1
         GROUP BY c.id ORDER BY datetime(c.created_at) ASC, c.id ASC",
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use soiree_models::EventKind;

    async fn test_pool() -> DbPool {
        let pool = crate::create_pool("sqlite::memory:", 1).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn setup_event(pool: &DbPool) -> (i64, i64) {
        crate::users::create_user(pool, 1, "Owner", "owner@example.com", "h")
            .await
            .unwrap();
        let start = Utc::now() + Duration::hours(1);
        crate::events::create_event(
            pool,
            100,
            1,
            "Dinner",
            None,
            start,
            start + Duration::hours(2),
            "#1890ff",
            EventKind::Quick,
            None,
            None,
            &[],
        )
        .await
        .unwrap();
        (1, 100)
    }

    #[tokio::test]
    async fn test_create_top_level_comment() {
        let pool = test_pool().await;
        let (author, event) = setup_event(&pool).await;
        let comment = create_comment(&pool, 200, event, author, "hello", None, None)
            .await
            .unwrap();
        assert_eq!(comment.text, "hello");
        assert!(comment.parent_comment_id.is_none());
    }

    #[tokio::test]
    async fn test_top_level_listing_counts_replies() {
        let pool = test_pool().await;
        let (author, event) = setup_event(&pool).await;
        create_comment(&pool, 200, event, author, "first", None, None)
            .await
            .unwrap();
        create_comment(&pool, 201, event, author, "reply", None, Some(200))
            .await
            .unwrap();
        create_comment(&pool, 202, event, author, "second", Some("Shibuya"), None)
            .await
            .unwrap();

        let top = list_top_level(&pool, event).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, 200);
        assert_eq!(top[0].reply_count, 1);
        assert_eq!(top[0].author_name, "Owner");
        assert_eq!(top[1].id, 202);
        assert_eq!(top[1].reply_count, 0);
        assert_eq!(top[1].location.as_deref(), Some("Shibuya"));
    }

    #[tokio::test]
    async fn test_list_replies_excludes_other_threads() {
        let pool = test_pool().await;
        let (author, event) = setup_event(&pool).await;
        create_comment(&pool, 200, event, author, "first", None, None)
            .await
            .unwrap();
        create_comment(&pool, 201, event, author, "other", None, None)
            .await
            .unwrap();
        create_comment(&pool, 202, event, author, "reply to first", None, Some(200))
            .await
            .unwrap();

        let replies = list_replies(&pool, 200).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, 202);
        assert_eq!(replies[0].parent_comment_id, Some(200));
        assert!(list_replies(&pool, 201).await.unwrap().is_empty());
    }
}
