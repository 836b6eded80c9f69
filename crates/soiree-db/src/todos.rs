use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TodoRow {
    pub id: i64,
    pub event_id: i64,
    pub author_id: i64,
    pub text: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A task joined with its author's profile for display.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TodoView {
    pub id: i64,
    pub event_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub author_color: String,
    pub text: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

const VIEW_QUERY: &str = "SELECT t.id, t.event_id, t.author_id, u.name AS author_name, \
                          u.profile_color AS author_color, t.text, t.is_completed, t.created_at \
                          FROM todos t INNER JOIN users u ON u.id = t.author_id";

pub async fn create_todo(
    pool: &DbPool,
    id: i64,
    event_id: i64,
    author_id: i64,
    text: &str,
) -> Result<TodoRow, DbError> {
    let row = sqlx::query_as::<_, TodoRow>(
        "INSERT INTO todos (id, event_id, author_id, text)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, event_id, author_id, text, is_completed, created_at",
    )
    .bind(id)
    .bind(event_id)
    .bind(author_id)
    .bind(text)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_todo(pool: &DbPool, id: i64) -> Result<Option<TodoRow>, DbError> {
    let row = sqlx::query_as::<_, TodoRow>(
        "SELECT id, event_id, author_id, text, is_completed, created_at FROM todos WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_todo_view(pool: &DbPool, id: i64) -> Result<Option<TodoView>, DbError> {
    let row = sqlx::query_as::<_, TodoView>(&format!("{VIEW_QUERY} WHERE t.id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list_event_todos(pool: &DbPool, event_id: i64) -> Result<Vec<TodoView>, DbError> {
    let rows = sqlx::query_as::<_, TodoView>(&format!(
        "{VIEW_QUERY} WHERE t.event_id = ?1 ORDER BY datetime(t.created_at) ASC, t.id ASC",
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Unconditional completion flip.
pub async fn toggle_todo(pool: &DbPool, id: i64) -> Result<Option<TodoRow>, DbError> {
    let row = sqlx::query_as::<_, TodoRow>(
        "UPDATE todos SET is_completed = NOT is_completed
         WHERE id = ?1
         RETURNING id, event_id, author_id, text, is_completed, created_at",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_todo(pool: &DbPool, id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM todos WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
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
            EventKind::Project,
            None,
            None,
            &[],
        )
        .await
        .unwrap();
        (1, 100)
    }

    #[tokio::test]
    async fn test_create_todo_starts_incomplete() {
        let pool = test_pool().await;
        let (author, event) = setup_event(&pool).await;
        let todo = create_todo(&pool, 400, event, author, "book a table")
            .await
            .unwrap();
        assert!(!todo.is_completed);
    }

    #[tokio::test]
    async fn test_toggle_flips_both_ways() {
        let pool = test_pool().await;
        let (author, event) = setup_event(&pool).await;
        create_todo(&pool, 400, event, author, "book a table")
            .await
            .unwrap();

        let toggled = toggle_todo(&pool, 400).await.unwrap().unwrap();
        assert!(toggled.is_completed);
        let toggled = toggle_todo(&pool, 400).await.unwrap().unwrap();
        assert!(!toggled.is_completed);
    }

    #[tokio::test]
    async fn test_toggle_missing_todo_is_none() {
        let pool = test_pool().await;
        setup_event(&pool).await;
        assert!(toggle_todo(&pool, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_event_todos_in_creation_order() {
        let pool = test_pool().await;
        let (author, event) = setup_event(&pool).await;
        create_todo(&pool, 400, event, author, "first").await.unwrap();
        create_todo(&pool, 401, event, author, "second").await.unwrap();

        let todos = list_event_todos(&pool, event).await.unwrap();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].text, "first");
        assert_eq!(todos[0].author_name, "Owner");
        assert_eq!(todos[1].text, "second");
    }

    #[tokio::test]
    async fn test_delete_todo() {
        let pool = test_pool().await;
        let (author, event) = setup_event(&pool).await;
        create_todo(&pool, 400, event, author, "gone soon")
            .await
            .unwrap();
        delete_todo(&pool, 400).await.unwrap();
        assert!(get_todo(&pool, 400).await.unwrap().is_none());
    }
}
