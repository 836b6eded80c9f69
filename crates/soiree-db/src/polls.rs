use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PollRow {
    pub id: i64,
    pub event_id: i64,
    pub author_id: i64,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PollOptionRow {
    pub id: i64,
    pub poll_id: i64,
    pub text: String,
    pub position: i64,
}

/// Profile slice attached to each vote in the poll view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoterRow {
    pub id: i64,
    pub name: String,
    pub profile_color: String,
}

/// Two-phase create: the bare poll first, then each option referencing it,
/// one transaction so no half-built poll is ever observable.
pub async fn create_poll(
    pool: &DbPool,
    id: i64,
    event_id: i64,
    author_id: i64,
    question: &str,
    options: &[(i64, &str)],
) -> Result<PollRow, DbError> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query_as::<_, PollRow>(
        "INSERT INTO polls (id, event_id, author_id, question)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, event_id, author_id, question, created_at",
    )
    .bind(id)
    .bind(event_id)
    .bind(author_id)
    .bind(question)
    .fetch_one(&mut *tx)
    .await?;

    for (position, (option_id, text)) in options.iter().enumerate() {
        sqlx::query("INSERT INTO poll_options (id, poll_id, text, position) VALUES (?1, ?2, ?3, ?4)")
            .bind(option_id)
            .bind(id)
            .bind(text)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(row)
}

pub async fn get_poll(pool: &DbPool, id: i64) -> Result<Option<PollRow>, DbError> {
    let row = sqlx::query_as::<_, PollRow>(
        "SELECT id, event_id, author_id, question, created_at FROM polls WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_option(pool: &DbPool, id: i64) -> Result<Option<PollOptionRow>, DbError> {
    let row = sqlx::query_as::<_, PollOptionRow>(
        "SELECT id, poll_id, text, position FROM poll_options WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_event_polls(pool: &DbPool, event_id: i64) -> Result<Vec<PollRow>, DbError> {
    let rows = sqlx::query_as::<_, PollRow>(
        "SELECT id, event_id, author_id, question, created_at
         FROM polls WHERE event_id = ?1
         ORDER BY datetime(created_at) ASC, id ASC",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_options(pool: &DbPool, poll_id: i64) -> Result<Vec<PollOptionRow>, DbError> {
    let rows = sqlx::query_as::<_, PollOptionRow>(
        "SELECT id, poll_id, text, position FROM poll_options WHERE poll_id = ?1 ORDER BY position, id",
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_voters(pool: &DbPool, option_id: i64) -> Result<Vec<VoterRow>, DbError> {
    let rows = sqlx::query_as::<_, VoterRow>(
        "SELECT u.id, u.name, u.profile_color
         FROM poll_votes v
         INNER JOIN users u ON u.id = v.user_id
         WHERE v.option_id = ?1
         ORDER BY u.name",
    )
    .bind(option_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn add_option(
    pool: &DbPool,
    id: i64,
    poll_id: i64,
    text: &str,
) -> Result<PollOptionRow, DbError> {
    let row = sqlx::query_as::<_, PollOptionRow>(
        "INSERT INTO poll_options (id, poll_id, text, position)
         SELECT ?1, ?2, ?3, COALESCE(MAX(position) + 1, 0) FROM poll_options WHERE poll_id = ?2
         RETURNING id, poll_id, text, position",
    )
    .bind(id)
    .bind(poll_id)
    .bind(text)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Checkbox vote toggle: removes the caller's vote when present, records it
/// otherwise. Returns `true` when the call ended with the vote present.
pub async fn toggle_vote(pool: &DbPool, option_id: i64, user_id: i64) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;
    let removed = sqlx::query("DELETE FROM poll_votes WHERE option_id = ?1 AND user_id = ?2")
        .bind(option_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let voted = if removed == 0 {
        sqlx::query("INSERT INTO poll_votes (option_id, user_id) VALUES (?1, ?2)")
            .bind(option_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        true
    } else {
        false
    };
    tx.commit().await?;
    Ok(voted)
}

/// Delete a poll: votes, then options, then the poll itself.
pub async fn delete_poll(pool: &DbPool, poll_id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "DELETE FROM poll_votes WHERE option_id IN (SELECT id FROM poll_options WHERE poll_id = ?1)",
    )
    .bind(poll_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM poll_options WHERE poll_id = ?1")
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM polls WHERE id = ?1")
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn delete_option(pool: &DbPool, option_id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM poll_votes WHERE option_id = ?1")
        .bind(option_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM poll_options WHERE id = ?1")
        .bind(option_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Clear every option's vote list in one statement.
pub async fn reset_votes(pool: &DbPool, poll_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "DELETE FROM poll_votes WHERE option_id IN (SELECT id FROM poll_options WHERE poll_id = ?1)",
    )
    .bind(poll_id)
    .execute(pool)
    .await?;
    Ok(())
}
