use crate::{normalize_email, DbError, DbPool};
use chrono::{DateTime, Utc};
use soiree_models::PublicProfile;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_color: String,
    pub line_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Same as [`UserRow`] plus the password hash; only loaded on auth paths.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAuthRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_color: String,
    pub line_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn create_user(
    pool: &DbPool,
    id: i64,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRow, DbError> {
    let normalized_email = normalize_email(email);
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, name, email, password_hash)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, name, email, profile_color, line_user_id, created_at",
    )
    .bind(id)
    .bind(name)
    .bind(normalized_email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, name, email, profile_color, line_user_id, created_at
         FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_email(pool: &DbPool, email: &str) -> Result<Option<UserAuthRow>, DbError> {
    let normalized_email = normalize_email(email);
    let row = sqlx::query_as::<_, UserAuthRow>(
        "SELECT id, name, email, password_hash, profile_color, line_user_id, created_at
         FROM users WHERE lower(email) = ?1",
    )
    .bind(normalized_email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_auth_by_id(pool: &DbPool, id: i64) -> Result<Option<UserAuthRow>, DbError> {
    let row = sqlx::query_as::<_, UserAuthRow>(
        "SELECT id, name, email, password_hash, profile_color, line_user_id, created_at
         FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Update display name and profile color. Empty strings keep the old value.
pub async fn update_profile(
    pool: &DbPool,
    id: i64,
    name: Option<&str>,
    profile_color: Option<&str>,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "UPDATE users
         SET name = COALESCE(NULLIF(?2, ''), name),
             profile_color = COALESCE(NULLIF(?3, ''), profile_color),
             updated_at = datetime('now')
         WHERE id = ?1
         RETURNING id, name, email, profile_color, line_user_id, created_at",
    )
    .bind(id)
    .bind(name.unwrap_or(""))
    .bind(profile_color.unwrap_or(""))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update_password_hash(
    pool: &DbPool,
    id: i64,
    password_hash: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE users SET password_hash = ?2, updated_at = datetime('now') WHERE id = ?1",
    )
    .bind(id)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_line_user_id(
    pool: &DbPool,
    id: i64,
    line_user_id: &str,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET line_user_id = ?2, updated_at = datetime('now')
         WHERE id = ?1
         RETURNING id, name, email, profile_color, line_user_id, created_at",
    )
    .bind(id)
    .bind(line_user_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Substring search over name and email, excluding the caller.
pub async fn search_users(
    pool: &DbPool,
    query: &str,
    exclude_id: i64,
) -> Result<Vec<UserRow>, DbError> {
    let pattern = format!("%{}%", query.trim().to_ascii_lowercase());
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, name, email, profile_color, line_user_id, created_at
         FROM users
         WHERE id != ?1 AND (lower(name) LIKE ?2 OR lower(email) LIKE ?2)
         ORDER BY name",
    )
    .bind(exclude_id)
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Best-effort profile resolution for a set of guest emails.
pub async fn profiles_by_emails(
    pool: &DbPool,
    emails: &[String],
) -> Result<Vec<PublicProfile>, DbError> {
    if emails.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new(
        "SELECT id, name, email, profile_color FROM users WHERE lower(email) IN (",
    );
    let mut separated = builder.separated(", ");
    for email in emails {
        separated.push_bind(normalize_email(email));
    }
    separated.push_unseparated(")");

    let rows: Vec<(i64, String, String, String)> =
        builder.build_query_as().fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|(id, name, email, profile_color)| PublicProfile {
            id,
            name,
            email,
            profile_color,
        })
        .collect())
}

/// Distinct LINE user ids for an event's participants: the owner plus every
/// roster email with a linked LINE account.
pub async fn line_ids_for_participants(
    pool: &DbPool,
    owner_id: i64,
    guest_emails: &[String],
) -> Result<Vec<String>, DbError> {
    let mut builder: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new(
        "SELECT DISTINCT line_user_id FROM users
         WHERE line_user_id IS NOT NULL AND (id = ",
    );
    builder.push_bind(owner_id);
    if !guest_emails.is_empty() {
        builder.push(" OR lower(email) IN (");
        let mut separated = builder.separated(", ");
        for email in guest_emails {
            separated.push_bind(normalize_email(email));
        }
        separated.push_unseparated(")");
    }
    builder.push(")");

    let rows: Vec<(String,)> = builder.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DbPool {
        let pool = crate::create_pool("sqlite::memory:", 1).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_user_with_valid_data() {
        let pool = test_pool().await;
        let user = create_user(&pool, 1, "Alice", "Alice@Example.com", "hash")
            .await
            .unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.profile_color, "#1890ff");
        assert!(user.line_user_id.is_none());
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email_fails() {
        let pool = test_pool().await;
        create_user(&pool, 1, "a", "dup@example.com", "h")
            .await
            .unwrap();
        let result = create_user(&pool, 2, "b", "Dup@Example.com", "h").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_user_by_email_is_case_insensitive() {
        let pool = test_pool().await;
        create_user(&pool, 2, "Bob", "Bob@Example.com", "secret_hash")
            .await
            .unwrap();
        let auth = get_user_by_email(&pool, "bob@example.COM")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth.id, 2);
        assert_eq!(auth.password_hash, "secret_hash");
    }

    #[tokio::test]
    async fn test_get_user_by_id_not_found() {
        let pool = test_pool().await;
        assert!(get_user_by_id(&pool, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_keeps_old_values_for_empty_input() {
        let pool = test_pool().await;
        create_user(&pool, 3, "Carol", "carol@example.com", "h")
            .await
            .unwrap();
        let updated = update_profile(&pool, 3, Some(""), Some("#ff0000"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Carol");
        assert_eq!(updated.profile_color, "#ff0000");
    }

    #[tokio::test]
    async fn test_update_password_hash() {
        let pool = test_pool().await;
        create_user(&pool, 4, "Dan", "dan@example.com", "old")
            .await
            .unwrap();
        update_password_hash(&pool, 4, "new").await.unwrap();
        let auth = get_user_auth_by_id(&pool, 4).await.unwrap().unwrap();
        assert_eq!(auth.password_hash, "new");
    }

    #[tokio::test]
    async fn test_set_line_user_id() {
        let pool = test_pool().await;
        create_user(&pool, 5, "Eve", "eve@example.com", "h")
            .await
            .unwrap();
        let updated = set_line_user_id(&pool, 5, "U1234").await.unwrap();
        assert_eq!(updated.line_user_id.as_deref(), Some("U1234"));
    }

    #[tokio::test]
    async fn test_search_users_excludes_caller() {
        let pool = test_pool().await;
        create_user(&pool, 6, "Frank", "frank@example.com", "h")
            .await
            .unwrap();
        create_user(&pool, 7, "Franny", "franny@example.com", "h")
            .await
            .unwrap();
        let found = search_users(&pool, "fran", 7).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 6);
    }

    #[tokio::test]
    async fn test_profiles_by_emails() {
        let pool = test_pool().await;
        create_user(&pool, 8, "Gina", "gina@example.com", "h")
            .await
            .unwrap();
        let profiles = profiles_by_emails(
            &pool,
            &["Gina@Example.com".to_string(), "missing@example.com".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "Gina");
    }

    #[tokio::test]
    async fn test_line_ids_for_participants_dedupes_and_skips_unlinked() {
        let pool = test_pool().await;
        create_user(&pool, 10, "Owner", "owner@example.com", "h")
            .await
            .unwrap();
        create_user(&pool, 11, "Linked", "linked@example.com", "h")
            .await
            .unwrap();
        create_user(&pool, 12, "Unlinked", "unlinked@example.com", "h")
            .await
            .unwrap();
        set_line_user_id(&pool, 10, "Uowner").await.unwrap();
        set_line_user_id(&pool, 11, "Uguest").await.unwrap();

        let mut ids = line_ids_for_participants(
            &pool,
            10,
            &[
                "linked@example.com".to_string(),
                "unlinked@example.com".to_string(),
                "owner@example.com".to_string(),
            ],
        )
        .await
        .unwrap();
        ids.sort();
        assert_eq!(ids, vec!["Uguest".to_string(), "Uowner".to_string()]);
    }
}
