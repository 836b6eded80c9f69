use crate::{normalize_email, DbError, DbPool};
use chrono::{DateTime, Utc};
use soiree_models::{EventKind, GuestStatus};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub color: String,
    pub event_kind: EventKind,
    pub webhook_id: Option<i64>,
    pub parent_event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GuestRow {
    pub event_id: i64,
    pub email: String,
    pub user_id: Option<i64>,
    pub status: GuestStatus,
}

/// A roster entry about to be written. Produced by the lifecycle functions
/// in soiree-core; emails are already normalized there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub email: String,
    pub user_id: Option<i64>,
    pub status: GuestStatus,
}

const EVENT_COLUMNS: &str = "id, owner_id, title, description, start_time, end_time, color, \
                             event_kind, webhook_id, parent_event_id, created_at, updated_at";

#[allow(clippy::too_many_arguments)]
pub async fn create_event(
    pool: &DbPool,
    id: i64,
    owner_id: i64,
    title: &str,
    description: Option<&str>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    color: &str,
    event_kind: EventKind,
    webhook_id: Option<i64>,
    parent_event_id: Option<i64>,
    roster: &[RosterEntry],
) -> Result<EventRow, DbError> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "INSERT INTO events (id, owner_id, title, description, start_time, end_time, color, event_kind, webhook_id, parent_event_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         RETURNING {EVENT_COLUMNS}",
    ))
    .bind(id)
    .bind(owner_id)
    .bind(title)
    .bind(description)
    .bind(start_time)
    .bind(end_time)
    .bind(color)
    .bind(event_kind)
    .bind(webhook_id)
    .bind(parent_event_id)
    .fetch_one(&mut *tx)
    .await?;

    for guest in roster {
        sqlx::query("INSERT INTO guests (event_id, email, user_id, status) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(&guest.email)
            .bind(guest.user_id)
            .bind(guest.status)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(row)
}

pub async fn get_event(pool: &DbPool, id: i64) -> Result<Option<EventRow>, DbError> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// The event's guest roster in invite order.
pub async fn get_roster(pool: &DbPool, event_id: i64) -> Result<Vec<GuestRow>, DbError> {
    let rows = sqlx::query_as::<_, GuestRow>(
        "SELECT event_id, email, user_id, status FROM guests WHERE event_id = ?1 ORDER BY rowid",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Swap the roster wholesale for the merged result of an event edit.
pub async fn replace_roster(
    pool: &DbPool,
    event_id: i64,
    roster: &[RosterEntry],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM guests WHERE event_id = ?1")
        .bind(event_id)
        .execute(&mut *tx)
        .await?;
    for guest in roster {
        sqlx::query("INSERT INTO guests (event_id, email, user_id, status) VALUES (?1, ?2, ?3, ?4)")
            .bind(event_id)
            .bind(&guest.email)
            .bind(guest.user_id)
            .bind(guest.status)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Overwrite event fields. Absent or empty values keep the stored ones.
#[allow(clippy::too_many_arguments)]
pub async fn update_event(
    pool: &DbPool,
    id: i64,
    title: Option<&str>,
    description: Option<&str>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    color: Option<&str>,
    webhook_id: Option<i64>,
) -> Result<EventRow, DbError> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "UPDATE events
         SET title = COALESCE(NULLIF(?2, ''), title),
             description = COALESCE(NULLIF(?3, ''), description),
             start_time = COALESCE(?4, start_time),
             end_time = COALESCE(?5, end_time),
             color = COALESCE(NULLIF(?6, ''), color),
             webhook_id = COALESCE(?7, webhook_id),
             updated_at = datetime('now')
         WHERE id = ?1
         RETURNING {EVENT_COLUMNS}",
    ))
    .bind(id)
    .bind(title.unwrap_or(""))
    .bind(description.unwrap_or(""))
    .bind(start_time)
    .bind(end_time)
    .bind(color.unwrap_or(""))
    .bind(webhook_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// RSVP transition. Guarded on the current status so a second reply (or a
/// reply without a pending invite) matches no row and returns `None`.
pub async fn rsvp(
    pool: &DbPool,
    event_id: i64,
    email: &str,
    status: GuestStatus,
    user_id: i64,
) -> Result<Option<GuestRow>, DbError> {
    let normalized_email = normalize_email(email);
    let row = sqlx::query_as::<_, GuestRow>(
        "UPDATE guests
         SET status = ?3, user_id = ?4
         WHERE event_id = ?1 AND lower(email) = ?2 AND status = 'pending'
         RETURNING event_id, email, user_id, status",
    )
    .bind(event_id)
    .bind(normalized_email)
    .bind(status)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Guest self-removal: a list splice, not a status transition.
pub async fn remove_guest(pool: &DbPool, event_id: i64, email: &str) -> Result<bool, DbError> {
    let normalized_email = normalize_email(email);
    let result = sqlx::query("DELETE FROM guests WHERE event_id = ?1 AND lower(email) = ?2")
        .bind(event_id)
        .bind(normalized_email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete an event and everything it owns. Children of each poll go before
/// the poll, sub-resources before the event itself; sub-events are detached
/// rather than deleted.
pub async fn delete_event(pool: &DbPool, id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "DELETE FROM poll_votes WHERE option_id IN (
             SELECT o.id FROM poll_options o
             INNER JOIN polls p ON p.id = o.poll_id
             WHERE p.event_id = ?1
         )",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM poll_options WHERE poll_id IN (SELECT id FROM polls WHERE event_id = ?1)")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM polls WHERE event_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM comments WHERE event_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM todos WHERE event_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM guests WHERE event_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE events SET parent_event_id = NULL WHERE parent_event_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM events WHERE id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Events the user owns or has accepted an invite to.
pub async fn list_owned_or_accepted(
    pool: &DbPool,
    user_id: i64,
    email: &str,
) -> Result<Vec<EventRow>, DbError> {
    let normalized_email = normalize_email(email);
    let rows = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE owner_id = ?1
            OR id IN (SELECT event_id FROM guests WHERE lower(email) = ?2 AND status = 'accepted')
         ORDER BY datetime(start_time)",
    ))
    .bind(user_id)
    .bind(normalized_email)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Events where the user still has a pending invitation.
pub async fn list_pending_invites(pool: &DbPool, email: &str) -> Result<Vec<EventRow>, DbError> {
    let normalized_email = normalize_email(email);
    let rows = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE id IN (SELECT event_id FROM guests WHERE lower(email) = ?1 AND status = 'pending')
         ORDER BY datetime(start_time)",
    ))
    .bind(normalized_email)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_pending_invites(pool: &DbPool, email: &str) -> Result<i64, DbError> {
    let normalized_email = normalize_email(email);
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM guests WHERE lower(email) = ?1 AND status = 'pending'",
    )
    .bind(normalized_email)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn list_children(pool: &DbPool, parent_id: i64) -> Result<Vec<EventRow>, DbError> {
    let rows = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE parent_event_id = ?1 ORDER BY datetime(start_time)",
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Ids of events whose end time has passed the retention cutoff.
pub async fn expired_event_ids(
    pool: &DbPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<i64>, DbError> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT id FROM events WHERE datetime(end_time) < datetime(?1)")
            .bind(cutoff)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Remove every event past the retention cutoff via the cascading delete
/// path, so expiry never strands comments, polls, or tasks.
pub async fn purge_expired(pool: &DbPool, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
    let ids = expired_event_ids(pool, cutoff).await?;
    let purged = ids.len() as u64;
    for id in ids {
        delete_event(pool, id).await?;
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_pool() -> DbPool {
        let pool = crate::create_pool("sqlite::memory:", 1).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn setup_owner(pool: &DbPool) -> i64 {
        crate::users::create_user(pool, 1, "Owner", "owner@example.com", "hash")
            .await
            .unwrap();
        1
    }

    fn pending(email: &str) -> RosterEntry {
        RosterEntry {
            email: email.to_string(),
            user_id: None,
            status: GuestStatus::Pending,
        }
    }

    async fn make_event(pool: &DbPool, id: i64, owner_id: i64, roster: &[RosterEntry]) -> EventRow {
        let start = Utc::now() + Duration::hours(1);
        create_event(
            pool,
            id,
            owner_id,
            "Dinner",
            Some("at my place"),
            start,
            start + Duration::hours(2),
            "#1890ff",
            EventKind::Quick,
            None,
            None,
            roster,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_event_persists_roster() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        let event = make_event(&pool, 100, owner, &[pending("b@x.com"), pending("c@x.com")]).await;
        assert_eq!(event.title, "Dinner");
        assert_eq!(event.event_kind, EventKind::Quick);

        let roster = get_roster(&pool, 100).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].email, "b@x.com");
        assert_eq!(roster[0].status, GuestStatus::Pending);
        assert!(roster[0].user_id.is_none());
    }

    #[tokio::test]
    async fn test_rsvp_accept_backfills_user_id() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        crate::users::create_user(&pool, 2, "B", "b@x.com", "h")
            .await
            .unwrap();
        make_event(&pool, 100, owner, &[pending("b@x.com")]).await;

        let guest = rsvp(&pool, 100, "B@X.com", GuestStatus::Accepted, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(guest.status, GuestStatus::Accepted);
        assert_eq!(guest.user_id, Some(2));
    }

    #[tokio::test]
    async fn test_rsvp_twice_fails_the_second_time() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        crate::users::create_user(&pool, 2, "B", "b@x.com", "h")
            .await
            .unwrap();
        make_event(&pool, 100, owner, &[pending("b@x.com")]).await;

        assert!(rsvp(&pool, 100, "b@x.com", GuestStatus::Accepted, 2)
            .await
            .unwrap()
            .is_some());
        assert!(rsvp(&pool, 100, "b@x.com", GuestStatus::Accepted, 2)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rsvp_without_invite_fails() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        make_event(&pool, 100, owner, &[]).await;
        let result = rsvp(&pool, 100, "nobody@x.com", GuestStatus::Rejected, 2)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_event_empty_values_keep_old() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        make_event(&pool, 100, owner, &[]).await;

        let updated = update_event(&pool, 100, Some(""), None, None, None, Some("#00ff00"), None)
            .await
            .unwrap();
        assert_eq!(updated.title, "Dinner");
        assert_eq!(updated.description.as_deref(), Some("at my place"));
        assert_eq!(updated.color, "#00ff00");
    }

    #[tokio::test]
    async fn test_replace_roster_swaps_entries() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        make_event(&pool, 100, owner, &[pending("b@x.com")]).await;

        replace_roster(
            &pool,
            100,
            &[RosterEntry {
                email: "c@x.com".to_string(),
                user_id: Some(3),
                status: GuestStatus::Accepted,
            }],
        )
        .await
        .unwrap();

        let roster = get_roster(&pool, 100).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].email, "c@x.com");
        assert_eq!(roster[0].status, GuestStatus::Accepted);
    }

    #[tokio::test]
    async fn test_remove_guest_splices_entry() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        make_event(&pool, 100, owner, &[pending("b@x.com"), pending("c@x.com")]).await;

        assert!(remove_guest(&pool, 100, "B@x.com").await.unwrap());
        assert!(!remove_guest(&pool, 100, "b@x.com").await.unwrap());
        let roster = get_roster(&pool, 100).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert!(get_event(&pool, 100).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_event_cascades_and_detaches_children() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        make_event(&pool, 100, owner, &[pending("b@x.com")]).await;

        // Child event, a comment, a poll with a vote, and a todo.
        let start = Utc::now() + Duration::hours(1);
        create_event(
            &pool,
            101,
            owner,
            "Child",
            None,
            start,
            start + Duration::hours(1),
            "#1890ff",
            EventKind::Quick,
            None,
            Some(100),
            &[],
        )
        .await
        .unwrap();
        crate::comments::create_comment(&pool, 200, 100, owner, "hi", None, None)
            .await
            .unwrap();
        crate::polls::create_poll(&pool, 300, 100, owner, "Where?", &[(301, "Pizza"), (302, "Sushi")])
            .await
            .unwrap();
        crate::polls::toggle_vote(&pool, 301, owner).await.unwrap();
        crate::todos::create_todo(&pool, 400, 100, owner, "book a table")
            .await
            .unwrap();

        delete_event(&pool, 100).await.unwrap();

        assert!(get_event(&pool, 100).await.unwrap().is_none());
        assert!(get_roster(&pool, 100).await.unwrap().is_empty());
        assert!(crate::comments::get_comment(&pool, 200).await.unwrap().is_none());
        assert!(crate::polls::get_poll(&pool, 300).await.unwrap().is_none());
        assert!(crate::polls::get_option(&pool, 301).await.unwrap().is_none());
        assert!(crate::todos::get_todo(&pool, 400).await.unwrap().is_none());

        let child = get_event(&pool, 101).await.unwrap().unwrap();
        assert!(child.parent_event_id.is_none());
    }

    #[tokio::test]
    async fn test_list_owned_or_accepted_filters_pending() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        crate::users::create_user(&pool, 2, "B", "b@x.com", "h")
            .await
            .unwrap();
        make_event(&pool, 100, owner, &[pending("b@x.com")]).await;

        // B was invited but has not accepted: nothing owned, nothing accepted.
        assert!(list_owned_or_accepted(&pool, 2, "b@x.com")
            .await
            .unwrap()
            .is_empty());

        rsvp(&pool, 100, "b@x.com", GuestStatus::Accepted, 2)
            .await
            .unwrap();
        let events = list_owned_or_accepted(&pool, 2, "b@x.com").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 100);

        // The owner sees it too.
        assert_eq!(
            list_owned_or_accepted(&pool, owner, "owner@example.com")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_pending_invite_listing_and_count() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        make_event(&pool, 100, owner, &[pending("b@x.com")]).await;
        make_event(&pool, 101, owner, &[pending("b@x.com")]).await;

        let invites = list_pending_invites(&pool, "B@X.COM").await.unwrap();
        assert_eq!(invites.len(), 2);
        assert_eq!(count_pending_invites(&pool, "b@x.com").await.unwrap(), 2);

        rsvp(&pool, 100, "b@x.com", GuestStatus::Rejected, 2)
            .await
            .unwrap();
        assert_eq!(count_pending_invites(&pool, "b@x.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_children() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;
        make_event(&pool, 100, owner, &[]).await;
        let start = Utc::now() + Duration::hours(2);
        create_event(
            &pool,
            101,
            owner,
            "Child",
            None,
            start,
            start + Duration::hours(1),
            "#1890ff",
            EventKind::Project,
            None,
            Some(100),
            &[],
        )
        .await
        .unwrap();

        let children = list_children(&pool, 100).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, 101);
    }

    #[tokio::test]
    async fn test_purge_expired_only_removes_past_events() {
        let pool = test_pool().await;
        let owner = setup_owner(&pool).await;

        let long_gone = Utc::now() - Duration::days(30);
        create_event(
            &pool,
            100,
            owner,
            "Old",
            None,
            long_gone,
            long_gone + Duration::hours(1),
            "#1890ff",
            EventKind::Quick,
            None,
            None,
            &[],
        )
        .await
        .unwrap();
        make_event(&pool, 101, owner, &[]).await;

        let cutoff = Utc::now() - Duration::days(14);
        let purged = purge_expired(&pool, cutoff).await.unwrap();
        assert_eq!(purged, 1);
        assert!(get_event(&pool, 100).await.unwrap().is_none());
        assert!(get_event(&pool, 101).await.unwrap().is_some());
    }
}
