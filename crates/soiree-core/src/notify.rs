//! Notification intents and their dispatcher. Handlers emit a [`Notice`]
//! after a successful write and move on; delivery runs on a spawned task,
//! at most once, with every failure logged and swallowed.

use soiree_db::events::EventRow;
use soiree_db::DbPool;
use soiree_notify::Notifier;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Notice {
    EventCreated {
        event: EventRow,
        actor_name: String,
        /// Pending guests to invite by mail; empty for sub-events.
        invites: Vec<String>,
    },
    EventEdited {
        event: EventRow,
        actor_name: String,
        /// Guests newly placed in pending by the edit-merge.
        invites: Vec<String>,
    },
    EventCancelled {
        event: EventRow,
        actor_name: String,
        /// Roster snapshot taken before the delete removed it.
        guest_emails: Vec<String>,
    },
    CommentPosted {
        event: EventRow,
        actor_name: String,
        text: String,
    },
    PollOpened {
        event: EventRow,
        actor_name: String,
        question: String,
    },
}

impl Notice {
    fn event(&self) -> &EventRow {
        match self {
            Notice::EventCreated { event, .. }
            | Notice::EventEdited { event, .. }
            | Notice::EventCancelled { event, .. }
            | Notice::CommentPosted { event, .. }
            | Notice::PollOpened { event, .. } => event,
        }
    }

    /// Text pushed to linked LINE accounts.
    fn line_text(&self) -> String {
        match self {
            Notice::EventCreated {
                event, actor_name, ..
            } => format!(
                "New event: \"{}\"\nBy: {}\nStarts: {}",
                event.title,
                actor_name,
                event.start_time.format("%Y-%m-%d %H:%M UTC")
            ),
            Notice::EventEdited {
                event, actor_name, ..
            } => format!("Event updated: \"{}\"\nBy: {}", event.title, actor_name),
            Notice::EventCancelled {
                event, actor_name, ..
            } => format!("Event cancelled: \"{}\"\nBy: {}", event.title, actor_name),
            Notice::CommentPosted {
                event,
                actor_name,
                text,
            } => format!("New comment on \"{}\"\n{}: \"{}\"", event.title, actor_name, text),
            Notice::PollOpened {
                event,
                actor_name,
                question,
            } => format!(
                "New poll: \"{}\"\nIn event: \"{}\"\nOpened by: {}",
                question, event.title, actor_name
            ),
        }
    }
}

/// Deliver a notice on a background task. The triggering request has
/// already succeeded; nothing here can affect it.
pub fn spawn(db: DbPool, notifier: Arc<Notifier>, notice: Notice) {
    tokio::spawn(async move {
        dispatch(&db, &notifier, notice).await;
    });
}

pub async fn dispatch(db: &DbPool, notifier: &Notifier, notice: Notice) {
    let event = notice.event().clone();

    // Invitation mail for newly pending guests.
    let invites = match &notice {
        Notice::EventCreated { invites, .. } | Notice::EventEdited { invites, .. } => {
            invites.as_slice()
        }
        _ => &[],
    };
    for email in invites {
        if let Err(e) = notifier
            .send_invitation_email(email, &event.title, actor_name(&notice))
            .await
        {
            tracing::warn!(recipient = %email, "invitation mail failed: {e}");
        }
    }

    // Webhook broadcast, creation only, keyed by the event's linked hook.
    if let Notice::EventCreated { actor_name, .. } = &notice {
        if let Some(webhook_id) = event.webhook_id {
            match soiree_db::webhooks::get_webhook(db, webhook_id).await {
                Ok(Some(hook)) => {
                    let message = format!("\"{}\" by {}", event.title, actor_name);
                    if let Err(e) = notifier.post_webhook(&hook.url, &message).await {
                        tracing::warn!(webhook_id, "webhook notification failed: {e}");
                    }
                }
                Ok(None) => tracing::debug!(webhook_id, "event webhook no longer exists"),
                Err(e) => tracing::warn!(webhook_id, "webhook lookup failed: {e}"),
            }
        }
    }

    // LINE multicast to every linked participant.
    let guest_emails = match &notice {
        Notice::EventCancelled { guest_emails, .. } => guest_emails.clone(),
        _ => match soiree_db::events::get_roster(db, event.id).await {
            Ok(roster) => roster.into_iter().map(|g| g.email).collect(),
            Err(e) => {
                tracing::warn!(event_id = event.id, "roster lookup failed: {e}");
                Vec::new()
            }
        },
    };
    match soiree_db::users::line_ids_for_participants(db, event.owner_id, &guest_emails).await {
        Ok(line_ids) => {
            if let Err(e) = notifier.line_multicast(&line_ids, &notice.line_text()).await {
                tracing::warn!(event_id = event.id, "line multicast failed: {e}");
            }
        }
        Err(e) => tracing::warn!(event_id = event.id, "line id lookup failed: {e}"),
    }
}

fn actor_name(notice: &Notice) -> &str {
    match notice {
        Notice::EventCreated { actor_name, .. }
        | Notice::EventEdited { actor_name, .. }
        | Notice::EventCancelled { actor_name, .. }
        | Notice::CommentPosted { actor_name, .. }
        | Notice::PollOpened { actor_name, .. } => actor_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use soiree_models::EventKind;

    fn make_event() -> EventRow {
        EventRow {
            id: 100,
            owner_id: 1,
            title: "Dinner".to_string(),
            description: None,
            start_time: Utc.with_ymd_and_hms(2026, 8, 20, 18, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 8, 20, 21, 0, 0).unwrap(),
            color: "#1890ff".to_string(),
            event_kind: EventKind::Quick,
            webhook_id: None,
            parent_event_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn created_text_names_event_actor_and_start() {
        let text = Notice::EventCreated {
            event: make_event(),
            actor_name: "Alice".to_string(),
            invites: vec![],
        }
        .line_text();
        assert!(text.contains("\"Dinner\""));
        assert!(text.contains("Alice"));
        assert!(text.contains("2026-08-20 18:00 UTC"));
    }

    #[test]
    fn comment_text_quotes_the_comment() {
        let text = Notice::CommentPosted {
            event: make_event(),
            actor_name: "Bob".to_string(),
            text: "see you there".to_string(),
        }
        .line_text();
        assert!(text.contains("Bob: \"see you there\""));
    }

    #[test]
    fn cancelled_text_marks_cancellation() {
        let text = Notice::EventCancelled {
            event: make_event(),
            actor_name: "Alice".to_string(),
            guest_emails: vec![],
        }
        .line_text();
        assert!(text.starts_with("Event cancelled"));
    }

    #[test]
    fn poll_text_carries_question_and_event() {
        let text = Notice::PollOpened {
            event: make_event(),
            actor_name: "Bob".to_string(),
            question: "Where to eat?".to_string(),
        }
        .line_text();
        assert!(text.contains("Where to eat?"));
        assert!(text.contains("\"Dinner\""));
    }
}
