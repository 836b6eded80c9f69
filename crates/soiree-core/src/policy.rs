//! Access control for events and their sub-resources, consolidated in one
//! place instead of re-derived inline at every route.
//!
//! Tiers:
//! - read: the owner or any guest, whatever their status
//! - write: the owner or a guest who has accepted
//! - manage: the event owner or the resource's author (poll/option/todo
//!   deletion)
//! - vote reset: the poll author alone; ownership does not extend here

use crate::error::CoreError;
use soiree_db::events::{EventRow, GuestRow};
use soiree_models::GuestStatus;

pub fn is_owner(event: &EventRow, user_id: i64) -> bool {
    event.owner_id == user_id
}

pub fn find_guest<'a>(roster: &'a [GuestRow], email: &str) -> Option<&'a GuestRow> {
    let needle = email.trim().to_ascii_lowercase();
    roster.iter().find(|g| g.email == needle)
}

pub fn is_guest(roster: &[GuestRow], email: &str) -> bool {
    find_guest(roster, email).is_some()
}

pub fn is_accepted_guest(roster: &[GuestRow], email: &str) -> bool {
    find_guest(roster, email).is_some_and(|g| g.status == GuestStatus::Accepted)
}

pub fn can_read(event: &EventRow, roster: &[GuestRow], user_id: i64, email: &str) -> bool {
    is_owner(event, user_id) || is_guest(roster, email)
}

pub fn can_write(event: &EventRow, roster: &[GuestRow], user_id: i64, email: &str) -> bool {
    is_owner(event, user_id) || is_accepted_guest(roster, email)
}

pub fn can_manage(event_owner_id: i64, resource_author_id: i64, caller_id: i64) -> bool {
    caller_id == event_owner_id || caller_id == resource_author_id
}

pub fn require_read(
    event: &EventRow,
    roster: &[GuestRow],
    user_id: i64,
    email: &str,
) -> Result<(), CoreError> {
    if !can_read(event, roster, user_id, email) {
        return Err(CoreError::Forbidden);
    }
    Ok(())
}

pub fn require_write(
    event: &EventRow,
    roster: &[GuestRow],
    user_id: i64,
    email: &str,
) -> Result<(), CoreError> {
    if !can_write(event, roster, user_id, email) {
        return Err(CoreError::Forbidden);
    }
    Ok(())
}

pub fn require_manage(
    event_owner_id: i64,
    resource_author_id: i64,
    caller_id: i64,
) -> Result<(), CoreError> {
    if !can_manage(event_owner_id, resource_author_id, caller_id) {
        return Err(CoreError::Forbidden);
    }
    Ok(())
}

pub fn require_owner(event: &EventRow, user_id: i64) -> Result<(), CoreError> {
    if !is_owner(event, user_id) {
        return Err(CoreError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use soiree_models::EventKind;

    fn make_event(owner_id: i64) -> EventRow {
        EventRow {
            id: 100,
            owner_id,
            title: "Dinner".to_string(),
            description: None,
            start_time: Utc::now(),
            end_time: Utc::now(),
            color: "#1890ff".to_string(),
            event_kind: EventKind::Quick,
            webhook_id: None,
            parent_event_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn guest(email: &str, status: GuestStatus) -> GuestRow {
        GuestRow {
            event_id: 100,
            email: email.to_string(),
            user_id: None,
            status,
        }
    }

    #[test]
    fn owner_can_read_and_write() {
        let event = make_event(1);
        assert!(can_read(&event, &[], 1, "owner@x.com"));
        assert!(can_write(&event, &[], 1, "owner@x.com"));
    }

    #[test]
    fn pending_guest_can_read_but_not_write() {
        let event = make_event(1);
        let roster = vec![guest("b@x.com", GuestStatus::Pending)];
        assert!(can_read(&event, &roster, 2, "b@x.com"));
        assert!(!can_write(&event, &roster, 2, "b@x.com"));
    }

    #[test]
    fn rejected_guest_can_still_read() {
        let event = make_event(1);
        let roster = vec![guest("b@x.com", GuestStatus::Rejected)];
        assert!(can_read(&event, &roster, 2, "b@x.com"));
        assert!(!can_write(&event, &roster, 2, "b@x.com"));
    }

    #[test]
    fn accepted_guest_can_write() {
        let event = make_event(1);
        let roster = vec![guest("b@x.com", GuestStatus::Accepted)];
        assert!(can_write(&event, &roster, 2, "b@x.com"));
    }

    #[test]
    fn stranger_has_no_access() {
        let event = make_event(1);
        let roster = vec![guest("b@x.com", GuestStatus::Accepted)];
        assert!(!can_read(&event, &roster, 3, "c@x.com"));
        assert!(!can_write(&event, &roster, 3, "c@x.com"));
        assert!(require_read(&event, &roster, 3, "c@x.com").is_err());
    }

    #[test]
    fn guest_match_is_case_insensitive() {
        let event = make_event(1);
        let roster = vec![guest("b@x.com", GuestStatus::Accepted)];
        assert!(can_write(&event, &roster, 2, "B@X.COM"));
    }

    #[test]
    fn manage_allows_owner_and_author_only() {
        assert!(can_manage(1, 2, 1));
        assert!(can_manage(1, 2, 2));
        assert!(!can_manage(1, 2, 3));
        assert!(require_manage(1, 2, 3).is_err());
    }

    #[test]
    fn require_owner_rejects_guests() {
        let event = make_event(1);
        assert!(require_owner(&event, 1).is_ok());
        assert!(matches!(
            require_owner(&event, 2).unwrap_err(),
            CoreError::Forbidden
        ));
    }
}
