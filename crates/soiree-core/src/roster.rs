//! Guest roster lifecycle: the transitions an event's guest list goes
//! through on create and edit, as pure functions so the invariants are
//! testable without a database.

use soiree_db::events::{GuestRow, RosterEntry};
use soiree_models::GuestStatus;

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Build the roster for a brand-new event. The owner's own address is
/// always dropped; guests on a child event inherit consent from the parent
/// and start out `accepted`, everyone else starts `pending`.
pub fn initial_roster(emails: &[String], owner_email: &str, is_child: bool) -> Vec<RosterEntry> {
    let owner = normalize(owner_email);
    let status = if is_child {
        GuestStatus::Accepted
    } else {
        GuestStatus::Pending
    };

    let mut roster: Vec<RosterEntry> = Vec::new();
    for email in emails {
        let email = normalize(email);
        if email.is_empty() || email == owner {
            continue;
        }
        if roster.iter().any(|g| g.email == email) {
            continue;
        }
        roster.push(RosterEntry {
            email,
            user_id: None,
            status,
        });
    }
    roster
}

/// Result of re-rostering on an event edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub roster: Vec<RosterEntry>,
    /// Emails now sitting in `pending`; these get (re-)invited.
    pub pending: Vec<String>,
}

/// Merge the supplied guest list into the existing roster. Accepted guests
/// survive untouched (including their linked user id); every other supplied
/// address becomes a fresh `pending` entry. Prior pending/rejected entries
/// not resupplied disappear, so edits are destructive to guest history
/// except for the accepted subset.
pub fn merge_roster(
    existing: &[GuestRow],
    supplied: &[String],
    owner_email: &str,
) -> MergeOutcome {
    let owner = normalize(owner_email);

    let mut roster: Vec<RosterEntry> = existing
        .iter()
        .filter(|g| g.status == GuestStatus::Accepted)
        .map(|g| RosterEntry {
            email: g.email.clone(),
            user_id: g.user_id,
            status: GuestStatus::Accepted,
        })
        .collect();

    let mut pending = Vec::new();
    for email in supplied {
        let email = normalize(email);
        if email.is_empty() || email == owner {
            continue;
        }
        if roster.iter().any(|g| g.email == email) {
            continue;
        }
        roster.push(RosterEntry {
            email: email.clone(),
            user_id: None,
            status: GuestStatus::Pending,
        });
        pending.push(email);
    }

    MergeOutcome { roster, pending }
}
