use serde::{Deserialize, Serialize};

/// Lifecycle state of a guest entry on an event roster.
///
/// `Rejected` and `Accepted` are only reachable from `Pending`; there is no
/// direct transition between them. A rejected guest re-enters the roster as
/// `Pending` when re-invited on an event edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum GuestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl GuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestStatus::Pending => "pending",
            GuestStatus::Accepted => "accepted",
            GuestStatus::Rejected => "rejected",
        }
    }
}

/// The two answers an invited user can give. Parsed from the RSVP request
/// body; anything else is a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpReply {
    Accepted,
    Rejected,
}

impl From<RsvpReply> for GuestStatus {
    fn from(reply: RsvpReply) -> Self {
        match reply {
            RsvpReply::Accepted => GuestStatus::Accepted,
            RsvpReply::Rejected => GuestStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&GuestStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }

    #[test]
    fn rsvp_reply_rejects_unknown_values() {
        let parsed: Result<RsvpReply, _> = serde_json::from_str("\"maybe\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn rsvp_reply_maps_to_status() {
        assert_eq!(
            GuestStatus::from(RsvpReply::Accepted),
            GuestStatus::Accepted
        );
        assert_eq!(
            GuestStatus::from(RsvpReply::Rejected),
            GuestStatus::Rejected
        );
    }
}
