use serde::{Deserialize, Serialize};

/// How an event is used by the product surface: `Quick` is a one-off
/// gathering, `Project` is an ongoing effort with polls and task lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EventKind {
    Quick,
    Project,
}

impl Default for EventKind {
    fn default() -> Self {
        EventKind::Quick
    }
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Quick => "quick",
            EventKind::Project => "project",
        }
    }
}

/// Default calendar color for events and profiles.
pub const DEFAULT_COLOR: &str = "#1890ff";
