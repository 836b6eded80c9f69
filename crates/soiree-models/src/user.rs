use serde::{Deserialize, Serialize};

/// The slice of a user shown to other participants: display name and the
/// color used for their avatar badge. Never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_color: String,
}
