//! Discord-compatible webhook broadcast: one POST with a `content` body.

use crate::{Notifier, NotifyError};
use serde_json::json;

pub(crate) fn broadcast_content(message: &str, rsvp_link: &str) -> String {
    format!("@everyone [Event Update] {message}\nLink: {rsvp_link}")
}

impl Notifier {
    pub async fn post_webhook(&self, url: &str, message: &str) -> Result<(), NotifyError> {
        url::Url::parse(url).map_err(|e| NotifyError::Http(e.to_string()))?;

        let body = json!({ "content": broadcast_content(message, &self.rsvp_link()) });
        let resp = self.http.post(url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::RemoteStatus(resp.status().as_u16()));
        }
        tracing::info!(%url, "webhook notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_mentions_everyone_and_links_back() {
        let content = broadcast_content("\"Dinner\" by Alice", "https://app.example.com/invited");
        assert!(content.starts_with("@everyone"));
        assert!(content.contains("\"Dinner\" by Alice"));
        assert!(content.ends_with("https://app.example.com/invited"));
    }
}
