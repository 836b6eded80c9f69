//! Invitation mail over the Resend-style transactional HTTP API.

use crate::{Notifier, NotifyError};
use serde_json::{json, Value};

const SEND_ENDPOINT: &str = "https://api.resend.com/emails";

pub(crate) fn invitation_payload(
    sender: &str,
    to: &str,
    event_title: &str,
    inviter_name: &str,
    rsvp_link: &str,
) -> Value {
    json!({
        "from": format!("Soiree <{sender}>"),
        "to": [to],
        "subject": format!("[Event Invitation] You have been invited to: {event_title}"),
        "html": format!(
            "<div style=\"font-family: sans-serif; padding: 20px; border: 1px solid #eee;\">\
             <h2>Event invitation</h2>\
             <p><strong>{inviter_name}</strong> has invited you to: <strong>{event_title}</strong></p>\
             <a href=\"{rsvp_link}\" style=\"background: #007bff; color: white; padding: 10px 20px; \
             text-decoration: none; border-radius: 5px;\">Click here to respond</a>\
             </div>"
        ),
    })
}

impl Notifier {
    /// Send one invitation mail. The provider's free tier only delivers to
    /// the sender's own address, so any other recipient is skipped outright
    /// rather than bounced.
    pub async fn send_invitation_email(
        &self,
        to: &str,
        event_title: &str,
        inviter_name: &str,
    ) -> Result<(), NotifyError> {
        let sender = self
            .config
            .mail_sender
            .as_deref()
            .ok_or(NotifyError::Disabled("mail sender not configured"))?;
        let api_key = self
            .config
            .mail_api_key
            .as_deref()
            .ok_or(NotifyError::Disabled("mail api key not configured"))?;

        if !to.eq_ignore_ascii_case(sender) {
            tracing::debug!(recipient = %to, "mail sandbox: skipping non-sender recipient");
            return Ok(());
        }

        let payload = invitation_payload(sender, to, event_title, inviter_name, &self.rsvp_link());
        let resp = self
            .http
            .post(SEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(NotifyError::RemoteStatus(resp.status().as_u16()));
        }
        tracing::info!(recipient = %to, "invitation mail sent");
        Ok(())
    }
}
