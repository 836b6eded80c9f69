//! Outbound notification channels: invitation email, webhook broadcast,
//! LINE push, plus the LINE Login code exchange. Everything here is
//! best-effort; callers fire these after a successful write and log-and-drop
//! failures.

pub mod email;
pub mod line;
pub mod webhook;

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("channel disabled: {0}")]
    Disabled(&'static str),
    #[error("http error: {0}")]
    Http(String),
    #[error("remote rejected request with status {0}")]
    RemoteStatus(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Http(e.to_string())
    }
}

/// Delivery credentials and addressing. Any `None` simply disables that
/// channel.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    /// API key for the transactional mail provider.
    pub mail_api_key: Option<String>,
    /// Sender address; in sandbox mode also the only deliverable recipient.
    pub mail_sender: Option<String>,
    /// Base URL of the frontend, used for RSVP links in outbound messages.
    pub frontend_url: String,
    /// LINE Messaging API channel access token for multicast pushes.
    pub line_channel_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    http: Client,
    config: NotifyConfig,
}

impl Notifier {
    pub fn new(config: NotifyConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent("Soiree-Notify/0.3")
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// Link guests follow from invitation messages to answer.
    pub fn rsvp_link(&self) -> String {
        format!("{}/invited", self.config.frontend_url.trim_end_matches('/'))
    }
}
