//! LINE Messaging API multicast push and the LINE Login authorization-code
//! exchange used for account linking.

use crate::{Notifier, NotifyError};
use serde::Deserialize;
use serde_json::json;

const MULTICAST_ENDPOINT: &str = "https://api.line.me/v2/bot/message/multicast";
const TOKEN_ENDPOINT: &str = "https://api.line.me/oauth2/v2.1/token";
const PROFILE_ENDPOINT: &str = "https://api.line.me/v2/profile";

impl Notifier {
    /// Push one text message to every linked participant at once.
    pub async fn line_multicast(&self, line_ids: &[String], text: &str) -> Result<(), NotifyError> {
        let token = self
            .config
            .line_channel_token
            .as_deref()
            .ok_or(NotifyError::Disabled("line channel token not configured"))?;
        if line_ids.is_empty() {
            tracing::debug!("line multicast: no linked recipients");
            return Ok(());
        }

        let body = json!({
            "to": line_ids,
            "messages": [{ "type": "text", "text": text }],
        });
        let resp = self
            .http
            .post(MULTICAST_ENDPOINT)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(NotifyError::RemoteStatus(resp.status().as_u16()));
        }
        tracing::info!(recipients = line_ids.len(), "line multicast sent");
        Ok(())
    }
}

/// LINE Login client for the OAuth-style account-link callback.
#[derive(Debug, Clone)]
pub struct LineLogin {
    http: reqwest::Client,
    channel_id: String,
    channel_secret: String,
    redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(rename = "userId")]
    user_id: String,
}

impl LineLogin {
    pub fn new(
        channel_id: String,
        channel_secret: String,
        redirect_uri: String,
    ) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(crate::DEFAULT_TIMEOUT)
            .user_agent("Soiree-Notify/0.3")
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;
        Ok(Self {
            http,
            channel_id,
            channel_secret,
            redirect_uri,
        })
    }

    /// Exchange the callback `code` for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, NotifyError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.channel_id.as_str()),
            ("client_secret", self.channel_secret.as_str()),
        ];
        let resp = self.http.post(TOKEN_ENDPOINT).form(&params).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::RemoteStatus(resp.status().as_u16()));
        }
        let token: TokenResponse = resp.json().await?;
        Ok(token.access_token)
    }

    /// Resolve the LINE user id behind an access token.
    pub async fn fetch_line_user_id(&self, access_token: &str) -> Result<String, NotifyError> {
        let resp = self
            .http
            .get(PROFILE_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(NotifyError::RemoteStatus(resp.status().as_u16()));
        }
        let profile: ProfileResponse = resp.json().await?;
        Ok(profile.user_id)
    }
}
