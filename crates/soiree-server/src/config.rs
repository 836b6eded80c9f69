use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub line: LineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Where invitation links and the LINE callback redirect point.
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/soiree.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            // 30 days, matching the token lifetime the clients expect.
            jwt_expiry_seconds: 30 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MailConfig {
    pub api_key: Option<String>,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LineConfig {
    pub channel_access_token: Option<String>,
    pub login_channel_id: Option<String>,
    pub login_channel_secret: Option<String>,
    pub login_redirect_uri: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        if !Path::new(path).exists() {
            tracing::warn!("config file {path} not found, using defaults");
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file {path}"))?;
        toml::from_str(&contents).with_context(|| format!("could not parse config file {path}"))
    }

    /// A missing JWT secret gets a random one for this process; tokens then
    /// stop working across restarts, so warn loudly.
    pub fn ensure_jwt_secret(&mut self) {
        if !self.auth.jwt_secret.trim().is_empty() {
            return;
        }
        use rand::RngCore;
        let mut bytes = [0_u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let mut secret = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            secret.push_str(&format!("{:02x}", b));
        }
        self.auth.jwt_secret = secret;
        tracing::warn!("auth.jwt_secret not set; generated an ephemeral secret for this run");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:5000");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.auth.jwt_expiry_seconds, 2_592_000);
        assert!(config.mail.api_key.is_none());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind_address = "127.0.0.1:8080"

            [auth]
            jwt_secret = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.server.frontend_url, "http://localhost:3000");
        assert_eq!(config.auth.jwt_secret, "secret");
        assert_eq!(config.database.url, "sqlite://data/soiree.db");
    }

    #[test]
    fn ensure_jwt_secret_fills_empty_secret() {
        let mut config = Config::default();
        config.ensure_jwt_secret();
        assert_eq!(config.auth.jwt_secret.len(), 64);

        let mut configured = Config::default();
        configured.auth.jwt_secret = "keep-me".to_string();
        configured.ensure_jwt_secret();
        assert_eq!(configured.auth.jwt_secret, "keep-me");
    }
}
