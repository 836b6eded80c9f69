pub mod auth;
pub mod error;
pub mod expiry;
pub mod notify;
pub mod policy;
pub mod roster;

use soiree_db::DbPool;
use soiree_notify::line::LineLogin;
use soiree_notify::Notifier;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub notifier: Arc<Notifier>,
    /// Pre-built LINE Login client; absent when account linking is not
    /// configured.
    pub line_login: Option<LineLogin>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    /// Where browsers are sent after the LINE link callback completes.
    pub frontend_url: String,
}
