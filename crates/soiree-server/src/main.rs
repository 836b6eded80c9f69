use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("soiree=info,tower_http=debug")),
        )
        .init();

    let args = cli::Args::parse();
    let mut config = config::Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    config.ensure_jwt_secret();

    ensure_db_dir(&config.database.url);

    let db = soiree_db::create_pool(&config.database.url, config.database.max_connections).await?;
    soiree_db::run_migrations(&db).await?;

    let notifier = soiree_notify::Notifier::new(soiree_notify::NotifyConfig {
        mail_api_key: config.mail.api_key.clone(),
        mail_sender: config.mail.sender.clone(),
        frontend_url: config.server.frontend_url.clone(),
        line_channel_token: config.line.channel_access_token.clone(),
    })
    .map_err(|e| anyhow::anyhow!("could not build notifier: {e}"))?;

    let line_login = match (
        config.line.login_channel_id.clone(),
        config.line.login_channel_secret.clone(),
        config.line.login_redirect_uri.clone(),
    ) {
        (Some(id), Some(secret), Some(redirect)) => {
            Some(
                soiree_notify::line::LineLogin::new(id, secret, redirect)
                    .map_err(|e| anyhow::anyhow!("could not build LINE login client: {e}"))?,
            )
        }
        _ => {
            tracing::info!("LINE login not configured; account linking disabled");
            None
        }
    };

    let state = soiree_core::AppState {
        db: db.clone(),
        config: soiree_core::AppConfig {
            jwt_secret: config.auth.jwt_secret.clone(),
            jwt_expiry_seconds: config.auth.jwt_expiry_seconds,
            frontend_url: config.server.frontend_url.clone(),
        },
        notifier: Arc::new(notifier),
        line_login,
    };

    // Hourly retention sweep for events past their end time.
    soiree_core::expiry::spawn_sweeper(db.clone());

    let app = soiree_api::build_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("listening on http://{}", config.server.bind_address);
    tracing::info!("database: {}", config.database.url);

    let shutdown_signal = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down...");
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// Create the database's parent directory so a fresh checkout starts up
/// without manual setup.
fn ensure_db_dir(database_url: &str) {
    if let Some(db_path) = database_url
        .strip_prefix("sqlite://")
        .and_then(|s| s.split('?').next())
    {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
    }
}
