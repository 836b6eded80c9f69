use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use soiree_core::AppState;
use soiree_db::webhooks::WebhookRow;

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_webhooks).post(create_webhook))
        .route("/{webhook_id}", delete(delete_webhook))
}

fn webhook_to_json(webhook: &WebhookRow) -> Value {
    json!({
        "id": webhook.id.to_string(),
        "owner_id": webhook.owner_id.to_string(),
        "name": webhook.name,
        "url": webhook.url,
        "created_at": webhook.created_at.to_rfc3339(),
    })
}

async fn list_webhooks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let webhooks = soiree_db::webhooks::list_owned_webhooks(&state.db, auth.id())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let result: Vec<Value> = webhooks.iter().map(webhook_to_json).collect();
    Ok(Json(json!(result)))
}

#[derive(Deserialize)]
pub struct CreateWebhookRequest {
    pub name: Option<String>,
    pub url: Option<String>,
}

async fn create_webhook(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateWebhookRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = body.name.as_deref().map(str::trim).unwrap_or_default();
    let url = body.url.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() || url.is_empty() {
        return Err(ApiError::BadRequest("Please provide a name and URL".into()));
    }
    if url::Url::parse(url).is_err() {
        return Err(ApiError::BadRequest("Invalid webhook URL".into()));
    }

    let id = soiree_util::snowflake::generate(1);
    let webhook = soiree_db::webhooks::create_webhook(&state.db, id, auth.id(), name, url)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((StatusCode::CREATED, Json(webhook_to_json(&webhook))))
}

async fn delete_webhook(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(webhook_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let webhook = soiree_db::webhooks::get_webhook(&state.db, webhook_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;

    if webhook.owner_id != auth.id() {
        return Err(ApiError::Forbidden);
    }

    soiree_db::webhooks::delete_webhook(&state.db, webhook_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(json!({ "message": "Webhook removed" })))
}
