use axum::{
    extract::{Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use soiree_core::AppState;
use soiree_db::users::UserRow;

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/profile", put(update_profile))
}

fn user_to_json(user: &UserRow) -> Value {
    json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email,
        "profile_color": user.profile_color,
    })
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.q.as_deref().unwrap_or("");
    let users = soiree_db::users::search_users(&state.db, query, auth.id())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let result: Vec<Value> = users.iter().map(user_to_json).collect();
    Ok(Json(json!(result)))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub profile_color: Option<String>,
}

async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let updated = soiree_db::users::update_profile(
        &state.db,
        auth.id(),
        body.name.as_deref(),
        body.profile_color.as_deref(),
    )
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(user_to_json(&updated)))
}
