use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use soiree_core::AppState;

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/change-password", put(change_password))
        .route("/line/callback", get(line_callback))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = body.name.as_deref().map(str::trim).unwrap_or_default();
    let email = body.email.as_deref().map(str::trim).unwrap_or_default();
    let password = body.password.as_deref().unwrap_or_default();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, email and password are required".into(),
        ));
    }

    let existing = soiree_db::users::get_user_by_email(&state.db, email)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    if existing.is_some() {
        return Err(ApiError::BadRequest("User already exists".into()));
    }

    let password_hash = soiree_core::auth::hash_password(password)?;
    let id = soiree_util::snowflake::generate(1);
    let user = soiree_db::users::create_user(&state.db, id, name, email, &password_hash)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let token = soiree_core::auth::issue_token(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": user.id.to_string(),
            "name": user.name,
            "email": user.email,
            "profile_color": user.profile_color,
            "token": token,
        })),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = body.email.as_deref().map(str::trim).unwrap_or_default();
    let password = body.password.as_deref().unwrap_or_default();

    let user = soiree_db::users::get_user_by_email(&state.db, email)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let user = match user {
        Some(u) if soiree_core::auth::verify_password(password, &u.password_hash) => u,
        _ => return Err(ApiError::Unauthorized),
    };

    let token = soiree_core::auth::issue_token(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )?;

    Ok(Json(json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email,
        "profile_color": user.profile_color,
        "line_user_id": user.line_user_id,
        "token": token,
    })))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let (current, new) = match (body.current_password.as_deref(), body.new_password.as_deref()) {
        (Some(current), Some(new)) if !current.is_empty() && !new.is_empty() => (current, new),
        _ => return Err(ApiError::BadRequest("Please provide all fields".into())),
    };

    let user = soiree_db::users::get_user_auth_by_id(&state.db, auth.id())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::Unauthorized)?;

    if !soiree_core::auth::verify_password(current, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let password_hash = soiree_core::auth::hash_password(new)?;
    soiree_db::users::update_password_hash(&state.db, user.id, &password_hash)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

#[derive(Deserialize)]
pub struct LineCallbackParams {
    pub code: Option<String>,
    /// The linking user's id, carried through the OAuth round trip.
    pub state: Option<String>,
}

/// Completes the LINE account link: code → access token → LINE profile,
/// then stores the LINE user id on the account named by `state`.
async fn line_callback(
    State(state): State<AppState>,
    Query(params): Query<LineCallbackParams>,
) -> Result<Redirect, ApiError> {
    let line_login = state
        .line_login
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("LINE login is not configured".into()))?;

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".into()))?;
    let user_id: i64 = params
        .state
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid state".into()))?;

    let access_token = line_login
        .exchange_code(code)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("LINE token exchange failed: {e}")))?;
    let line_user_id = line_login
        .fetch_line_user_id(&access_token)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("LINE profile fetch failed: {e}")))?;

    soiree_db::users::get_user_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    soiree_db::users::set_line_user_id(&state.db, user_id, &line_user_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let target = format!(
        "{}/settings",
        state.config.frontend_url.trim_end_matches('/')
    );
    Ok(Redirect::to(&target))
}
