use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use soiree_core::AppState;
use soiree_db::users::UserRow;

use crate::error::ApiError;

/// The authenticated caller, expanded from the bearer token to a full user
/// record before any protected handler runs.
pub struct AuthUser {
    pub user: UserRow,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        let claims = soiree_core::auth::validate_token(token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Unauthorized)?;

        let user = soiree_db::users::get_user_by_id(&state.db, claims.sub)
            .await
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("database error")))?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser { user })
    }
}
