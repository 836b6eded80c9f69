use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use soiree_core::notify::Notice;
use soiree_core::{notify, policy, AppState};
use soiree_db::comments::CommentView;
use soiree_db::events::EventRow;

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/replies/{comment_id}", get(list_replies))
        .route("/{event_id}", get(list_top_level).post(create_comment))
}

fn comment_to_json(comment: &CommentView) -> Value {
    json!({
        "id": comment.id.to_string(),
        "event_id": comment.event_id.to_string(),
        "author": {
            "id": comment.author_id.to_string(),
            "name": comment.author_name,
            "profile_color": comment.author_color,
        },
        "text": comment.text,
        "location": comment.location,
        "parent_comment_id": comment.parent_comment_id.map(|id| id.to_string()),
        "reply_count": comment.reply_count,
        "created_at": comment.created_at.to_rfc3339(),
    })
}

async fn load_event_with_roster(
    state: &AppState,
    event_id: i64,
) -> Result<(EventRow, Vec<soiree_db::events::GuestRow>), ApiError> {
    let event = soiree_db::events::get_event(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    let roster = soiree_db::events::get_roster(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    Ok((event, roster))
}

async fn list_top_level(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let (event, roster) = load_event_with_roster(&state, event_id).await?;
    policy::require_read(&event, &roster, auth.id(), auth.email())?;

    let comments = soiree_db::comments::list_top_level(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let result: Vec<Value> = comments.iter().map(comment_to_json).collect();
    Ok(Json(json!(result)))
}

/// Replies are gated on the same read check as the top level; the original
/// product skipped the check here, which was a documented hole.
async fn list_replies(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let parent = soiree_db::comments::get_comment(&state.db, comment_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    let (event, roster) = load_event_with_roster(&state, parent.event_id).await?;
    policy::require_read(&event, &roster, auth.id(), auth.email())?;

    let replies = soiree_db::comments::list_replies(&state.db, comment_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let result: Vec<Value> = replies.iter().map(comment_to_json).collect();
    Ok(Json(json!(result)))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub text: Option<String>,
    pub location: Option<String>,
    pub parent_comment_id: Option<String>,
}

async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let text = body.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Comment text is required".into()));
    }
    let parent_comment_id = body
        .parent_comment_id
        .as_deref()
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| ApiError::BadRequest("Invalid parent_comment_id".into()))
        })
        .transpose()?;

    let (event, roster) = load_event_with_roster(&state, event_id).await?;
    policy::require_write(&event, &roster, auth.id(), auth.email())?;

    let id = soiree_util::snowflake::generate(1);
    let created = soiree_db::comments::create_comment(
        &state.db,
        id,
        event_id,
        auth.id(),
        text,
        body.location.as_deref().filter(|l| !l.is_empty()),
        parent_comment_id,
    )
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    notify::spawn(
        state.db.clone(),
        state.notifier.clone(),
        Notice::CommentPosted {
            event,
            actor_name: auth.user.name.clone(),
            text: created.text.clone(),
        },
    );

    let view = soiree_db::comments::get_comment_view(&state.db, created.id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::CREATED, Json(comment_to_json(&view))))
}
