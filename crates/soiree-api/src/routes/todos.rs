use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use soiree_core::{policy, AppState};
use soiree_db::events::EventRow;
use soiree_db::todos::TodoView;

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        // The path id is an event id for GET/POST and a todo id for DELETE.
        .route("/{id}", get(list_todos).post(create_todo).delete(delete_todo))
        .route("/{todo_id}/toggle", put(toggle_todo))
}

fn todo_to_json(todo: &TodoView) -> Value {
    json!({
        "id": todo.id.to_string(),
        "event_id": todo.event_id.to_string(),
        "author": {
            "id": todo.author_id.to_string(),
            "name": todo.author_name,
            "profile_color": todo.author_color,
        },
        "text": todo.text,
        "is_completed": todo.is_completed,
        "created_at": todo.created_at.to_rfc3339(),
    })
}

/// Shared task-list gate: every todo verb requires the caller to be the
/// event owner or an accepted guest.
async fn require_task_access(
    state: &AppState,
    auth: &AuthUser,
    event_id: i64,
) -> Result<EventRow, ApiError> {
    let event = soiree_db::events::get_event(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    let roster = soiree_db::events::get_roster(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    policy::require_write(&event, &roster, auth.id(), auth.email())?;
    Ok(event)
}

async fn list_todos(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    require_task_access(&state, &auth, event_id).await?;

    let todos = soiree_db::todos::list_event_todos(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let result: Vec<Value> = todos.iter().map(todo_to_json).collect();
    Ok(Json(json!(result)))
}

#[derive(Deserialize)]
pub struct CreateTodoRequest {
    pub text: Option<String>,
}

async fn create_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
    Json(body): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let text = body.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Task text is required".into()));
    }

    require_task_access(&state, &auth, event_id).await?;

    let id = soiree_util::snowflake::generate(1);
    let created = soiree_db::todos::create_todo(&state.db, id, event_id, auth.id(), text)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let view = soiree_db::todos::get_todo_view(&state.db, created.id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::CREATED, Json(todo_to_json(&view))))
}

async fn toggle_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(todo_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let todo = soiree_db::todos::get_todo(&state.db, todo_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    require_task_access(&state, &auth, todo.event_id).await?;

    soiree_db::todos::toggle_todo(&state.db, todo_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;

    let view = soiree_db::todos::get_todo_view(&state.db, todo_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(todo_to_json(&view)))
}

/// Deletion is stricter than the shared gate: event owner or task author.
async fn delete_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(todo_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let todo = soiree_db::todos::get_todo(&state.db, todo_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    let event = require_task_access(&state, &auth, todo.event_id).await?;
    policy::require_manage(event.owner_id, todo.author_id, auth.id())?;

    soiree_db::todos::delete_todo(&state.db, todo_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(json!({ "message": "Task removed" })))
}
