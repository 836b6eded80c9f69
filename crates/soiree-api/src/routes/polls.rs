use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use soiree_core::notify::Notice;
use soiree_core::{notify, policy, AppState};
use soiree_db::events::EventRow;
use soiree_db::polls::PollRow;

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vote/{option_id}", put(vote))
        .route("/option/{option_id}", delete(delete_option))
        // One pattern for both the event-scoped and poll-scoped verbs; the
        // path id is an event id for GET/POST and a poll id for DELETE.
        .route("/{id}", get(list_polls).post(create_poll).delete(delete_poll))
        .route("/{poll_id}/add-option", post(add_option))
        .route("/{poll_id}/reset", put(reset_votes))
}

/// Render a poll with its options and each option's voters.
async fn poll_to_json(state: &AppState, poll: &PollRow) -> Result<Value, ApiError> {
    let author = soiree_db::users::get_user_by_id(&state.db, poll.author_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    let options = soiree_db::polls::list_options(&state.db, poll.id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let mut option_values = Vec::with_capacity(options.len());
    for option in &options {
        let voters = soiree_db::polls::list_voters(&state.db, option.id)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
        let votes: Vec<Value> = voters
            .iter()
            .map(|v| {
                json!({
                    "id": v.id.to_string(),
                    "name": v.name,
                    "profile_color": v.profile_color,
                })
            })
            .collect();
        option_values.push(json!({
            "id": option.id.to_string(),
            "text": option.text,
            "votes": votes,
        }));
    }

    Ok(json!({
        "id": poll.id.to_string(),
        "event_id": poll.event_id.to_string(),
        "author": author.map(|a| json!({
            "id": a.id.to_string(),
            "name": a.name,
            "profile_color": a.profile_color,
        })),
        "question": poll.question,
        "options": option_values,
        "created_at": poll.created_at.to_rfc3339(),
    }))
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

async fn load_poll(state: &AppState, poll_id: i64) -> Result<PollRow, ApiError> {
    soiree_db::polls::get_poll(&state.db, poll_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)
}

async fn list_polls(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let (event, roster) = load_event_with_roster(&state, event_id).await?;
    policy::require_read(&event, &roster, auth.id(), auth.email())?;

    let polls = soiree_db::polls::list_event_polls(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let mut result = Vec::with_capacity(polls.len());
    for poll in &polls {
        result.push(poll_to_json(&state, poll).await?);
    }
    Ok(Json(json!(result)))
}

#[derive(Deserialize)]
pub struct CreatePollRequest {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
}

async fn create_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
    Json(body): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let question = body.question.as_deref().map(str::trim).unwrap_or_default();
    let options: Vec<String> = body
        .options
        .unwrap_or_default()
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if question.is_empty() || options.len() < 2 {
        return Err(ApiError::BadRequest(
            "A poll needs a question and at least two options".into(),
        ));
    }

    let (event, roster) = load_event_with_roster(&state, event_id).await?;
    policy::require_write(&event, &roster, auth.id(), auth.email())?;

    let poll_id = soiree_util::snowflake::generate(1);
    let option_rows: Vec<(i64, &str)> = options
        .iter()
        .map(|text| (soiree_util::snowflake::generate(1), text.as_str()))
        .collect();
    let poll = soiree_db::polls::create_poll(
        &state.db,
        poll_id,
        event_id,
        auth.id(),
        question,
        &option_rows,
    )
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    notify::spawn(
        state.db.clone(),
        state.notifier.clone(),
        Notice::PollOpened {
            event,
            actor_name: auth.user.name.clone(),
            question: poll.question.clone(),
        },
    );

    let value = poll_to_json(&state, &poll).await?;
    Ok((StatusCode::CREATED, Json(value)))
}

#[derive(Deserialize)]
pub struct AddOptionRequest {
    pub option_text: Option<String>,
}

async fn add_option(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
    Json(body): Json<AddOptionRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = body.option_text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Option text is required".into()));
    }

    let poll = load_poll(&state, poll_id).await?;
    let (event, roster) = load_event_with_roster(&state, poll.event_id).await?;
    policy::require_write(&event, &roster, auth.id(), auth.email())?;

    let option_id = soiree_util::snowflake::generate(1);
    soiree_db::polls::add_option(&state.db, option_id, poll_id, text)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let value = poll_to_json(&state, &poll).await?;
    Ok(Json(value))
}

/// Checkbox toggle: a second vote on the same option withdraws the first.
async fn vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(option_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let option = soiree_db::polls::get_option(&state.db, option_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    let poll = load_poll(&state, option.poll_id).await?;
    let (event, roster) = load_event_with_roster(&state, poll.event_id).await?;
    policy::require_write(&event, &roster, auth.id(), auth.email())?;

    soiree_db::polls::toggle_vote(&state.db, option_id, auth.id())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let value = poll_to_json(&state, &poll).await?;
    Ok(Json(value))
}

async fn delete_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let poll = load_poll(&state, poll_id).await?;
    let (event, _) = load_event_with_roster(&state, poll.event_id).await?;
    policy::require_manage(event.owner_id, poll.author_id, auth.id())?;

    soiree_db::polls::delete_poll(&state.db, poll_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(json!({ "message": "Poll and all its options removed" })))
}

async fn delete_option(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(option_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let option = soiree_db::polls::get_option(&state.db, option_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)?;
    let poll = load_poll(&state, option.poll_id).await?;
    let (event, _) = load_event_with_roster(&state, poll.event_id).await?;
    policy::require_manage(event.owner_id, poll.author_id, auth.id())?;

    soiree_db::polls::delete_option(&state.db, option_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let value = poll_to_json(&state, &poll).await?;
    Ok(Json(value))
}

/// Only the poll's author may clear its votes; event ownership does not
/// extend here.
async fn reset_votes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let poll = load_poll(&state, poll_id).await?;
    if poll.author_id != auth.id() {
        return Err(ApiError::Forbidden);
    }

    soiree_db::polls::reset_votes(&state.db, poll_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let value = poll_to_json(&state, &poll).await?;
    Ok(Json(value))
}
