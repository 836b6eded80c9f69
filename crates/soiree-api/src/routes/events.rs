use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use soiree_core::notify::Notice;
use soiree_core::{notify, policy, roster, AppState};
use soiree_db::events::{EventRow, GuestRow};
use soiree_models::{EventKind, GuestStatus, PublicProfile, RsvpReply};

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Tolerated clock skew when rejecting events that start in the past.
const PAST_START_TOLERANCE_SECS: i64 = 60;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_events).post(create_event))
        .route("/myevents", get(list_my_events))
        .route("/invited", get(list_invited))
        .route("/invited/count", get(count_invited))
        .route("/rsvp/{event_id}", put(rsvp))
        .route(
            "/{event_id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/{event_id}/sub-events", get(list_sub_events))
}

async fn load_event(state: &AppState, id: i64) -> Result<EventRow, ApiError> {
    soiree_db::events::get_event(&state.db, id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        .ok_or(ApiError::NotFound)
}

fn profile_json(profile: &PublicProfile) -> Value {
    json!({
        "id": profile.id.to_string(),
        "name": profile.name,
        "email": profile.email,
        "profile_color": profile.profile_color,
    })
}

fn guests_to_json(roster: &[GuestRow], profiles: &HashMap<String, PublicProfile>) -> Value {
    let entries: Vec<Value> = roster
        .iter()
        .map(|g| {
            json!({
                "email": g.email,
                "status": g.status,
                "user": profiles.get(&g.email).map(profile_json),
            })
        })
        .collect();
    json!(entries)
}

fn event_to_json(event: &EventRow, guests: Value, owner: Option<Value>) -> Value {
    json!({
        "id": event.id.to_string(),
        "owner_id": event.owner_id.to_string(),
        "owner": owner,
        "title": event.title,
        "description": event.description,
        "start_time": event.start_time.to_rfc3339(),
        "end_time": event.end_time.to_rfc3339(),
        "color": event.color,
        "event_kind": event.event_kind,
        "webhook_id": event.webhook_id.map(|id| id.to_string()),
        "parent_event_id": event.parent_event_id.map(|id| id.to_string()),
        "guests": guests,
        "created_at": event.created_at.to_rfc3339(),
        "updated_at": event.updated_at.to_rfc3339(),
    })
}

fn owner_json(user: &soiree_db::users::UserRow) -> Value {
    json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email,
        "profile_color": user.profile_color,
    })
}

/// Resolve guest emails to profiles once for a batch of rosters.
async fn profile_map(
    state: &AppState,
    emails: &[String],
) -> Result<HashMap<String, PublicProfile>, ApiError> {
    let profiles = soiree_db::users::profiles_by_emails(&state.db, emails)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    Ok(profiles
        .into_iter()
        .map(|p| (p.email.clone(), p))
        .collect())
}

async fn owner_map(
    state: &AppState,
    events: &[EventRow],
) -> Result<HashMap<i64, Value>, ApiError> {
    let owner_ids: HashSet<i64> = events.iter().map(|e| e.owner_id).collect();
    let mut owners = HashMap::new();
    for owner_id in owner_ids {
        if let Some(user) = soiree_db::users::get_user_by_id(&state.db, owner_id)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
        {
            owners.insert(owner_id, owner_json(&user));
        }
    }
    Ok(owners)
}

fn parse_id(raw: &str, what: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub guests: Option<Vec<String>>,
    pub webhook_id: Option<String>,
    pub color: Option<String>,
    pub parent_event_id: Option<String>,
    pub event_kind: Option<EventKind>,
}

async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let title = body.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Event title is required".into()));
    }
    let (start_time, end_time) = match (body.start_time, body.end_time) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(ApiError::BadRequest(
                "Start and end times are required".into(),
            ))
        }
    };
    if start_time < Utc::now() - Duration::seconds(PAST_START_TOLERANCE_SECS) {
        return Err(ApiError::BadRequest(
            "Cannot create an event in the past".into(),
        ));
    }

    let webhook_id = body
        .webhook_id
        .as_deref()
        .map(|raw| parse_id(raw, "webhook_id"))
        .transpose()?;
    let parent_event_id = body
        .parent_event_id
        .as_deref()
        .map(|raw| parse_id(raw, "parent_event_id"))
        .transpose()?;

    let guest_emails = body.guests.unwrap_or_default();
    let roster = roster::initial_roster(&guest_emails, auth.email(), parent_event_id.is_some());

    let id = soiree_util::snowflake::generate(1);
    let event = soiree_db::events::create_event(
        &state.db,
        id,
        auth.id(),
        title,
        body.description.as_deref().filter(|d| !d.is_empty()),
        start_time,
        end_time,
        body.color
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(soiree_models::event::DEFAULT_COLOR),
        body.event_kind.unwrap_or_default(),
        webhook_id,
        parent_event_id,
        &roster,
    )
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    // Invitation mail goes to top-level events only; sub-events inherit
    // consent and skip it.
    let invites = if parent_event_id.is_none() {
        roster.iter().map(|g| g.email.clone()).collect()
    } else {
        Vec::new()
    };
    notify::spawn(
        state.db.clone(),
        state.notifier.clone(),
        Notice::EventCreated {
            event: event.clone(),
            actor_name: auth.user.name.clone(),
            invites,
        },
    );

    let stored_roster = soiree_db::events::get_roster(&state.db, event.id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    let emails: Vec<String> = stored_roster.iter().map(|g| g.email.clone()).collect();
    let profiles = profile_map(&state, &emails).await?;

    Ok((
        StatusCode::CREATED,
        Json(event_to_json(
            &event,
            guests_to_json(&stored_roster, &profiles),
            Some(owner_json(&auth.user)),
        )),
    ))
}

async fn list_my_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let events = soiree_db::events::list_owned_or_accepted(&state.db, auth.id(), auth.email())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let mut rosters = Vec::with_capacity(events.len());
    let mut all_emails = Vec::new();
    for event in &events {
        let roster = soiree_db::events::get_roster(&state.db, event.id)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
        all_emails.extend(roster.iter().map(|g| g.email.clone()));
        rosters.push(roster);
    }
    let profiles = profile_map(&state, &all_emails).await?;
    let owners = owner_map(&state, &events).await?;

    let result: Vec<Value> = events
        .iter()
        .zip(rosters.iter())
        .map(|(event, roster)| {
            event_to_json(
                event,
                guests_to_json(roster, &profiles),
                owners.get(&event.owner_id).cloned(),
            )
        })
        .collect();
    Ok(Json(json!(result)))
}

async fn list_invited(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let events = soiree_db::events::list_pending_invites(&state.db, auth.email())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    let owners = owner_map(&state, &events).await?;

    let result: Vec<Value> = events
        .iter()
        .map(|event| {
            event_to_json(
                event,
                json!([]),
                owners.get(&event.owner_id).cloned(),
            )
        })
        .collect();
    Ok(Json(json!(result)))
}

async fn count_invited(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let count = soiree_db::events::count_pending_invites(&state.db, auth.email())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    Ok(Json(json!({ "count": count })))
}

/// RSVP body is parsed by hand so an unknown status is a 400, not a
/// deserialization rejection.
async fn rsvp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let reply: RsvpReply = body
        .get("status")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid status".into()))?;

    load_event(&state, event_id).await?;

    let guest = soiree_db::events::rsvp(
        &state.db,
        event_id,
        auth.email(),
        GuestStatus::from(reply),
        auth.id(),
    )
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(json!({
        "email": guest.email,
        "status": guest.status,
        "user_id": guest.user_id.map(|id| id.to_string()),
    })))
}

async fn get_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let event = load_event(&state, event_id).await?;
    let roster = soiree_db::events::get_roster(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    policy::require_read(&event, &roster, auth.id(), auth.email())?;

    let emails: Vec<String> = roster.iter().map(|g| g.email.clone()).collect();
    let profiles = profile_map(&state, &emails).await?;
    let owners = owner_map(&state, std::slice::from_ref(&event)).await?;

    Ok(Json(event_to_json(
        &event,
        guests_to_json(&roster, &profiles),
        owners.get(&event.owner_id).cloned(),
    )))
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub guests: Option<Vec<String>>,
    pub webhook_id: Option<String>,
    pub color: Option<String>,
}

async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
    Json(body): Json<UpdateEventRequest>,
) -> Result<Json<Value>, ApiError> {
    let event = load_event(&state, event_id).await?;
    policy::require_owner(&event, auth.id())?;

    let existing = soiree_db::events::get_roster(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    let supplied = body.guests.unwrap_or_default();
    let outcome = roster::merge_roster(&existing, &supplied, auth.email());
    soiree_db::events::replace_roster(&state.db, event_id, &outcome.roster)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    let webhook_id = body
        .webhook_id
        .as_deref()
        .map(|raw| parse_id(raw, "webhook_id"))
        .transpose()?;

    let updated = soiree_db::events::update_event(
        &state.db,
        event_id,
        body.title.as_deref(),
        body.description.as_deref(),
        body.start_time,
        body.end_time,
        body.color.as_deref(),
        webhook_id,
    )
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    notify::spawn(
        state.db.clone(),
        state.notifier.clone(),
        Notice::EventEdited {
            event: updated.clone(),
            actor_name: auth.user.name.clone(),
            invites: outcome.pending.clone(),
        },
    );

    let emails: Vec<String> = outcome.roster.iter().map(|g| g.email.clone()).collect();
    let profiles = profile_map(&state, &emails).await?;
    let stored_roster = soiree_db::events::get_roster(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(event_to_json(
        &updated,
        guests_to_json(&stored_roster, &profiles),
        Some(owner_json(&auth.user)),
    )))
}

/// The owner deletes the event outright; a guest calling delete removes
/// themselves from the roster and the event survives.
async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let event = load_event(&state, event_id).await?;

    if policy::is_owner(&event, auth.id()) {
        let roster = soiree_db::events::get_roster(&state.db, event_id)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
        let guest_emails: Vec<String> = roster.into_iter().map(|g| g.email).collect();

        soiree_db::events::delete_event(&state.db, event_id)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;

        notify::spawn(
            state.db.clone(),
            state.notifier.clone(),
            Notice::EventCancelled {
                event,
                actor_name: auth.user.name.clone(),
                guest_emails,
            },
        );
        return Ok(Json(json!({ "message": "Event removed" })));
    }

    let removed = soiree_db::events::remove_guest(&state.db, event_id, auth.email())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    if removed {
        Ok(Json(json!({ "message": "Left event" })))
    } else {
        Err(ApiError::Forbidden)
    }
}

async fn list_sub_events(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let parent = load_event(&state, event_id).await?;
    let roster = soiree_db::events::get_roster(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    policy::require_read(&parent, &roster, auth.id(), auth.email())?;

    let children = soiree_db::events::list_children(&state.db, event_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    let owners = owner_map(&state, &children).await?;

    let result: Vec<Value> = children
        .iter()
        .map(|child| {
            event_to_json(
                child,
                json!([]),
                owners.get(&child.owner_id).cloned(),
            )
        })
        .collect();
    Ok(Json(json!(result)))
}
