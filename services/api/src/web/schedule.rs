//! services/api/src/web/schedule.rs
//!
//! Study schedule endpoints: AI generation, manual save, listing, completion
//! tracking and per-entry topic content.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use study_assistant_core::{
    domain::{counters, OwnedLookup, ScheduleEntry, ScheduleItem, TopicRequest, User, UserId},
    normalize,
    ports::{DatabaseService, PortError, PortResult},
};
use tracing::info;
use utoipa::ToSchema;

use crate::web::error::{json_body, HttpError};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntryView {
    pub id: i64,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub topic: String,
    pub duration: f64,
    pub details: Option<String>,
    pub subtopics: Vec<String>,
    pub completed: bool,
    pub delayed: bool,
}

impl From<ScheduleEntry> for ScheduleEntryView {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            date: entry.date,
            topic: entry.topic,
            duration: entry.duration,
            details: entry.details,
            subtopics: entry.subtopics,
            completed: entry.completed,
            delayed: entry.delayed,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateScheduleRequest {
    pub user_message: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateScheduleResponse {
    pub message: String,
    pub schedule: Vec<ScheduleEntryView>,
}

#[derive(Deserialize, ToSchema)]
pub struct SaveScheduleRequest {
    /// `[{ date, topic, duration, details?, subtopics? }]`; `description`/`detail`
    /// and `sub_topics`/`subTopics` are accepted as aliases.
    #[schema(value_type = Vec<Object>)]
    pub schedule: Option<Value>,
}

#[derive(Deserialize, ToSchema)]
pub struct CompletedRequest {
    #[schema(value_type = bool)]
    pub completed: Option<Value>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct CompletedResponse {
    pub message: String,
    pub schedule: ScheduleEntryView,
}

//=========================================================================================
// Persistence Helper
//=========================================================================================

/// Reserves one id per item with a single counter bump, then bulk-inserts.
async fn persist_schedule(
    db: &dyn DatabaseService,
    user_id: UserId,
    items: Vec<ScheduleItem>,
) -> PortResult<Vec<ScheduleEntry>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let count = items.len() as i64;
    let last_id = db.reserve_sequence(counters::SCHEDULE_ID, count).await?;
    let first_id = last_id - count + 1;

    let entries: Vec<ScheduleEntry> = items
        .into_iter()
        .zip(first_id..)
        .map(|(item, id)| ScheduleEntry::from_item(id, user_id, item))
        .collect();
    db.insert_schedule_entries(&entries).await?;

    Ok(entries)
}

/// Ids are numeric; anything else names no entry.
fn parse_entry_id(raw: &str) -> Result<i64, HttpError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| HttpError::not_found("Schedule entry not found"))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Ask the AI scheduler for a study plan and store it.
#[utoipa::path(
    post,
    path = "/api/schedule/generate",
    request_body = GenerateScheduleRequest,
    responses(
        (status = 200, description = "Schedule generated and saved", body = GenerateScheduleResponse),
        (status = 400, description = "User message is required"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "AI failure or invalid schedule format")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<GenerateScheduleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "Failed to generate schedule";
    let user_message = json_body(payload)?
        .user_message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| HttpError::bad_request("User message is required"))?;

    let raw = state
        .ai
        .generate_schedule(&user_message)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    let items = normalize::schedule_items(&raw).map_err(|e| {
        HttpError::invalid_ai_response(CONTEXT, e)
            .with_message("Invalid schedule format received from AI")
    })?;

    let entries = persist_schedule(state.db.as_ref(), user.user_id, items)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    info!("Generated {} schedule entries for user {}", entries.len(), user.user_id);

    Ok(Json(GenerateScheduleResponse {
        message: "Schedule generated and saved successfully".to_string(),
        schedule: entries.into_iter().map(Into::into).collect(),
    }))
}

/// Store a schedule built by the caller.
#[utoipa::path(
    post,
    path = "/api/schedule/save",
    request_body = SaveScheduleRequest,
    responses(
        (status = 200, description = "Schedule saved", body = MessageResponse),
        (status = 400, description = "Schedule is not a valid array of items"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn save_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<SaveScheduleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let raw = json_body(payload)?
        .schedule
        .filter(Value::is_array)
        .ok_or_else(|| HttpError::bad_request("Valid schedule array required"))?;
    let items =
        normalize::schedule_items(&raw).map_err(|e| HttpError::bad_request(e.to_string()))?;

    let entries = persist_schedule(state.db.as_ref(), user.user_id, items)
        .await
        .map_err(|e| HttpError::from_port(e, "Server error"))?;
    info!("Saved {} schedule entries for user {}", entries.len(), user.user_id);

    Ok(Json(MessageResponse {
        message: "Schedule saved successfully".to_string(),
    }))
}

/// List the caller's schedule entries.
#[utoipa::path(
    get,
    path = "/api/schedule",
    responses(
        (status = 200, description = "The caller's schedule entries", body = Vec<ScheduleEntryView>),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, HttpError> {
    let entries = state
        .db
        .get_schedule_for_user(user.user_id)
        .await
        .map_err(|e| HttpError::from_port(e, "Failed to fetch schedule"))?;

    Ok(Json(
        entries
            .into_iter()
            .map(ScheduleEntryView::from)
            .collect::<Vec<_>>(),
    ))
}

/// Mark one of the caller's entries as completed (or not).
#[utoipa::path(
    put,
    path = "/api/schedule/{id}/completed",
    params(("id" = i64, Path, description = "Schedule entry id")),
    request_body = CompletedRequest,
    responses(
        (status = 200, description = "Schedule updated", body = CompletedResponse),
        (status = 400, description = "Completed must be boolean"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such entry owned by the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_completed_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    payload: Result<Json<CompletedRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let completed = json_body(payload)?
        .completed
        .as_ref()
        .and_then(Value::as_bool)
        .ok_or_else(|| HttpError::bad_request("Completed must be boolean"))?;
    let id = parse_entry_id(&id)?;

    let entry = state
        .db
        .set_schedule_completed(OwnedLookup::new(id, user.user_id), completed)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HttpError::not_found("Schedule entry not found"),
            other => HttpError::from_port(other, "Failed to update schedule"),
        })?;
    info!("Schedule entry {} completed={}", entry.id, entry.completed);

    Ok(Json(CompletedResponse {
        message: "Schedule updated".to_string(),
        schedule: entry.into(),
    }))
}

/// Generate study content for one of the caller's entries.
#[utoipa::path(
    get,
    path = "/api/schedule/topic/{id}",
    params(("id" = i64, Path, description = "Schedule entry id")),
    responses(
        (status = 200, description = "Structured topic content as a JSON object"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such entry owned by the caller"),
        (status = 500, description = "Generation failed or returned an invalid payload")
    ),
    security(("bearer_auth" = []))
)]
pub async fn topic_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "Failed to generate topic content";
    let id = parse_entry_id(&id)?;

    let entry = state
        .db
        .get_schedule_entry(OwnedLookup::new(id, user.user_id))
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HttpError::not_found("Schedule entry not found"),
            other => HttpError::from_port(other, CONTEXT),
        })?;

    let raw = state
        .topics
        .generate_topic_content(&TopicRequest::from(&entry))
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    let content =
        normalize::topic_content(raw).map_err(|e| HttpError::invalid_ai_response(CONTEXT, e))?;

    Ok(Json(content))
}
