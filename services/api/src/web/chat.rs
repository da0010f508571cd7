//! services/api/src/web/chat.rs
//!
//! Relays document Q&A to the AI chatbot.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::normalize;
use tracing::debug;
use utoipa::ToSchema;

use crate::web::error::{json_body, HttpError};
use crate::web::state::AppState;
use crate::web::upload::{read_upload_form, unique_file_name};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatUploadResponse {
    pub message: String,
    pub bot_response: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatAskRequest {
    pub message: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatAskResponse {
    pub answer: String,
}

/// Upload a document the chatbot should answer questions about.
#[utoipa::path(
    post,
    path = "/api/chat/upload",
    request_body(content_type = "multipart/form-data", description = "The document, in a `file` part."),
    responses(
        (status = 200, description = "Document handed to the chatbot", body = ChatUploadResponse),
        (status = 400, description = "No file uploaded"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "File processing failed at AI server")
    ),
    security(("bearer_auth" = []))
)]
pub async fn chat_upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "File processing failed at AI server";
    let file = read_upload_form(multipart).await?.require_file()?;

    let (_, stored_name) = unique_file_name(&file.file_name);
    let stored = state
        .storage
        .upload(&stored_name, file.data)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;

    let raw = state
        .ai
        .ingest_chat_document(&stored.url)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    let bot_response =
        normalize::bot_response(&raw).map_err(|e| HttpError::invalid_ai_response(CONTEXT, e))?;

    Ok(Json(ChatUploadResponse {
        message: "File sent to AI API".to_string(),
        bot_response,
    }))
}

/// Ask the chatbot a question.
#[utoipa::path(
    post,
    path = "/api/chat/ask",
    request_body = ChatAskRequest,
    responses(
        (status = 200, description = "The chatbot's answer", body = ChatAskResponse),
        (status = 400, description = "Message is required"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Error querying AI API")
    ),
    security(("bearer_auth" = []))
)]
pub async fn chat_ask_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatAskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "Error querying AI API";
    let message = json_body(payload)?
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| HttpError::bad_request("Message is required"))?;

    let raw = state
        .ai
        .ask_chat(&message)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    debug!("Chatbot replied: {}", raw);
    let answer =
        normalize::bot_response(&raw).map_err(|e| HttpError::invalid_ai_response(CONTEXT, e))?;

    Ok(Json(ChatAskResponse { answer }))
}
