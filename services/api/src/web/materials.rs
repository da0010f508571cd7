//! services/api/src/web/materials.rs
//!
//! Study material uploads and the flashcard sets extracted from them.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use study_assistant_core::{
    domain::{counters, Flashcard, FlashcardSet, Material, User},
    normalize,
};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::error::HttpError;
use crate::web::state::AppState;
use crate::web::upload::{read_upload_form, unique_file_name};

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct UploadMaterialResponse {
    pub message: String,
    pub file_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct MaterialView {
    pub file_id: Uuid,
    pub username: String,
    pub file_name: String,
    pub url: String,
    pub public_id: String,
    pub upload_date: DateTime<Utc>,
}

impl From<Material> for MaterialView {
    fn from(material: Material) -> Self {
        Self {
            file_id: material.file_id,
            username: material.username,
            file_name: material.file_name,
            url: material.url,
            public_id: material.public_id,
            upload_date: material.upload_date,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardView {
    pub question: String,
    pub answer: String,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardSetView {
    pub flid: i64,
    pub username: String,
    pub file_id: Uuid,
    pub file_name: String,
    pub flash_card: Vec<FlashcardView>,
    pub tags: Vec<String>,
}

impl From<FlashcardSet> for FlashcardSetView {
    fn from(set: FlashcardSet) -> Self {
        Self {
            flid: set.id,
            username: set.username,
            file_id: set.file_id,
            file_name: set.file_name,
            flash_card: set
                .cards
                .into_iter()
                .map(|Flashcard { question, answer }| FlashcardView { question, answer })
                .collect(),
            tags: set.tags,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Upload a study document and extract a flashcard set from it.
///
/// Accepts a `file` part and an optional `username` field that defaults to the
/// authenticated user's name.
#[utoipa::path(
    post,
    path = "/api/materials/upload",
    request_body(content_type = "multipart/form-data", description = "A `file` part and an optional `username` field."),
    responses(
        (status = 201, description = "File uploaded and flashcards created", body = UploadMaterialResponse),
        (status = 400, description = "No file uploaded"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Storage or AI failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_material_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "Error uploading file";
    let mut form = read_upload_form(multipart).await?;
    let file = form.require_file()?;
    let username = form
        .text("username")
        .map(str::to_string)
        .unwrap_or_else(|| user.username.clone());

    // 1. Store the bytes under a fresh name
    let (file_id, stored_name) = unique_file_name(&file.file_name);
    let stored = state
        .storage
        .upload(&stored_name, file.data)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;

    // 2. Record the material
    let material = Material {
        file_id,
        username,
        file_name: file.file_name,
        url: stored.url,
        public_id: stored.public_id,
        upload_date: Utc::now(),
    };
    state
        .db
        .create_material(&material)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;

    // 3. Extract flashcards from the stored document
    let raw = state
        .ai
        .extract_flashcards(&material.url)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    let cards =
        normalize::flashcards(&raw).map_err(|e| HttpError::invalid_ai_response(CONTEXT, e))?;

    // 4. Record the flashcard set
    let set_id = state
        .db
        .next_sequence(counters::FLASHCARD_SET_ID)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    let set = FlashcardSet {
        id: set_id,
        username: material.username,
        file_id,
        file_name: material.file_name,
        cards,
        tags: Vec::new(),
    };
    state
        .db
        .create_flashcard_set(&set)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    info!(
        "Stored material {} with flashcard set {} ({} cards)",
        file_id,
        set.id,
        set.cards.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadMaterialResponse {
            message: "File uploaded and flashcards created".to_string(),
            file_id,
        }),
    ))
}

/// List all uploaded materials, newest first.
#[utoipa::path(
    get,
    path = "/api/materials",
    responses(
        (status = 200, description = "All materials", body = Vec<MaterialView>),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_materials_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let materials = state
        .db
        .list_materials()
        .await
        .map_err(|e| HttpError::from_port(e, "Failed to fetch materials"))?;

    Ok(Json(
        materials
            .into_iter()
            .map(MaterialView::from)
            .collect::<Vec<_>>(),
    ))
}

/// List all flashcard sets, ordered by set id.
#[utoipa::path(
    get,
    path = "/api/flashcards",
    responses(
        (status = 200, description = "All flashcard sets", body = Vec<FlashcardSetView>),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_flashcards_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let sets = state
        .db
        .list_flashcard_sets()
        .await
        .map_err(|e| HttpError::from_port(e, "Failed to fetch flashcards"))?;

    Ok(Json(
        sets.into_iter()
            .map(FlashcardSetView::from)
            .collect::<Vec<_>>(),
    ))
}
