//! services/api/src/web/rest.rs
//!
//! Contains the liveness handler and the master definition for the OpenAPI
//! specification.

use axum::{response::IntoResponse, Json};
use serde::Serialize;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::web::{auth, chat, materials, quiz, schedule};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        materials::upload_material_handler,
        materials::list_materials_handler,
        materials::list_flashcards_handler,
        chat::chat_upload_handler,
        chat::chat_ask_handler,
        quiz::upload_quiz_handler,
        quiz::quiz_from_prompt_handler,
        quiz::submit_quiz_handler,
        schedule::generate_schedule_handler,
        schedule::save_schedule_handler,
        schedule::get_schedule_handler,
        schedule::mark_completed_handler,
        schedule::topic_content_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::UserView,
            materials::UploadMaterialResponse,
            materials::MaterialView,
            materials::FlashcardSetView,
            materials::FlashcardView,
            chat::ChatUploadResponse,
            chat::ChatAskRequest,
            chat::ChatAskResponse,
            quiz::QuizResponse,
            quiz::QuizPromptRequest,
            quiz::SubmitQuizRequest,
            quiz::SubmitQuizResponse,
            schedule::ScheduleEntryView,
            schedule::GenerateScheduleRequest,
            schedule::GenerateScheduleResponse,
            schedule::SaveScheduleRequest,
            schedule::CompletedRequest,
            schedule::CompletedResponse,
            schedule::MessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Study Assistant API", description = "Quizzes, study schedules, flashcards and document chat.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Liveness
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
