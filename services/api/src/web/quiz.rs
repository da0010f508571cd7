//! services/api/src/web/quiz.rs
//!
//! Quiz generation (from an uploaded document or a prompt) and attempt submission.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use study_assistant_core::{
    domain::{NewQuiz, Question, Quiz, User},
    grade_attempt, normalize,
};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::error::{json_body, HttpError};
use crate::web::state::AppState;
use crate::web::upload::{read_upload_form, unique_file_name};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub quiz_id: Uuid,
    #[schema(value_type = Vec<Object>)]
    pub questions: Vec<Question>,
}

impl From<Quiz> for QuizResponse {
    fn from(quiz: Quiz) -> Self {
        Self {
            quiz_id: quiz.id,
            questions: quiz.questions,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct QuizPromptRequest {
    pub prompt: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub quiz_id: Option<Value>,
    /// `[{ questionIndex, selectedOption, isSkipped }]`
    #[schema(value_type = Vec<Object>)]
    pub answers: Option<Value>,
    #[schema(value_type = Option<u32>)]
    pub duration_seconds: Option<Value>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub score: u32,
    pub total_questions: u32,
    pub accuracy: f64,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Generate a quiz from an uploaded document.
#[utoipa::path(
    post,
    path = "/api/quiz/upload",
    request_body(content_type = "multipart/form-data", description = "The document to quiz on, in a `file` part."),
    responses(
        (status = 200, description = "Quiz generated", body = QuizResponse),
        (status = 400, description = "No file uploaded"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Storage or AI failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "Quiz generation failed";
    let file = read_upload_form(multipart).await?.require_file()?;

    let (_, stored_name) = unique_file_name(&file.file_name);
    let stored = state
        .storage
        .upload(&stored_name, file.data)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;

    let raw = state
        .ai
        .generate_quiz_from_document(&stored.url)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    let questions =
        normalize::quiz_questions(&raw).map_err(|e| HttpError::invalid_ai_response(CONTEXT, e))?;

    let quiz = state
        .db
        .create_quiz(NewQuiz {
            user_id: user.user_id,
            file_name: Some(file.file_name),
            file_url: Some(stored.url),
            questions,
        })
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    info!(
        "Created quiz {} with {} questions for user {}",
        quiz.id,
        quiz.questions.len(),
        user.user_id
    );

    Ok(Json(QuizResponse::from(quiz)))
}

/// Generate a quiz from a free-text prompt.
#[utoipa::path(
    post,
    path = "/api/quiz/from-prompt",
    request_body = QuizPromptRequest,
    responses(
        (status = 200, description = "Quiz generated", body = QuizResponse),
        (status = 400, description = "Prompt is required"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "AI failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn quiz_from_prompt_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<QuizPromptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "Quiz generation failed";
    let prompt = json_body(payload)?
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| HttpError::bad_request("Prompt is required"))?;

    let raw = state
        .ai
        .generate_quiz_from_prompt(&prompt)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    let questions =
        normalize::quiz_questions(&raw).map_err(|e| HttpError::invalid_ai_response(CONTEXT, e))?;

    let quiz = state
        .db
        .create_quiz(NewQuiz {
            user_id: user.user_id,
            file_name: None,
            file_url: None,
            questions,
        })
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    info!("Created quiz {} from prompt for user {}", quiz.id, user.user_id);

    Ok(Json(QuizResponse::from(quiz)))
}

/// Submit and grade an attempt on one of the caller's quizzes.
#[utoipa::path(
    post,
    path = "/api/quiz/submit",
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Attempt graded and stored", body = SubmitQuizResponse),
        (status = 400, description = "Missing quizId or malformed answers"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Quiz belongs to another user"),
        (status = 404, description = "Quiz not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<SubmitQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "Failed to submit quiz";
    let req = json_body(payload)?;

    // 1. Resolve the quiz; an id that cannot be a quiz id names no quiz.
    let quiz_id = match req.quiz_id {
        None | Some(Value::Null) => return Err(HttpError::bad_request("quizId is required")),
        Some(Value::String(raw)) => Uuid::parse_str(raw.trim()).ok(),
        Some(_) => None,
    }
    .ok_or_else(|| HttpError::not_found("Quiz not found"))?;

    let quiz = state
        .db
        .get_quiz_by_id(quiz_id)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;

    // 2. Only the owner may submit.
    if quiz.user_id != user.user_id {
        warn!(
            "User {} tried to submit quiz {} owned by {}",
            user.user_id, quiz.id, quiz.user_id
        );
        return Err(HttpError::forbidden("You do not have access to this quiz"));
    }

    // 3. Validate the payload.
    let answers = req
        .answers
        .as_ref()
        .ok_or_else(|| HttpError::bad_request("answers must be an array"))
        .and_then(|value| {
            normalize::submitted_answers(value).map_err(|e| HttpError::bad_request(e.to_string()))
        })?;
    let duration_seconds = match req.duration_seconds {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_u64()
                .and_then(|secs| u32::try_from(secs).ok())
                .ok_or_else(|| {
                    HttpError::bad_request("durationSeconds must be a non-negative integer")
                })?,
        ),
    };

    // 4. Grade and append.
    let grade = grade_attempt(&quiz.questions, &answers);
    let response = SubmitQuizResponse {
        score: grade.score,
        total_questions: grade.total_questions,
        accuracy: grade.accuracy,
    };
    let attempt = grade.into_attempt(user.user_id, Utc::now(), duration_seconds);

    state
        .db
        .append_quiz_attempt(quiz.id, &attempt)
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    info!(
        "User {} scored {}/{} on quiz {}",
        user.user_id, response.score, response.total_questions, quiz.id
    );

    Ok(Json(response))
}
