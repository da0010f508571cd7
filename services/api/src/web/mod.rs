pub mod auth;
pub mod chat;
pub mod error;
pub mod materials;
pub mod middleware;
pub mod quiz;
pub mod rest;
pub mod schedule;
pub mod state;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::HttpError;
pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Builds the complete application router: public auth routes, bearer-protected
/// API routes, the health probe and the Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/materials", get(materials::list_materials_handler))
        .route("/api/materials/upload", post(materials::upload_material_handler))
        .route("/api/flashcards", get(materials::list_flashcards_handler))
        .route("/api/chat/upload", post(chat::chat_upload_handler))
        .route("/api/chat/ask", post(chat::chat_ask_handler))
        .route("/api/quiz/upload", post(quiz::upload_quiz_handler))
        .route("/api/quiz/from-prompt", post(quiz::quiz_from_prompt_handler))
        .route("/api/quiz/submit", post(quiz::submit_quiz_handler))
        .route("/api/schedule", get(schedule::get_schedule_handler))
        .route("/api/schedule/generate", post(schedule::generate_schedule_handler))
        .route("/api/schedule/save", post(schedule::save_schedule_handler))
        .route("/api/schedule/{id}/completed", put(schedule::mark_completed_handler))
        .route("/api/schedule/topic/{id}", get(schedule::topic_content_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
