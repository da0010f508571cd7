//! services/api/src/web/error.rs
//!
//! The error type returned by every HTTP handler. It always renders as
//! `{ "error": "<message>" }` with the matching status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use study_assistant_core::ports::PortError;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// An AI payload that could not be normalized.
    pub fn invalid_ai_response(context: &str, err: impl std::fmt::Display) -> Self {
        error!("{}: invalid AI response: {}", context, err);
        Self::internal("Invalid AI response")
    }

    /// Maps a port failure onto a response. Server-side failures are logged in
    /// full and answered with the generic `context` message only.
    pub fn from_port(err: PortError, context: &str) -> Self {
        match err {
            PortError::NotFound(what) => {
                warn!("{}: {}", context, what);
                Self::not_found(what)
            }
            PortError::Conflict(what) => {
                warn!("{}: conflict on {}", context, what);
                Self::bad_request(context)
            }
            PortError::InvalidUpstream(detail) => {
                error!("{}: invalid AI response: {}", context, detail);
                Self::internal("Invalid AI response")
            }
            PortError::Unexpected(detail) => {
                error!("{}: {}", context, detail);
                Self::internal(context)
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Unwraps a JSON body, turning axum's rejection into a JSON 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, HttpError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        HttpError::bad_request(rejection.body_text())
    })
}
