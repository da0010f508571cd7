//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use study_assistant_core::ports::PortError;
use tracing::warn;

use crate::web::error::HttpError;
use crate::web::state::AppState;

/// Middleware that validates the bearer token and resolves the current user.
///
/// If valid, inserts the `User` into request extensions for handlers to use.
/// A missing, malformed or expired token, or a token for a user that no longer
/// exists, is answered with 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| HttpError::unauthorized("No token provided"))?;

    // 2. Verify signature and expiry
    let claims = state.tokens.verify(token).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        HttpError::unauthorized("Token is invalid or expired")
    })?;

    // 3. Resolve the user
    let user = match state.db.get_user_by_id(claims.user_id).await {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => return Err(HttpError::unauthorized("User not found")),
        Err(e) => return Err(HttpError::from_port(e, "Failed to authenticate")),
    };

    // 4. Insert the user into request extensions
    req.extensions_mut().insert(user);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
