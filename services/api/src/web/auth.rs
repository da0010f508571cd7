//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup and login, plus the bearer token
//! keys used by the auth middleware.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::{
    domain::{counters, User, UserCredentials, UserId},
    ports::PortError,
};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::web::error::{json_body, HttpError};
use crate::web::state::AppState;

const TOKEN_LIFETIME_HOURS: i64 = 24;

//=========================================================================================
// Bearer Tokens
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys derived from the configured secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: UserId,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Stored password hash is unreadable: {:?}", e);
            false
        }
    }
}

fn issue_token(state: &AppState, user_id: UserId) -> Result<String, HttpError> {
    state.tokens.issue(user_id).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        HttpError::internal("Failed to issue token")
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing fields or email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    const CONTEXT: &str = "User already exists or invalid data";
    let req = json_body(payload)?;

    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(HttpError::bad_request("Username, email and password are required"));
    };

    // 1. Hash the password
    let hashed_password = hash_password(&password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        HttpError::internal("Failed to hash password")
    })?;

    // 2. Take the next user id from the counter
    let user_id = state
        .db
        .next_sequence(counters::USER_ID)
        .await
        .map_err(|e| HttpError::from_port(e, "Signup failed"))?;

    // 3. Create user in database
    let user = state
        .db
        .create_user(UserCredentials {
            user_id,
            username,
            email,
            hashed_password,
        })
        .await
        .map_err(|e| HttpError::from_port(e, CONTEXT))?;
    info!("Registered user {}", user.user_id);

    // 4. Issue the bearer token
    let token = issue_token(&state, user.user_id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let req = json_body(payload)?;
    let (Some(email), Some(password)) = (non_empty(req.email), req.password) else {
        return Err(HttpError::bad_request("Invalid credentials"));
    };

    // 1. Get user by email
    let credentials = match state.db.get_user_by_email(&email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            warn!("Login attempt for unknown email");
            return Err(HttpError::bad_request("Invalid credentials"));
        }
        Err(e) => return Err(HttpError::from_port(e, "Login failed")),
    };

    // 2. Verify password
    if !verify_password(&credentials.hashed_password, &password) {
        warn!("Wrong password for user {}", credentials.user_id);
        return Err(HttpError::bad_request("Invalid credentials"));
    }

    // 3. Issue the bearer token
    let token = issue_token(&state, credentials.user_id)?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            token,
            user: credentials.to_user().into(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let keys = TokenKeys::new(b"test-secret");
        let token = keys.issue(42).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_HOURS * 3600);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenKeys::new(b"one").issue(1).unwrap();
        assert!(TokenKeys::new(b"two").verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new(b"test-secret");
        let token = keys.issue_at(7, Utc::now() - Duration::days(2)).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password(&hash, "correct horse"));
        assert!(!verify_password(&hash, "battery staple"));
    }
}
