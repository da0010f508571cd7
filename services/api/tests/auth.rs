use crate::common::{spawn_app, JWT_SECRET};
use api_lib::web::auth::TokenKeys;
use serde_json::{json, Value};
use std::collections::HashSet;

mod common;

#[tokio::test]
async fn signup_and_login_work() {
    let app = spawn_app().await;

    // 1. Signup
    let response = app.signup("ada", "ada@example.com", "password123").await;
    assert_eq!(201, response.status().as_u16());
    let json: Value = response.json().await.expect("Failed to read JSON");
    assert!(json["token"].is_string());
    assert_eq!(json["user"]["username"], "ada");
    assert_eq!(json["user"]["email"], "ada@example.com");
    let user_id = json["user"]["userId"].as_i64().unwrap();

    // 2. Login
    let response = app
        .api_client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "ada@example.com", "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let json: Value = response.json().await.expect("Failed to read JSON");
    assert_eq!(json["user"]["userId"].as_i64(), Some(user_id));

    // 3. The token opens protected routes
    let token = json["token"].as_str().unwrap();
    let response = app.get("/api/schedule", token).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = spawn_app().await;

    app.signup("ada", "ada@example.com", "password123").await;
    let response = app.signup("ada2", "ada@example.com", "other").await;

    assert_eq!(400, response.status().as_u16());
    let json: Value = response.json().await.expect("Failed to read JSON");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn signup_requires_all_fields() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(app.url("/api/auth/signup"))
        .json(&json!({ "email": "x@example.com", "password": "pw" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn login_fails_with_wrong_password() {
    let app = spawn_app().await;
    app.signup("ada", "ada@example.com", "password123").await;

    for body in [
        json!({ "email": "ada@example.com", "password": "wrongpassword" }),
        json!({ "email": "nobody@example.com", "password": "password123" }),
    ] {
        let response = app
            .api_client
            .post(app.url("/api/auth/login"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16());
        let json: Value = response.json().await.expect("Failed to read JSON");
        assert_eq!(json["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .get(app.url("/api/schedule"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
    let json: Value = response.json().await.expect("Failed to read JSON");
    assert_eq!(json["error"], "No token provided");

    let response = app.get("/api/schedule", "not-a-jwt").await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn valid_token_for_unknown_user_is_rejected() {
    let app = spawn_app().await;
    let token = TokenKeys::new(JWT_SECRET.as_bytes())
        .issue(9_999)
        .expect("Failed to sign token");

    let response = app.get("/api/schedule", &token).await;

    assert_eq!(401, response.status().as_u16());
    let json: Value = response.json().await.expect("Failed to read JSON");
    assert_eq!(json["error"], "User not found");
}

#[tokio::test]
async fn concurrent_signups_get_distinct_ids() {
    let app = spawn_app().await;

    let mut signups = tokio::task::JoinSet::new();
    for i in 0..10 {
        let client = app.api_client.clone();
        let url = app.url("/api/auth/signup");
        signups.spawn(async move {
            let response = client
                .post(url)
                .json(&json!({
                    "username": format!("user{}", i),
                    "email": format!("user{}@example.com", i),
                    "password": "pw"
                }))
                .send()
                .await
                .expect("Failed to execute request.");
            assert_eq!(201, response.status().as_u16());
            let json: Value = response.json().await.expect("Failed to read JSON");
            json["user"]["userId"].as_i64().unwrap()
        });
    }

    let mut ids = Vec::new();
    while let Some(id) = signups.join_next().await {
        ids.push(id.expect("signup task panicked"));
    }

    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), 10);
    assert_eq!(unique.len(), ids.len());
}
