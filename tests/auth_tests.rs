use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use scholarr::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // In-memory sqlite gives every pooled connection its own database.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config
}

async fn spawn_app() -> Router {
    let state = scholarr::api::create_app_state_from_config(test_config(), None)
        .await
        .expect("Failed to create app state");
    scholarr::api::router(state).await
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = if let Some(body) = body {
        builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register(app: &Router, username: &str, role: &str) {
    let (status, _) = request(
        app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["access"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_and_login() {
    let app = spawn_app().await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "password123",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "student");
    // The password never appears in any response shape.
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = request(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access"].is_string());
    assert!(body["data"]["refresh"].is_string());
}

#[tokio::test]
async fn test_login_failure_does_not_reveal_user_existence() {
    let app = spawn_app().await;
    register(&app, "alice", "student").await;

    let (status_known, body_known) = request(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "alice", "password": "wrong-password"})),
    )
    .await;
    let (status_unknown, body_unknown) = request(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "nobody", "password": "wrong-password"})),
    )
    .await;

    assert_eq!(status_known, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_known, body_unknown);
}

#[tokio::test]
async fn test_register_validation() {
    let app = spawn_app().await;
    register(&app, "alice", "student").await;

    // Duplicate username
    let (status, _) = request(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicate email
    let (status, _) = request(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Malformed email
    let (status, _) = request(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "bob",
            "email": "not-an-email",
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Weak password
    let (status, _) = request(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "short",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown role
    let (status, _) = request(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "password123",
            "role": "superuser",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_refresh() {
    let app = spawn_app().await;
    register(&app, "alice", "student").await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;
    let access = body["data"]["access"].as_str().unwrap().to_string();
    let refresh = body["data"]["refresh"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        "POST",
        "/api/token/refresh",
        None,
        Some(json!({"refresh": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access"].is_string());

    // An access token is not accepted as a refresh token.
    let (status, _) = request(
        &app,
        "POST",
        "/api/token/refresh",
        None,
        Some(json!({"refresh": access})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        "POST",
        "/api/token/refresh",
        None,
        Some(json!({"refresh": "garbage"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_self_service() {
    let app = spawn_app().await;
    register(&app, "alice", "student").await;
    register(&app, "bob", "student").await;
    let token = login(&app, "alice", "password123").await;

    let (status, _) = request(&app, "GET", "/api/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = request(&app, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");

    let (status, body) = request(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"email": "alice+new@example.com", "avatar": "avatars/alice.png"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice+new@example.com");
    assert_eq!(body["data"]["avatar"], "avatars/alice.png");

    // Taking another user's email is rejected.
    let (status, _) = request(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"email": "bob@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Omitting the avatar leaves it in place; an explicit null clears it.
    let (status, body) = request(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["avatar"], "avatars/alice.png");

    let (status, body) = request(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"avatar": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["avatar"].is_null());
}

#[tokio::test]
async fn test_password_reset_request_no_enumeration() {
    let app = spawn_app().await;
    register(&app, "alice", "student").await;

    let (status_known, body_known) = request(
        &app,
        "POST",
        "/api/password-reset",
        None,
        Some(json!({"email": "alice@example.com"})),
    )
    .await;
    let (status_unknown, body_unknown) = request(
        &app,
        "POST",
        "/api/password-reset",
        None,
        Some(json!({"email": "ghost@example.com"})),
    )
    .await;

    assert_eq!(status_known, StatusCode::OK);
    assert_eq!(status_unknown, StatusCode::OK);
    assert_eq!(body_known, body_unknown);
}

#[tokio::test]
async fn test_password_reset_confirm_single_use() {
    use scholarr::services::{AuthService, TokenService};
    use scholarr::state::SharedState;

    let shared = SharedState::new(test_config()).await.unwrap();

    let user = shared
        .store
        .get_user_by_username("admin")
        .await
        .unwrap()
        .unwrap();

    let token = shared.tokens.issue_reset_token(&user).unwrap();
    let uidb64 = TokenService::encode_uid(user.id);

    shared
        .auth_service
        .confirm_password_reset(&uidb64, &token, "new-password-1")
        .await
        .unwrap();

    // The same token cannot be redeemed a second time.
    let reuse = shared
        .auth_service
        .confirm_password_reset(&uidb64, &token, "new-password-2")
        .await;
    assert!(reuse.is_err());

    // The first change took effect.
    let verified = shared
        .store
        .verify_credentials("admin", "new-password-1")
        .await
        .unwrap();
    assert!(verified.is_some());

    let stale = shared
        .store
        .verify_credentials("admin", "new-password-2")
        .await
        .unwrap();
    assert!(stale.is_none());
}

#[tokio::test]
async fn test_password_reset_confirm_rejects_bad_input() {
    let app = spawn_app().await;
    register(&app, "alice", "student").await;

    let (status, _) = request(
        &app,
        "PATCH",
        "/api/password-reset-confirm",
        None,
        Some(json!({"uidb64": "!!!!", "token": "whatever", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        "PATCH",
        "/api/password-reset-confirm",
        None,
        Some(json!({"uidb64": "MQ", "token": "not-a-real-token", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_administration_is_admin_only() {
    let app = spawn_app().await;
    register(&app, "alice", "student").await;
    let student_token = login(&app, "alice", "password123").await;
    // Seeded by the initial migration.
    let admin_token = login(&app, "admin", "password").await;

    let (status, _) = request(&app, "GET", "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/api/users", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(&app, "GET", "/api/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);

    let alice_id = users
        .iter()
        .find(|u| u["username"] == "alice")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/users/{alice_id}"),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/users/{alice_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/users/{alice_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
