use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use scholarr::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // In-memory sqlite gives every pooled connection its own database.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;

    let state = scholarr::api::create_app_state_from_config(config, None)
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

/// Registers a user and returns an access token for them.
async fn signup(app: &Router, username: &str, role: &str) -> String {
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

    let (status, body) = request(
        app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": username, "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["access"].as_str().unwrap().to_string()
}

async fn create_category(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = request(
        app,
        "POST",
        "/api/categories",
        Some(token),
        Some(json!({"name": name, "description": "test category"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_i64().unwrap()
}

async fn create_course(app: &Router, token: &str, title: &str, category: i64) -> i64 {
    let (status, body) = request(
        app,
        "POST",
        "/api/courses",
        Some(token),
        Some(json!({"title": title, "description": "a course", "category": category})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_probes() {
    let app = spawn_app().await;

    let (status, body) = request(&app, "GET", "/api/system/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "alive");

    let (status, body) = request(&app, "GET", "/api/system/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ready"], true);
    assert_eq!(body["data"]["checks"]["database"], true);

    let (status, body) = request(&app, "GET", "/api/system/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["version"].is_string());
}

#[tokio::test]
async fn test_catalog_reads_are_public_writes_are_not() {
    let app = spawn_app().await;

    let (status, body) = request(&app, "GET", "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, _) = request(&app, "GET", "/api/courses", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "POST",
        "/api/categories",
        None,
        Some(json!({"name": "Math"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication credentials were not provided");

    let (status, _) = request(
        &app,
        "POST",
        "/api/courses",
        None,
        Some(json!({"title": "Algebra", "category": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A malformed bearer token is also rejected.
    let (status, _) = request(
        &app,
        "POST",
        "/api/categories",
        Some("not-a-jwt"),
        Some(json!({"name": "Math"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_category_crud() {
    let app = spawn_app().await;
    let token = signup(&app, "carol", "student").await;

    let id = create_category(&app, &token, "Mathematics").await;

    // Duplicate names are rejected.
    let (status, _) = request(
        &app,
        "POST",
        "/api/categories",
        Some(&token),
        Some(json!({"name": "Mathematics"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request(&app, "GET", &format!("/api/categories/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Mathematics");

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/categories/{id}"),
        Some(&token),
        Some(json!({"description": "numbers and proofs"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "numbers and proofs");
    assert_eq!(body["data"]["name"], "Mathematics");

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/categories/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, "GET", &format!("/api/categories/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_students_cannot_create_courses() {
    let app = spawn_app().await;
    let student = signup(&app, "bob", "student").await;
    let category = create_category(&app, &student, "Science").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/courses",
        Some(&student),
        Some(json!({"title": "Physics", "category": category})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_course_creation_records_caller_as_instructor() {
    let app = spawn_app().await;
    let instructor = signup(&app, "alice", "instructor").await;
    let category = create_category(&app, &instructor, "Science").await;

    // A spoofed instructor field in the body is ignored.
    let (status, body) = request(
        &app,
        "POST",
        "/api/courses",
        Some(&instructor),
        Some(json!({
            "title": "Physics 101",
            "description": "mechanics",
            "category": category,
            "instructor": 9999,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["instructor_name"], "alice");
    assert_eq!(body["data"]["category_name"], "Science");
    assert_eq!(body["data"]["category_detail"]["name"], "Science");
    assert_eq!(body["data"]["instructor_detail"]["username"], "alice");
    // The embedded instructor record never leaks credentials.
    assert!(body["data"]["instructor_detail"].get("password_hash").is_none());

    // The public read shows the same embedded details.
    let id = body["data"]["id"].as_i64().unwrap();
    let (status, body) = request(&app, "GET", &format!("/api/courses/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["instructor_name"], "alice");
    assert_eq!(body["data"]["category_detail"]["id"], category);

    // Unknown category is rejected up front.
    let (status, _) = request(
        &app,
        "POST",
        "/api/courses",
        Some(&instructor),
        Some(json!({"title": "Ghost course", "category": 9999})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_course_mutation_is_owner_or_admin_only() {
    let app = spawn_app().await;
    let alice = signup(&app, "alice", "instructor").await;
    let mallory = signup(&app, "mallory", "instructor").await;

    let category = create_category(&app, &alice, "Science").await;
    let course = create_course(&app, &alice, "Physics 101", category).await;

    // Another instructor cannot touch it.
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/api/courses/{course}"),
        Some(&mallory),
        Some(json!({"title": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/courses/{course}"),
        Some(&mallory),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner can.
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/courses/{course}"),
        Some(&alice),
        Some(json!({"title": "Physics 102"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Physics 102");

    // So can an admin (seeded by the initial migration).
    let (_, body) = request(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "admin", "password": "password"})),
    )
    .await;
    let admin = body["data"]["access"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/courses/{course}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, "GET", &format!("/api/courses/{course}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_enrollment_flow_and_scoped_listing() {
    let app = spawn_app().await;
    let alice = signup(&app, "alice", "instructor").await;
    let bob = signup(&app, "bob", "student").await;
    let carol = signup(&app, "carol", "student").await;

    let category = create_category(&app, &alice, "Science").await;
    let course = create_course(&app, &alice, "Physics 101", category).await;

    // A spoofed student field is ignored; the caller is enrolled.
    let (status, body) = request(
        &app,
        "POST",
        "/api/enrollments",
        Some(&bob),
        Some(json!({"course": course, "student": 9999})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["student_name"], "bob");
    assert_eq!(body["data"]["course_title"], "Physics 101");
    let enrollment = body["data"]["id"].as_i64().unwrap();

    // Enrolling twice in the same course is rejected.
    let (status, _) = request(
        &app,
        "POST",
        "/api/enrollments",
        Some(&bob),
        Some(json!({"course": course})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Enrolling in a course that does not exist is a 404.
    let (status, _) = request(
        &app,
        "POST",
        "/api/enrollments",
        Some(&carol),
        Some(json!({"course": 9999})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bob sees his own enrollment.
    let (status, body) = request(&app, "GET", "/api/enrollments", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["course_detail"]["instructor_name"], "alice");

    // Alice sees it because she owns the course.
    let (status, body) = request(&app, "GET", "/api/enrollments", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["student_name"], "bob");

    // Carol is not involved and sees nothing.
    let (status, body) = request(&app, "GET", "/api/enrollments", Some(&carol), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    // Detail access follows the same scope; out of scope reads as absent.
    let uri = format!("/api/enrollments/{enrollment}");
    let (status, _) = request(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&app, "GET", &uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_enrollment_mutation_is_owner_or_admin_only() {
    let app = spawn_app().await;
    let alice = signup(&app, "alice", "instructor").await;
    let bob = signup(&app, "bob", "student").await;
    let carol = signup(&app, "carol", "student").await;

    let category = create_category(&app, &alice, "Science").await;
    let physics = create_course(&app, &alice, "Physics 101", category).await;
    let chemistry = create_course(&app, &alice, "Chemistry 101", category).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/enrollments",
        Some(&bob),
        Some(json!({"course": physics})),
    )
    .await;
    let enrollment = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/enrollments/{enrollment}");

    // Another student cannot repoint or delete it.
    let (status, _) = request(
        &app,
        "PATCH",
        &uri,
        Some(&carol),
        Some(json!({"course": chemistry})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "DELETE", &uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owning student can move it to another course.
    let (status, body) = request(
        &app,
        "PATCH",
        &uri,
        Some(&bob),
        Some(json!({"course": chemistry})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["course_title"], "Chemistry 101");
    assert_eq!(body["data"]["student_name"], "bob");

    // And drop it.
    let (status, _) = request(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_enrollment_update_rejects_duplicate_course() {
    let app = spawn_app().await;
    let alice = signup(&app, "alice", "instructor").await;
    let bob = signup(&app, "bob", "student").await;

    let category = create_category(&app, &alice, "Science").await;
    let physics = create_course(&app, &alice, "Physics 101", category).await;
    let chemistry = create_course(&app, &alice, "Chemistry 101", category).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/enrollments",
        Some(&bob),
        Some(json!({"course": physics})),
    )
    .await;
    let enrollment = body["data"]["id"].as_i64().unwrap();

    let (status, _) = request(
        &app,
        "POST",
        "/api/enrollments",
        Some(&bob),
        Some(json!({"course": chemistry})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Repointing onto a course bob is already enrolled in is rejected the
    // same way a duplicate create is.
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/enrollments/{enrollment}"),
        Some(&bob),
        Some(json!({"course": chemistry})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already enrolled in this course");

    // Repointing onto its current course is a no-op, not a duplicate.
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/api/enrollments/{enrollment}"),
        Some(&bob),
        Some(json!({"course": physics})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_category_rename_duplicate_rejected() {
    let app = spawn_app().await;
    let token = signup(&app, "carol", "student").await;

    create_category(&app, &token, "Mathematics").await;
    let science = create_category(&app, &token, "Science").await;

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/categories/{science}"),
        Some(&token),
        Some(json!({"name": "Mathematics"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A category with that name already exists");

    // Re-submitting its own name is fine.
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/categories/{science}"),
        Some(&token),
        Some(json!({"name": "Science", "description": "updated"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Science");
}

#[tokio::test]
async fn test_dashboard_stats() {
    let app = spawn_app().await;

    let (status, _) = request(&app, "GET", "/api/dashboard/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let alice = signup(&app, "alice", "instructor").await;
    let bob = signup(&app, "bob", "student").await;

    let category = create_category(&app, &alice, "Science").await;
    let course = create_course(&app, &alice, "Physics 101", category).await;
    let (status, _) = request(
        &app,
        "POST",
        "/api/enrollments",
        Some(&bob),
        Some(json!({"course": course})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(&app, "GET", "/api/dashboard/stats", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let stats = &body["data"];
    // alice + bob + the seeded admin
    assert_eq!(stats["total_users"], 3);
    assert_eq!(stats["total_courses"], 1);
    assert_eq!(stats["total_enrollments"], 1);

    let distribution = stats["role_distribution"].as_array().unwrap();
    let sum: i64 = distribution
        .iter()
        .map(|entry| entry["count"].as_i64().unwrap())
        .sum();
    assert_eq!(sum, 3);
    assert!(
        distribution
            .iter()
            .any(|entry| entry["role"] == "instructor" && entry["count"] == 1)
    );
}
