//! Shared fixtures for placement-server integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt;

use placement_common::api::auth::issue_token;
use placement_common::db::init_schema;
use placement_common::time;
use placement_server::submission::{ProfileSubmission, SubmissionRequest};
use placement_server::{build_router, AppState, SubmissionWindow};

pub const SECRET: i64 = 4242;

/// In-memory database with the full schema
///
/// One connection, so every query sees the same memory database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    init_schema(&pool).await.expect("Failed to initialize schema");
    pool
}

pub fn app_with(state: AppState) -> Router {
    build_router(state)
}

/// Open window, permissive transitions, auth enabled
pub async fn create_test_app() -> (Router, SqlitePool) {
    let pool = memory_pool().await;
    let app = app_with(AppState::new(pool.clone(), SECRET, SubmissionWindow::always_open()));
    (app, pool)
}

pub fn admin_token() -> String {
    issue_token("registrar", time::now_millis() + 60 * 60 * 1000, SECRET).unwrap()
}

pub fn valid_body() -> Value {
    json!({
        "fullName": "Asha Kumari",
        "fatherName": "Ramesh Kumar",
        "registrationNumber": "21105128007",
        "email": "asha.kumari@example.com",
        "phone": "9876543210",
        "alternatePhone": "9123456780",
        "gender": "Female",
        "dateOfBirth": "2003-04-15",
        "branch": "EEE",
        "college": "NCE_Chandi",
        "batch": "2021-2025",
        "currentCgpa": 8.42,
        "activeBacklogs": 0,
        "nationalId": "123412341234",
        "secondaryPercentage": "91.2",
        "secondaryInstitute": "DAV Public School",
        "secondaryBoard": "CBSE",
        "higherSecondaryPercentage": "84.0",
        "higherSecondaryInstitute": "Science College",
        "higherSecondaryBoard": "BSEB"
    })
}

/// A second candidate sharing no identifier with `valid_body`
pub fn other_body() -> Value {
    let mut body = valid_body();
    body["fullName"] = json!("Ravi Shankar");
    body["registrationNumber"] = json!("21105128042");
    body["email"] = json!("ravi@example.com");
    body["nationalId"] = json!("999988887777");
    body
}

pub fn submission(body: Value) -> ProfileSubmission {
    serde_json::from_value::<SubmissionRequest>(body)
        .unwrap()
        .validate()
        .unwrap()
}

/// Send one request and decode the JSON response body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Submit `body` and return the created or updated profile JSON
pub async fn submit(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, "POST", "/api/v1/placement/submit", Some(body), None).await
}
