//! Integration tests for the signed-in user's profile.

mod common;

use axum::http::StatusCode;
use common::{parse_response_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_get_me() {
    let app = TestApp::new();
    let user = app.register_student().await;

    let response = app.get("/api/v1/users/me", &user.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(body["name"], user.name.trim());
    assert_eq!(body["role"], "student");
}

#[tokio::test]
async fn test_rename_me() {
    let app = TestApp::new();
    let user = app.register_student().await;

    let response = app
        .patch("/api/v1/users/me", &user.token, json!({ "name": "  Renamed Student  " }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["name"], "Renamed Student");

    let me = parse_response_body(app.get("/api/v1/users/me", &user.token).await).await;
    assert_eq!(me["name"], "Renamed Student");
}

#[tokio::test]
async fn test_rename_me_rejects_blank_name() {
    let app = TestApp::new();
    let user = app.register_student().await;

    let response = app
        .patch("/api/v1/users/me", &user.token, json!({ "name": "   " }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_starts_empty() {
    let app = TestApp::new();
    let user = app.register_student().await;

    let response = app.get("/api/v1/users/me/summary", &user.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["session_count"], 0);
    assert_eq!(body["total_time_studied"], 0);
    assert!(body["group_id"].is_null());
}
