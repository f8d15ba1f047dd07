//! Common test utilities for integration tests.
//!
//! Every test app runs over its own in-memory backend, so tests are
//! independent and need no database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use domain::ports::{Backend, InMemoryBackend};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::{json, Value};
use study_groups_api::{
    app::{create_app, AppState},
    config::Config,
};
use tower::ServiceExt;
use uuid::Uuid;

pub fn test_config() -> Config {
    Config::load_for_test(&[("timer.tick_interval_ms", "1000")]).unwrap()
}

/// Router plus a handle on the store behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryBackend::new());
        Self::with_backend(store.clone(), Backend::from_memory(store))
    }

    pub fn with_backend(store: Arc<InMemoryBackend>, backend: Backend) -> Self {
        let state = AppState::new(test_config(), backend).unwrap();
        Self {
            router: create_app(state),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.send(authed_request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(authed_request(Method::POST, uri, token, Some(body)))
            .await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(authed_request(Method::PATCH, uri, token, Some(body)))
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.send(authed_request(Method::DELETE, uri, token, None))
            .await
    }

    /// Registers a fresh account and returns it signed in.
    pub async fn register(&self, role: &str) -> TestUser {
        let user = TestUser::new(role);
        let response = self
            .send(json_request(
                Method::POST,
                "/api/v1/auth/register",
                json!({
                    "name": user.name,
                    "email": user.email,
                    "password": user.password,
                    "role": role,
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = parse_response_body(response).await;
        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            token: body["access_token"].as_str().unwrap().to_string(),
            ..user
        }
    }

    pub async fn register_student(&self) -> TestUser {
        self.register("student").await
    }

    pub async fn register_admin(&self) -> TestUser {
        self.register("admin").await
    }

    /// Creates a group as `admin` and returns its id.
    pub async fn create_group(&self, admin: &TestUser, name: &str) -> Uuid {
        let response = self
            .post("/api/v1/groups", &admin.token, json!({ "name": name }))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = parse_response_body(response).await;
        body["id"].as_str().unwrap().parse().unwrap()
    }
}

/// Test user data.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub token: String,
}

impl TestUser {
    pub fn new(role: &str) -> Self {
        let email: String = SafeEmail().fake();
        Self {
            id: Uuid::nil(),
            name: Name().fake(),
            // Prefix keeps emails unique across fake draws.
            email: format!("{}_{}", Uuid::new_v4().simple(), email),
            password: "correct-horse-battery".to_string(),
            role: role.to_string(),
            token: String::new(),
        }
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn authed_request(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}
