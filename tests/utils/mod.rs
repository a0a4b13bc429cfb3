// Shared helpers for integration tests

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use gramlet::email::LogMailer;
use gramlet::post::repository::InMemoryPostRepository;
use gramlet::user::repository::InMemoryUserRepository;
use gramlet::{api_router, AppState, TokenConfig};

pub struct TestApp {
    pub router: Router,
    pub user_repository: Arc<InMemoryUserRepository>,
    pub post_repository: Arc<InMemoryPostRepository>,
}

/// Builds the full /api router over fresh in-memory repositories,
/// keeping handles to them so tests can inspect stored state.
pub fn test_app() -> TestApp {
    let user_repository = Arc::new(InMemoryUserRepository::new());
    let post_repository = Arc::new(InMemoryPostRepository::new());

    let state = AppState::new(
        user_repository.clone(),
        post_repository.clone(),
        TokenConfig::new("integration-test-secret", 7),
        Arc::new(LogMailer),
        "http://localhost:3000".to_string(),
    );

    TestApp {
        router: api_router(state),
        user_repository,
        post_repository,
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed_json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Hand-rolls a multipart/form-data body for upload endpoints
pub fn multipart_body(fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    if let Some((content_type, bytes)) = photo {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"photo\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(method: &str, uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

/// Signs up and signs in a user, returning (user_id, token)
pub async fn signup_and_signin(app: &TestApp, name: &str, email: &str, password: &str) -> (String, String) {
    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/signup",
            serde_json::json!({"name": name, "email": email, "password": password}),
        ),
    )
    .await;
    assert_eq!(response.status(), 200, "signup should succeed");

    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/signin",
            serde_json::json!({"email": email, "password": password}),
        ),
    )
    .await;
    assert_eq!(response.status(), 200, "signin should succeed");

    let body: serde_json::Value = body_json(response).await;
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}
