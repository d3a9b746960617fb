//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use adapto_core::clock::Clock;
use adapto_core::generator::ContentGenerator;
use adapto_core::repository::ProgressRepository;
use adapto_narrative::application::orchestrator::OrchestratorConfig;
use adapto_narrative::domain::catalog::SceneCatalog;
use adapto_test_support::{FixedClock, InMemoryProgressRepository, ScriptedContentGenerator};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use adapto_api::routes;
use adapto_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build application state over the built-in catalog.
pub fn build_state(
    repository: Arc<dyn ProgressRepository>,
    generator: Arc<dyn ContentGenerator>,
) -> AppState {
    AppState::new(
        Arc::new(SceneCatalog::builtin().unwrap()),
        repository,
        generator,
        fixed_clock(),
        OrchestratorConfig::default(),
    )
}

/// Build the full app router with an in-memory repository and a generator
/// that always answers with the same line.
pub fn build_test_app() -> Router {
    build_app(
        Arc::new(InMemoryProgressRepository::new()),
        Arc::new(ScriptedContentGenerator::with_dialogue("ADAPTO hums thoughtfully.")),
    )
}

/// Build the full app router over the given collaborators.
pub fn build_app(
    repository: Arc<dyn ProgressRepository>,
    generator: Arc<dyn ContentGenerator>,
) -> Router {
    routes::app(build_state(repository, generator))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
