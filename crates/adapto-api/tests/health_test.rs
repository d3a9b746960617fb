//! Integration tests for the health endpoint.

mod common;

use adapto_narrative::domain::catalog::SceneCatalog;
use axum::http::StatusCode;

#[tokio::test]
async fn test_health_reports_status_version_and_catalog_hash() {
    let app = common::build_test_app();

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(
        json["catalog_version"],
        SceneCatalog::builtin().unwrap().version_hash()
    );
}
