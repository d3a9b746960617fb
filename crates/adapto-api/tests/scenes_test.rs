//! Integration tests for scene catalog lookups.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_get_scene_returns_definition_without_answers() {
    let app = common::build_test_app();

    let (status, json) = common::get_json(app, "/api/v1/scenes/echo_node").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "echo_node");
    assert_eq!(json["is_choice_scene"], false);
    assert_eq!(json["puzzle_prompt"], "Enter the timestamp of the erased memory");
    assert_eq!(json["risk"], true);
    assert!(json.get("accepted_answers").is_none());
    assert!(!json.to_string().contains("2157.03.15"));
}

#[tokio::test]
async fn test_get_choice_scene_lists_authored_choices() {
    let app = common::build_test_app();

    let (status, json) = common::get_json(app, "/api/v1/scenes/awaken").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["dynamic"], true);
    let choices = json["choices"].as_array().unwrap();
    assert_eq!(choices.len(), 3);
    assert_eq!(choices[0]["number"], 1);
    assert_eq!(choices[0]["text"], "→ Ask what ADAPTO wants");
}

#[tokio::test]
async fn test_get_unknown_scene_returns_404() {
    let app = common::build_test_app();

    let (status, json) = common::get_json(app, "/api/v1/scenes/nowhere").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_scene");
}
