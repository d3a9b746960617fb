//! External content generator abstraction.
//!
//! The content generator supplies dynamic dialogue, replacement choices, and
//! optionally an explicit next-scene override. It is an untrusted, fallible
//! collaborator: every failure mode is reported as a [`ContentError`] and the
//! narrative context is expected to fall back to static content.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input sent to the content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    /// Scene the player acted in.
    pub scene: String,
    /// The text the player submitted, if any.
    pub user_choice: Option<String>,
    /// Previously submitted choice texts, oldest first.
    pub previous_choices: Vec<String>,
    /// Destination the static transition table picked.
    pub next_scene: String,
    /// Trust level derived from the tagged choice history, in `[0, 1]`.
    pub trust_level: f64,
    /// Suspicion level derived from the tagged choice history, in `[0, 1]`.
    pub suspicion_level: f64,
}

/// A choice produced by the content generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedChoice {
    /// Choice label.
    pub text: String,
    /// Short explanation shown under the label.
    #[serde(default)]
    pub description: String,
}

/// Content returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    /// Dialogue text replacing the scene's default dialogue.
    pub dialogue: String,
    /// Replacement choices, if the generator produced any.
    #[serde(default)]
    pub choices: Option<Vec<GeneratedChoice>>,
    /// Explicit destination override.
    #[serde(default, alias = "nextSceneOverride")]
    pub next_scene: Option<String>,
}

/// Failure modes of the content generator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    /// The generator could not be reached or rejected the request.
    #[error("content generator unavailable: {0}")]
    Unavailable(String),

    /// The generator did not answer within the allowed time.
    #[error("content generator timed out after {0:?}")]
    Timeout(Duration),

    /// The generator answered with something that is not usable content.
    #[error("content generator returned malformed content: {0}")]
    Malformed(String),
}

/// The external content generation collaborator.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate supplemental content for a transition.
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, ContentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_content_accepts_next_scene_override_alias() {
        let json = serde_json::json!({
            "dialogue": "The archive hums.",
            "nextSceneOverride": "leak"
        });

        let content: GeneratedContent = serde_json::from_value(json).unwrap();

        assert_eq!(content.next_scene.as_deref(), Some("leak"));
        assert!(content.choices.is_none());
    }

    #[test]
    fn test_content_request_serializes_camel_case() {
        let request = ContentRequest {
            scene: "trust".to_owned(),
            user_choice: Some("→ Challenge the assessment".to_owned()),
            previous_choices: vec!["→ Begin".to_owned()],
            next_scene: "leak".to_owned(),
            trust_level: 0.35,
            suspicion_level: 0.5,
        };

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["userChoice"], "→ Challenge the assessment");
        assert_eq!(value["previousChoices"][0], "→ Begin");
        assert_eq!(value["nextScene"], "leak");
    }
}
