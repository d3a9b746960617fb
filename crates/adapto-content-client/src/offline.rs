//! Generator used when no content service is configured.

use adapto_core::generator::{ContentError, ContentGenerator, ContentRequest, GeneratedContent};
use async_trait::async_trait;

/// Always reports the generator as unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineContentGenerator;

#[async_trait]
impl ContentGenerator for OfflineContentGenerator {
    async fn generate(&self, _request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        Err(ContentError::Unavailable(
            "no content generator configured".to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_generator_is_always_unavailable() {
        let request = ContentRequest {
            scene: "awaken".to_owned(),
            user_choice: None,
            previous_choices: Vec::new(),
            next_scene: "trust".to_owned(),
            trust_level: 0.5,
            suspicion_level: 0.2,
        };

        let result = OfflineContentGenerator.generate(&request).await;

        assert_eq!(
            result.unwrap_err(),
            ContentError::Unavailable("no content generator configured".to_owned())
        );
    }
}
