//! HTTP content generator.
//!
//! `POST {base}/api/generate-dialogue/{scene}` with a camelCase JSON body of
//! `{userChoice, previousChoices, nextScene, trustLevel, suspicionLevel}`.
//! The reply is `{dialogue, choices?, nextScene?}`.

use std::time::Duration;

use adapto_core::generator::{ContentError, ContentGenerator, ContentRequest, GeneratedContent};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Connection settings for the content service.
#[derive(Debug, Clone)]
pub struct HttpContentGeneratorConfig {
    /// Base URL, without the `/api/...` suffix.
    pub base_url: String,
    /// Sent as the `api-key` header when present.
    pub api_key: Option<String>,
    /// Bound on the whole request, including the body.
    pub timeout: Duration,
}

/// Content generator backed by the dialogue generation service.
#[derive(Debug, Clone)]
pub struct HttpContentGenerator {
    config: HttpContentGeneratorConfig,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateDialogueBody<'a> {
    user_choice: Option<&'a str>,
    previous_choices: &'a [String],
    next_scene: &'a str,
    trust_level: f64,
    suspicion_level: f64,
}

impl HttpContentGenerator {
    /// Builds a generator with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest::Error` if the HTTP client cannot be
    /// constructed (for example, TLS backend initialization fails).
    pub fn new(config: HttpContentGeneratorConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("adapto/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, scene: &str) -> String {
        format!(
            "{}/api/generate-dialogue/{scene}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn transport_error(&self, error: &reqwest::Error) -> ContentError {
        if error.is_timeout() {
            ContentError::Timeout(self.config.timeout)
        } else {
            ContentError::Unavailable(error.to_string())
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        let url = self.endpoint(&request.scene);
        debug!(url = %url, scene = %request.scene, "requesting generated content");

        let body = GenerateDialogueBody {
            user_choice: request.user_choice.as_deref(),
            previous_choices: &request.previous_choices,
            next_scene: &request.next_scene,
            trust_level: request.trust_level,
            suspicion_level: request.suspicion_level,
        };

        let mut builder = self.http_client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("api-key", api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Unavailable(format!("HTTP {status} from {url}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let content: GeneratedContent = serde_json::from_str(&text)
            .map_err(|e| ContentError::Malformed(e.to_string()))?;

        if content.dialogue.trim().is_empty() {
            return Err(ContentError::Malformed("dialogue is blank".to_owned()));
        }
        Ok(content)
    }
}
