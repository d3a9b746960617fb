//! Test content generators — mock `ContentGenerator` implementations.

use std::sync::Mutex;
use std::time::Duration;

use adapto_core::generator::{ContentError, ContentGenerator, ContentRequest, GeneratedContent};
use async_trait::async_trait;
use tokio::sync::Notify;

/// A generator that returns a configured result on every call and records the
/// requests it receives.
#[derive(Debug)]
pub struct ScriptedContentGenerator {
    result: Result<GeneratedContent, ContentError>,
    requests: Mutex<Vec<ContentRequest>>,
}

impl ScriptedContentGenerator {
    /// Create a generator that always answers with `result`.
    #[must_use]
    pub fn new(result: Result<GeneratedContent, ContentError>) -> Self {
        Self {
            result,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a generator that always answers with `dialogue` and nothing else.
    #[must_use]
    pub fn with_dialogue(dialogue: &str) -> Self {
        Self::new(Ok(GeneratedContent {
            dialogue: dialogue.to_owned(),
            choices: None,
            next_scene: None,
        }))
    }

    /// Returns a snapshot of every request received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedContentGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        self.requests.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}

/// A generator that is always unavailable.
#[derive(Debug)]
pub struct FailingContentGenerator;

#[async_trait]
impl ContentGenerator for FailingContentGenerator {
    async fn generate(&self, _request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        Err(ContentError::Unavailable("connection refused".into()))
    }
}

/// A generator that sleeps for a fixed delay before answering. Pair it with a
/// shorter content timeout to exercise the timeout path.
#[derive(Debug)]
pub struct SlowContentGenerator(pub Duration);

#[async_trait]
impl ContentGenerator for SlowContentGenerator {
    async fn generate(&self, _request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        tokio::time::sleep(self.0).await;
        Ok(GeneratedContent {
            dialogue: "late reply".to_owned(),
            choices: None,
            next_scene: None,
        })
    }
}

/// A generator that blocks until the test releases it.
///
/// `started()` resolves once a request has arrived; `release()` lets the
/// pending call return `dialogue`. Used to interleave restarts and duplicate
/// submissions with an in-flight request.
#[derive(Debug)]
pub struct GatedContentGenerator {
    dialogue: String,
    started: Notify,
    release: Notify,
}

impl GatedContentGenerator {
    /// Create a gated generator answering with `dialogue` once released.
    #[must_use]
    pub fn new(dialogue: &str) -> Self {
        Self {
            dialogue: dialogue.to_owned(),
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Waits until a request is pending inside the generator.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Lets the pending request complete.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl ContentGenerator for GatedContentGenerator {
    async fn generate(&self, _request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(GeneratedContent {
            dialogue: self.dialogue.clone(),
            choices: None,
            next_scene: None,
        })
    }
}
