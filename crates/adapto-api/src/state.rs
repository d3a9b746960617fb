//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use adapto_core::clock::Clock;
use adapto_core::error::DomainError;
use adapto_core::generator::ContentGenerator;
use adapto_core::player::PlayerId;
use adapto_core::repository::ProgressRepository;
use adapto_narrative::application::orchestrator::{NarrativeOrchestrator, OrchestratorConfig};
use adapto_narrative::domain::catalog::SceneCatalog;
use adapto_progress::application::store::ProgressStore;
use tokio::sync::Mutex;
use tracing::info;

/// How long an unused play-through stays registered by default.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    orchestrator: Arc<NarrativeOrchestrator>,
    last_used: Instant,
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Scene catalog loaded at startup.
    pub catalog: Arc<SceneCatalog>,
    /// Durable progress storage.
    pub progress_repository: Arc<dyn ProgressRepository>,
    /// Content generator collaborator.
    pub generator: Arc<dyn ContentGenerator>,
    /// Clock for event timestamps and progress writes.
    pub clock: Arc<dyn Clock>,
    /// Tunables handed to each orchestrator.
    pub orchestrator_config: OrchestratorConfig,
    session_idle_timeout: Duration,
    sessions: Arc<Mutex<HashMap<PlayerId, SessionEntry>>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("catalog_version", &self.catalog.version_hash())
            .field("orchestrator_config", &self.orchestrator_config)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state with an empty session registry.
    #[must_use]
    pub fn new(
        catalog: Arc<SceneCatalog>,
        progress_repository: Arc<dyn ProgressRepository>,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn Clock>,
        orchestrator_config: OrchestratorConfig,
    ) -> Self {
        Self {
            catalog,
            progress_repository,
            generator,
            clock,
            orchestrator_config,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sets how long a play-through may sit unused before
    /// [`Self::evict_idle`] drops it.
    #[must_use]
    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// Returns the player's play-through, opening it on first use.
    ///
    /// Progress is loaded without holding the registry lock. If two requests
    /// open the same player at once, the first one registered is kept.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the player's progress cannot
    /// be read. Nothing is registered in that case.
    pub async fn session(
        &self,
        player_id: &PlayerId,
    ) -> Result<Arc<NarrativeOrchestrator>, DomainError> {
        if let Some(entry) = self.sessions.lock().await.get_mut(player_id) {
            entry.last_used = Instant::now();
            return Ok(Arc::clone(&entry.orchestrator));
        }

        let progress = ProgressStore::load(
            player_id.clone(),
            Arc::clone(&self.progress_repository),
            self.catalog.progress_rules(),
            Arc::clone(&self.clock),
        )
        .await?;
        let opened = Arc::new(NarrativeOrchestrator::open(
            Arc::clone(&self.catalog),
            progress,
            Arc::clone(&self.generator),
            Arc::clone(&self.clock),
            self.orchestrator_config.clone(),
        ));

        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(player_id.clone())
            .or_insert_with(|| SessionEntry {
                orchestrator: Arc::clone(&opened),
                last_used: Instant::now(),
            });
        entry.last_used = Instant::now();
        let orchestrator = Arc::clone(&entry.orchestrator);
        if Arc::ptr_eq(&orchestrator, &opened) {
            info!(player_id = %player_id, active_sessions = sessions.len(), "session opened");
        }
        Ok(orchestrator)
    }

    /// Drops every play-through that has been unused for longer than the idle
    /// timeout and is not held by a request. Returns how many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            Arc::strong_count(&entry.orchestrator) > 1
                || entry.last_used.elapsed() < self.session_idle_timeout
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, active_sessions = sessions.len(), "idle sessions evicted");
        }
        evicted
    }

    /// Number of registered play-throughs.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use adapto_core::player::PlayerId;
    use adapto_core::repository::StoredProgress;
    use adapto_test_support::{
        FixedClock, InMemoryProgressRepository, ScriptedContentGenerator,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tokio::sync::Notify;

    use super::*;

    fn state_with(repository: Arc<dyn ProgressRepository>) -> AppState {
        AppState::new(
            Arc::new(SceneCatalog::builtin().unwrap()),
            repository,
            Arc::new(ScriptedContentGenerator::with_dialogue("ADAPTO watches.")),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
            OrchestratorConfig::default(),
        )
    }

    fn player(id: &str) -> PlayerId {
        PlayerId::parse(id).unwrap()
    }

    /// Holds loads for one player until released.
    #[derive(Debug, Default)]
    struct HeldLoadRepository {
        inner: InMemoryProgressRepository,
        release: Notify,
    }

    #[async_trait]
    impl ProgressRepository for HeldLoadRepository {
        async fn load_progress(
            &self,
            player_id: &PlayerId,
        ) -> Result<Option<StoredProgress>, DomainError> {
            if player_id.as_str() == "held" {
                self.release.notified().await;
            }
            self.inner.load_progress(player_id).await
        }

        async fn save_progress(&self, progress: &StoredProgress) -> Result<(), DomainError> {
            self.inner.save_progress(progress).await
        }
    }

    #[tokio::test]
    async fn test_session_returns_the_same_play_through_on_reuse() {
        // Arrange
        let state = state_with(Arc::new(InMemoryProgressRepository::new()));

        // Act
        let first = state.session(&player("player-1")).await.unwrap();
        let second = state.session(&player("player-1")).await.unwrap();

        // Assert
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_slow_load_does_not_block_other_players() {
        // Arrange
        let repo = Arc::new(HeldLoadRepository::default());
        let state = state_with(repo.clone());
        let held = tokio::spawn({
            let state = state.clone();
            async move { state.session(&player("held")).await }
        });
        tokio::task::yield_now().await;

        // Act
        let other = tokio::time::timeout(
            Duration::from_secs(1),
            state.session(&player("player-1")),
        )
        .await;

        // Assert
        assert!(other.unwrap().is_ok());
        repo.release.notify_one();
        held.await.unwrap().unwrap();
        assert_eq!(state.active_sessions().await, 2);
    }

    #[tokio::test]
    async fn test_evict_idle_drops_unused_sessions_but_keeps_held_ones() {
        // Arrange
        let state = state_with(Arc::new(InMemoryProgressRepository::new()))
            .with_session_idle_timeout(Duration::ZERO);
        let held = state.session(&player("player-1")).await.unwrap();
        drop(state.session(&player("player-2")).await.unwrap());

        // Act
        let evicted = state.evict_idle().await;

        // Assert
        assert_eq!(evicted, 1);
        assert_eq!(state.active_sessions().await, 1);
        let again = state.session(&player("player-1")).await.unwrap();
        assert!(Arc::ptr_eq(&held, &again));
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_recently_used_sessions() {
        let state = state_with(Arc::new(InMemoryProgressRepository::new()));
        drop(state.session(&player("player-1")).await.unwrap());

        let evicted = state.evict_idle().await;

        assert_eq!(evicted, 0);
        assert_eq!(state.active_sessions().await, 1);
    }
}
