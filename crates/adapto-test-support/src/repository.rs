//! Test repositories — mock `ProgressRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use adapto_core::error::DomainError;
use adapto_core::player::PlayerId;
use adapto_core::repository::{ProgressRepository, StoredProgress};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

/// A progress repository backed by a map. Every save is recorded so tests can
/// assert on write counts and on the exact payloads written.
#[derive(Debug, Default)]
pub struct InMemoryProgressRepository {
    records: Mutex<HashMap<PlayerId, StoredProgress>>,
    saves: Mutex<Vec<StoredProgress>>,
    reject_saves: AtomicBool,
}

impl InMemoryProgressRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository that already holds `payload` for `player_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn seeded(player_id: &PlayerId, payload: serde_json::Value) -> Self {
        let repo = Self::new();
        repo.records.lock().unwrap().insert(
            player_id.clone(),
            StoredProgress {
                player_id: player_id.clone(),
                payload,
                updated_at: seed_timestamp(),
            },
        );
        repo
    }

    /// Returns the payload currently stored for a player.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored_payload(&self, player_id: &PlayerId) -> Option<serde_json::Value> {
        self.records
            .lock()
            .unwrap()
            .get(player_id)
            .map(|record| record.payload.clone())
    }

    /// Returns a snapshot of every record that was saved, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<StoredProgress> {
        self.saves.lock().unwrap().clone()
    }

    /// Makes every following save fail with an infrastructure error until
    /// called again with `false`. Loads keep working.
    pub fn reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }

    /// Returns how many saves were performed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }
}

fn seed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn load_progress(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<StoredProgress>, DomainError> {
        Ok(self.records.lock().unwrap().get(player_id).cloned())
    }

    async fn save_progress(&self, progress: &StoredProgress) -> Result<(), DomainError> {
        if self.reject_saves.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("connection refused".into()));
        }
        self.records
            .lock()
            .unwrap()
            .insert(progress.player_id.clone(), progress.clone());
        self.saves.lock().unwrap().push(progress.clone());
        Ok(())
    }
}

/// A progress repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingProgressRepository;

#[async_trait]
impl ProgressRepository for FailingProgressRepository {
    async fn load_progress(
        &self,
        _player_id: &PlayerId,
    ) -> Result<Option<StoredProgress>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save_progress(&self, _progress: &StoredProgress) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// An in-memory repository whose next save can be held open after the write
/// has landed, so tests can abandon a caller while the save is in flight.
#[derive(Debug, Default)]
pub struct StallingProgressRepository {
    inner: InMemoryProgressRepository,
    armed: AtomicBool,
    committed: Notify,
    release: Notify,
}

impl StallingProgressRepository {
    /// Create an empty, unarmed repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stall the next save after it has been written.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once an armed save has been written and is stalled.
    pub async fn committed(&self) {
        self.committed.notified().await;
    }

    /// Lets a stalled save return.
    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Returns the payload currently stored for a player.
    pub fn stored_payload(&self, player_id: &PlayerId) -> Option<serde_json::Value> {
        self.inner.stored_payload(player_id)
    }

    /// Returns how many saves were performed.
    pub fn save_count(&self) -> usize {
        self.inner.save_count()
    }
}

#[async_trait]
impl ProgressRepository for StallingProgressRepository {
    async fn load_progress(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<StoredProgress>, DomainError> {
        self.inner.load_progress(player_id).await
    }

    async fn save_progress(&self, progress: &StoredProgress) -> Result<(), DomainError> {
        self.inner.save_progress(progress).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.committed.notify_one();
            self.release.notified().await;
        }
        Ok(())
    }
}
