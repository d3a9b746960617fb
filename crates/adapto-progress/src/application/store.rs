//! The `ProgressStore` service.
//!
//! Owns one player's progress record for the lifetime of a session. Reads are
//! synchronous snapshots; every mutation builds the next record, persists it
//! through the injected repository, and only then publishes it, so observers
//! either see the whole previous record or the whole next one.
//!
//! Known limitation: two stores opened for the same player (for example two
//! browser tabs served by different processes) do not coordinate. Each write
//! replaces the whole stored record, so the last writer wins.

use std::sync::{Arc, PoisonError, RwLock};

use adapto_core::clock::Clock;
use adapto_core::error::DomainError;
use adapto_core::player::PlayerId;
use adapto_core::repository::{ProgressRepository, StoredProgress};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, warn};

use crate::domain::layout::{self, PersistedProgress};
use crate::domain::record::{ProgressRecord, ProgressRules};

/// Side effects a single transition applies to progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressEffects {
    /// Amount to add to the detection meter.
    pub detection: u32,
    /// Path to mark complete.
    pub complete_path: Option<String>,
}

/// What applying a set of effects changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressChange {
    /// Detection count before the change.
    pub previous_detection: u32,
    /// Detection count after clamping.
    pub detection_count: u32,
    /// Whether the requested path went from incomplete to complete.
    pub path_newly_completed: bool,
    /// Whether the meter is at its ceiling after the change.
    pub detected: bool,
}

/// Per-player progress with an explicit load/save lifecycle.
///
/// Each write runs on its own task, so a caller that stops waiting never
/// leaves the stored record and the in-memory record out of step.
pub struct ProgressStore {
    shared: Arc<Shared>,
}

struct Shared {
    player_id: PlayerId,
    rules: ProgressRules,
    repository: Arc<dyn ProgressRepository>,
    clock: Arc<dyn Clock>,
    current: RwLock<ProgressRecord>,
    writer: Mutex<()>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("player_id", &self.shared.player_id)
            .field("rules", &self.shared.rules)
            .field("current", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl ProgressStore {
    /// Loads a player's record, validating whatever was stored.
    ///
    /// Corrupted documents are coerced to safe defaults and logged rather than
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository cannot be read.
    pub async fn load(
        player_id: PlayerId,
        repository: Arc<dyn ProgressRepository>,
        rules: ProgressRules,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        let record = match repository.load_progress(&player_id).await? {
            Some(stored) => {
                let (record, issue) = layout::decode(&stored.payload, &rules);
                if let Some(issue) = issue {
                    warn!(player_id = %player_id, error = %issue, "coerced corrupted progress record");
                }
                record
            }
            None => {
                debug!(player_id = %player_id, "no stored progress, starting fresh");
                ProgressRecord::initial(&rules)
            }
        };

        Ok(Self {
            shared: Arc::new(Shared {
                player_id,
                rules,
                repository,
                clock,
                current: RwLock::new(record),
                writer: Mutex::new(()),
            }),
        })
    }

    /// The player this store belongs to.
    #[must_use]
    pub fn player_id(&self) -> &PlayerId {
        &self.shared.player_id
    }

    /// The rules this store evaluates against.
    #[must_use]
    pub fn rules(&self) -> &ProgressRules {
        &self.shared.rules
    }

    /// A consistent copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> ProgressRecord {
        self.shared.snapshot()
    }

    /// The current record in its persisted layout.
    #[must_use]
    pub fn persisted(&self) -> PersistedProgress {
        PersistedProgress::from_record(&self.snapshot(), &self.shared.rules)
    }

    /// Current value of the detection meter.
    #[must_use]
    pub fn detection_count(&self) -> u32 {
        self.snapshot().detection_count()
    }

    /// Whether the detection meter has reached its ceiling.
    #[must_use]
    pub fn is_detected(&self) -> bool {
        self.snapshot().is_detected(&self.shared.rules)
    }

    /// Whether every required path is complete.
    #[must_use]
    pub fn can_access_core(&self) -> bool {
        self.snapshot().core_unlocked(&self.shared.rules)
    }

    /// Adds to the detection meter and returns the clamped count.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be saved; the
    /// in-memory record is left unchanged in that case.
    pub async fn increase_detection(&self, amount: u32) -> Result<u32, DomainError> {
        let change = self
            .apply(&ProgressEffects {
                detection: amount,
                complete_path: None,
            })
            .await?;
        Ok(change.detection_count)
    }

    /// Marks a path complete.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be saved.
    pub async fn mark_path_complete(&self, path: &str) -> Result<(), DomainError> {
        self.apply(&ProgressEffects {
            detection: 0,
            complete_path: Some(path.to_owned()),
        })
        .await?;
        Ok(())
    }

    /// Applies every effect of a transition as one write.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be saved; the
    /// in-memory record is left unchanged in that case.
    pub async fn apply(&self, effects: &ProgressEffects) -> Result<ProgressChange, DomainError> {
        let shared = Arc::clone(&self.shared);
        let effects = effects.clone();
        run_write(async move { shared.apply(&effects).await }).await
    }

    /// Clears every flag and the detection meter in one write.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be saved; the
    /// in-memory record is left unchanged in that case.
    pub async fn reset(&self) -> Result<(), DomainError> {
        let shared = Arc::clone(&self.shared);
        run_write(async move { shared.reset().await }).await
    }
}

/// Runs a write to completion on its own task.
async fn run_write<T, F>(write: F) -> Result<T, DomainError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, DomainError>> + Send + 'static,
{
    tokio::spawn(write.in_current_span())
        .await
        .map_err(|e| DomainError::Infrastructure(format!("progress write task failed: {e}")))?
}

impl Shared {
    fn snapshot(&self) -> ProgressRecord {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn apply(&self, effects: &ProgressEffects) -> Result<ProgressChange, DomainError> {
        let _guard = self.writer.lock().await;

        let mut next = self.snapshot();
        let previous_detection = next.detection_count();
        let detection_count = next.add_detection(effects.detection, &self.rules);
        let path_newly_completed = effects
            .complete_path
            .as_deref()
            .is_some_and(|path| next.complete_path(path));

        let change = ProgressChange {
            previous_detection,
            detection_count,
            path_newly_completed,
            detected: next.is_detected(&self.rules),
        };

        if detection_count == previous_detection && !path_newly_completed {
            return Ok(change);
        }

        self.publish(next).await?;
        debug!(
            player_id = %self.player_id,
            detection_count,
            path_newly_completed,
            "progress updated"
        );
        Ok(change)
    }

    async fn reset(&self) -> Result<(), DomainError> {
        let _guard = self.writer.lock().await;
        self.publish(ProgressRecord::initial(&self.rules)).await?;
        info!(player_id = %self.player_id, "progress reset");
        Ok(())
    }

    /// Persists `next` and then swaps it in. Callers hold the writer lock.
    async fn publish(&self, next: ProgressRecord) -> Result<(), DomainError> {
        let payload = PersistedProgress::from_record(&next, &self.rules)
            .to_payload()
            .map_err(|e| DomainError::Infrastructure(format!("cannot encode progress: {e}")))?;
        let stored = StoredProgress {
            player_id: self.player_id.clone(),
            payload,
            updated_at: self.clock.now(),
        };
        self.repository.save_progress(&stored).await?;
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }
}
