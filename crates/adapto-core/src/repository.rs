//! Progress repository abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::player::PlayerId;

/// Well-known key under which a player's progress record is stored.
pub const PROGRESS_STORAGE_KEY: &str = "adapto-game-progress";

/// Stored representation of a player's progress record.
///
/// The payload is kept as raw JSON so that the progress context can validate
/// it on load instead of trusting whatever the storage layer returned.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProgress {
    /// Player the record belongs to.
    pub player_id: PlayerId,
    /// Serialized progress record.
    pub payload: serde_json::Value,
    /// Timestamp of the last write.
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for loading and saving durable progress records.
///
/// Writes are whole-record replacements; concurrent writers for the same
/// player resolve as last-write-wins.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the stored record for a player, if any.
    async fn load_progress(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<StoredProgress>, DomainError>;

    /// Replace the stored record for a player.
    async fn save_progress(&self, progress: &StoredProgress) -> Result<(), DomainError>;
}
