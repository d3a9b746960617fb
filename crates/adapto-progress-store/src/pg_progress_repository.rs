//! `PostgreSQL` implementation of the `ProgressRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use adapto_core::error::DomainError;
use adapto_core::player::PlayerId;
use adapto_core::repository::{PROGRESS_STORAGE_KEY, ProgressRepository, StoredProgress};

/// PostgreSQL-backed progress repository.
///
/// Each player has one row under [`PROGRESS_STORAGE_KEY`]; saves replace it.
#[derive(Debug, Clone)]
pub struct PgProgressRepository {
    pool: PgPool,
}

impl PgProgressRepository {
    /// Creates a new `PgProgressRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infrastructure(err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn load_progress(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<StoredProgress>, DomainError> {
        let row: Option<(serde_json::Value, DateTime<Utc>)> = sqlx::query_as(
            "SELECT payload, updated_at FROM player_progress \
             WHERE player_id = $1 AND storage_key = $2",
        )
        .bind(player_id.as_str())
        .bind(PROGRESS_STORAGE_KEY)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        debug!(player_id = %player_id, found = row.is_some(), "loaded progress row");

        Ok(row.map(|(payload, updated_at)| StoredProgress {
            player_id: player_id.clone(),
            payload,
            updated_at,
        }))
    }

    async fn save_progress(&self, progress: &StoredProgress) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO player_progress (player_id, storage_key, payload, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (player_id, storage_key) \
             DO UPDATE SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at",
        )
        .bind(progress.player_id.as_str())
        .bind(PROGRESS_STORAGE_KEY)
        .bind(&progress.payload)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        debug!(player_id = %progress.player_id, "saved progress row");
        Ok(())
    }
}
