//! Integration tests for `PgProgressRepository`.

use adapto_core::player::PlayerId;
use adapto_core::repository::{ProgressRepository, StoredProgress};
use adapto_progress_store::pg_progress_repository::PgProgressRepository;
use chrono::{TimeZone, Utc};
use sqlx::PgPool;

fn progress(player: &str, detection: i64, hour: u32) -> StoredProgress {
    StoredProgress {
        player_id: PlayerId::parse(player).unwrap(),
        payload: serde_json::json!({
            "pathCompletionFlags": {"echo_node": true, "glitch_path": false},
            "detectionCount": detection,
            "coreUnlocked": false
        }),
        updated_at: Utc.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_load_returns_none_for_unknown_player(pool: PgPool) {
    let repo = PgProgressRepository::new(pool);

    let loaded = repo
        .load_progress(&PlayerId::parse("nobody").unwrap())
        .await
        .unwrap();

    assert!(loaded.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_save_then_load_returns_same_record(pool: PgPool) {
    let repo = PgProgressRepository::new(pool);
    let record = progress("player-1", 2, 10);

    repo.save_progress(&record).await.unwrap();
    let loaded = repo
        .load_progress(&record.player_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded, record);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_second_save_replaces_first(pool: PgPool) {
    let repo = PgProgressRepository::new(pool);
    repo.save_progress(&progress("player-1", 1, 10)).await.unwrap();
    let latest = progress("player-1", 4, 11);

    repo.save_progress(&latest).await.unwrap();
    let loaded = repo
        .load_progress(&latest.player_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded.payload["detectionCount"], 4);
    assert_eq!(loaded.updated_at, latest.updated_at);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_players_are_isolated(pool: PgPool) {
    let repo = PgProgressRepository::new(pool);
    repo.save_progress(&progress("alice", 3, 10)).await.unwrap();

    let other = repo
        .load_progress(&PlayerId::parse("bob").unwrap())
        .await
        .unwrap();

    assert!(other.is_none());
}
