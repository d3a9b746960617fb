//! Routes for a player's play-through.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use adapto_core::command::Command;
use adapto_core::player::PlayerId;
use adapto_narrative::application::orchestrator::{NarrativeOrchestrator, TransitionResult};
use adapto_narrative::application::views::SceneView;
use adapto_narrative::domain::commands::{RestartGame, SubmitChoice};
use adapto_progress::domain::layout::PersistedProgress;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{player_id}/choices.
#[derive(Debug, Deserialize)]
pub struct SubmitChoiceRequest {
    /// Choice text, choice number, puzzle answer, or free text.
    pub input: String,
    /// Detection to add instead of the catalog's amount.
    #[serde(default)]
    pub detection: Option<u32>,
}

/// Response body for POST /{player_id}/choices.
#[derive(Debug, Serialize)]
pub struct SubmitChoiceResponse {
    /// What the submission did.
    pub transition: TransitionResult,
    /// The scene the player is in now.
    pub view: SceneView,
}

async fn open(state: &AppState, player_id: String) -> Result<Arc<NarrativeOrchestrator>, ApiError> {
    let player_id = PlayerId::parse(player_id)?;
    Ok(state.session(&player_id).await?)
}

/// GET /{player_id}/scene
#[instrument(skip(state))]
async fn get_scene_view(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<SceneView>, ApiError> {
    let orchestrator = open(&state, player_id).await?;
    Ok(Json(orchestrator.scene_view().await))
}

/// POST /{player_id}/choices
#[instrument(skip(state, request))]
async fn submit_choice(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    Json(request): Json<SubmitChoiceRequest>,
) -> Result<Json<SubmitChoiceResponse>, ApiError> {
    let orchestrator = open(&state, player_id).await?;
    let command = SubmitChoice {
        correlation_id: Uuid::new_v4(),
        input: request.input,
        detection: request.detection,
    };

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id,
        "handling command"
    );

    let transition = orchestrator.submit_choice(&command).await?;

    let view = orchestrator.scene_view().await;
    Ok(Json(SubmitChoiceResponse { transition, view }))
}

/// POST /{player_id}/restart
#[instrument(skip(state))]
async fn restart(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<SceneView>, ApiError> {
    let orchestrator = open(&state, player_id).await?;
    let command = RestartGame {
        correlation_id: Uuid::new_v4(),
    };

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id,
        "handling command"
    );

    orchestrator.restart(&command).await?;
    Ok(Json(orchestrator.scene_view().await))
}

/// GET /{player_id}/progress
#[instrument(skip(state))]
async fn get_progress(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<PersistedProgress>, ApiError> {
    let orchestrator = open(&state, player_id).await?;
    Ok(Json(orchestrator.progress().persisted()))
}

/// Returns the router for player play-throughs.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{player_id}/scene", get(get_scene_view))
        .route("/{player_id}/choices", post(submit_choice))
        .route("/{player_id}/restart", post(restart))
        .route("/{player_id}/progress", get(get_progress))
}
