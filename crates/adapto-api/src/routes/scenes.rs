//! Read-only scene catalog lookups.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use tracing::instrument;

use adapto_narrative::application::views::SceneSummary;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{scene_id}
#[instrument(skip(state))]
async fn get_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
) -> Result<Json<SceneSummary>, ApiError> {
    let scene = state.catalog.load_scene(&scene_id)?;
    Ok(Json(SceneSummary::from(scene)))
}

/// Returns the router for scene lookups.
pub fn router() -> Router<AppState> {
    Router::new().route("/{scene_id}", get(get_scene))
}
