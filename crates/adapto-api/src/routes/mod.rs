//! Route modules.

pub mod health;
pub mod players;
pub mod scenes;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/scenes", scenes::router())
        .nest("/api/v1/players", players::router())
        .with_state(state)
}
