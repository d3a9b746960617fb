//! Adapto API server entry point.

use std::sync::Arc;
use std::time::Duration;

use adapto_api::config::Config;
use adapto_api::error::AppError;
use adapto_api::routes;
use adapto_api::state::AppState;
use adapto_api::telemetry;
use adapto_content_client::{
    HttpContentGenerator, HttpContentGeneratorConfig, OfflineContentGenerator,
};
use adapto_core::clock::SystemClock;
use adapto_core::generator::ContentGenerator;
use adapto_narrative::application::orchestrator::OrchestratorConfig;
use adapto_narrative::domain::catalog::SceneCatalog;
use adapto_progress_store::MIGRATOR;
use adapto_progress_store::pg_progress_repository::PgProgressRepository;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Adapto API server");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    let catalog = match &config.scene_catalog_path {
        Some(path) => SceneCatalog::from_path(path)?,
        None => SceneCatalog::builtin()?,
    };
    tracing::info!(
        scenes = catalog.len(),
        catalog_version = catalog.version_hash(),
        "scene catalog loaded"
    );

    let generator: Arc<dyn ContentGenerator> = match &config.content_generator_url {
        Some(base_url) => {
            tracing::info!(base_url = %base_url, "using HTTP content generator");
            Arc::new(
                HttpContentGenerator::new(HttpContentGeneratorConfig {
                    base_url: base_url.clone(),
                    api_key: config.content_generator_api_key.clone(),
                    timeout: config.content_timeout,
                })
                .map_err(|e| AppError::Config(format!("content generator client: {e}")))?,
            )
        }
        None => {
            tracing::warn!("CONTENT_GENERATOR_URL not set, dynamic scenes use static content");
            Arc::new(OfflineContentGenerator)
        }
    };

    let app_state = AppState::new(
        Arc::new(catalog),
        Arc::new(PgProgressRepository::new(pool)),
        generator,
        Arc::new(SystemClock),
        OrchestratorConfig {
            content_timeout: config.content_timeout,
            ..OrchestratorConfig::default()
        },
    )
    .with_session_idle_timeout(config.session_idle_timeout);

    let sweeper = app_state.clone();
    let sweep_every = config
        .session_idle_timeout
        .clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            sweeper.evict_idle().await;
        }
    });

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.listen_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    if let Some(provider) = tracer_provider
        && let Err(e) = provider.shutdown()
    {
        tracing::warn!(error = %e, "failed to flush spans on shutdown");
    }

    Ok(())
}
