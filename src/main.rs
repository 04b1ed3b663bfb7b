//! hazardwatch - traffic-camera hazard evaluation server
//!
//! Main entry point.

use hazardwatch::{
    broadcaster::ResultBroadcaster,
    camera_directory::CameraDirectory,
    detection_client::{DetectionClient, HttpDetectionBackend},
    history_store::{DbHistoryStore, HistoryStore, MemoryHistoryStore},
    narrative::LlmNarrativeGenerator,
    realtime_hub::RealtimeHub,
    snapshot_service::SnapshotService,
    state::{AppConfig, AppState},
    watch_orchestrator::WatchOrchestrator,
    watch_registry::WatchRegistry,
    web_api,
};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hazardwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting hazardwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        camera_data_path = %config.camera_data_path.display(),
        detection_url = %config.detection_url,
        narrative_url = %config.narrative_url,
        tick_interval_sec = config.tick_interval_secs,
        db_backed = config.database_url.is_some(),
        "Configuration loaded"
    );

    // Camera metadata
    let directory = Arc::new(CameraDirectory::load(&config.camera_data_path)?);

    // Subscription and delivery components
    let registry = Arc::new(WatchRegistry::new());
    let hub = Arc::new(RealtimeHub::new());
    let broadcaster = Arc::new(ResultBroadcaster::new(registry.clone(), hub.clone()));

    // Detection pipeline
    let backend = Arc::new(
        HttpDetectionBackend::new(config.detection_url.clone())
            .with_token(config.detection_token.clone()),
    );
    let detection = Arc::new(DetectionClient::new(backend).with_poll_policy(
        Duration::from_millis(config.detection_poll_interval_ms),
        config.detection_max_polls,
    ));
    let image_source = Arc::new(SnapshotService::new());
    let narrative = Arc::new(LlmNarrativeGenerator::new(
        config.narrative_url.clone(),
        config.narrative_token.clone(),
        config.narrative_model.clone(),
    ));

    // Score history
    let history: Arc<dyn HistoryStore> = match &config.database_url {
        Some(url) => {
            let pool = MySqlPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await?;
            let store = DbHistoryStore::new(pool);
            store.init_schema().await?;
            tracing::info!("History store: MySQL");
            Arc::new(store)
        }
        None => {
            tracing::info!("History store: in-memory ring buffer");
            Arc::new(MemoryHistoryStore::new())
        }
    };

    // Evaluation loop
    let orchestrator = Arc::new(
        WatchOrchestrator::new(
            registry.clone(),
            directory.clone(),
            image_source,
            detection,
            history,
            narrative,
            broadcaster,
        )
        .with_tick_interval(Duration::from_secs(config.tick_interval_secs)),
    );
    orchestrator.clone().start().await;

    let state = AppState {
        config: config.clone(),
        directory,
        registry,
        hub,
        orchestrator,
    };

    let app = web_api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "hazardwatch listening");
    axum::serve(listener, app).await?;

    Ok(())
}
