//! Satwa Sentinel
//!
//! Main entry point for the hazard telemetry server.

use std::sync::Arc;
use std::time::Duration;

use satwa_sentinel::{
    alert_store::AlertStore,
    camera_monitor::{detector, CameraMonitor},
    position_registry::PositionRegistry,
    realtime_hub::RealtimeHub,
    state::{AppConfig, AppState, SystemHealth},
    web_api,
};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
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
                .unwrap_or_else(|_| "satwa_sentinel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Satwa Sentinel v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        camera_url = %config.camera_url,
        model_path = %config.model_path.display(),
        "Configuration loaded"
    );

    // Create database pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connected");

    // Initialize components
    let positions = Arc::new(PositionRegistry::new(pool.clone()));
    positions.init().await?;

    let store = Arc::new(AlertStore::new());
    let realtime = Arc::new(RealtimeHub::new());
    let system_health = Arc::new(RwLock::new(SystemHealth::default()));

    // Camera pipeline: the detector is chosen once here; if the model does
    // not load, the flame-pixel heuristic takes its place.
    let hazard_detector = detector::load_detector(&config);
    let monitor = CameraMonitor::new(config.camera_url.clone(), hazard_detector);
    monitor.spawn(store.clone(), realtime.clone());
    tracing::info!("CameraMonitor started");

    // Create application state
    let state = AppState {
        pool,
        config,
        store,
        realtime,
        positions,
        system_health,
    };

    // Start system health monitoring
    let health_monitor = state.system_health.clone();
    tokio::spawn(async move {
        use sysinfo::System;
        let mut sys = System::new_all();
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            sys.refresh_all();

            let cpu = {
                let cpus = sys.cpus();
                if cpus.is_empty() {
                    0.0
                } else {
                    cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
                }
            };
            let memory = if sys.total_memory() > 0 {
                (sys.used_memory() as f32 / sys.total_memory() as f32) * 100.0
            } else {
                0.0
            };

            let mut health = health_monitor.write().await;
            health.update(cpu, memory);
        }
    });

    // Create router with static file serving
    let serve_dir = ServeDir::new(&state.config.static_dir).not_found_service(ServeFile::new(
        format!("{}/index.html", state.config.static_dir),
    ));

    let app = web_api::create_router(state.clone())
        .fallback_service(serve_dir)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
