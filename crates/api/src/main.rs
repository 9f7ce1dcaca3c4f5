use std::net::SocketAddr;
use std::sync::Arc;

use rigforge_core::gallery::{GalleryStore, MemoryGalleryStore};
use rigforge_events::EventBus;
use rigforge_meshy::{GenerationService, MeshyApi};
use rigforge_pipeline::Orchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rigforge_api::config::ServerConfig;
use rigforge_api::router::build_app_router;
use rigforge_api::state::AppState;
use rigforge_api::tracker::SessionTracker;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "rigforge_api=debug,rigforge_pipeline=debug,rigforge_meshy=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Gallery ---
    let gallery: Arc<dyn GalleryStore> = match &config.database_url {
        Some(database_url) => {
            let pool = rigforge_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            rigforge_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            rigforge_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(rigforge_db::PgGalleryStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, gallery is kept in memory");
            Arc::new(MemoryGalleryStore::new())
        }
    };

    // --- Event bus and session tracker ---
    let event_bus = Arc::new(EventBus::default());
    let tracker = Arc::new(SessionTracker::new(config.session_retention()));
    let tracker_handle = tokio::spawn(Arc::clone(&tracker).run(event_bus.subscribe()));

    // --- Generation service ---
    if config.meshy.api_key.is_none() {
        tracing::warn!("MESHY_API_KEY not set, generation requests will be sent unauthenticated");
    }
    let service: Arc<dyn GenerationService> = Arc::new(MeshyApi::new(&config.meshy));
    tracing::info!(base_url = %config.meshy.base_url, "Generation service client created");

    let orchestrator = Arc::new(Orchestrator::new(
        service,
        Arc::clone(&gallery),
        Arc::clone(&event_bus),
        config.pipeline,
    ));

    // --- Asset proxy client ---
    let proxy_client = config
        .proxy
        .client_builder()
        .build()
        .expect("Failed to build proxy HTTP client");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator,
        sessions: Arc::clone(&tracker),
        gallery,
        proxy_client,
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Running sessions stop before their next job.
    tracker.abandon_all().await;
    tracker_handle.abort();
    tracing::info!("Session tracker stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
