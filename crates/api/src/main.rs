use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexiport_api::config::ServerConfig;
use lexiport_api::router::build_app_router;
use lexiport_api::state::AppState;
use lexiport_events::ProgressBus;
use lexiport_pipeline::{ChunkExecutor, MySqlCatalogFactory, WorkerRunner};
use lexiport_promptgen::HttpPromptClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexiport_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = lexiport_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    lexiport_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    lexiport_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Progress bus ---
    let bus = Arc::new(ProgressBus::new());

    // --- Chunk executor ---
    let prompt = Arc::new(HttpPromptClient::new(config.prompt_base_url.clone()));
    let executor = Arc::new(ChunkExecutor::new(
        pool.clone(),
        prompt,
        Arc::new(MySqlCatalogFactory),
        Arc::clone(&bus),
    ));

    // --- Worker loop ---
    let worker = Arc::new(
        WorkerRunner::new(pool.clone(), Arc::clone(&executor), Arc::clone(&bus))
            .with_poll_interval(Duration::from_secs(config.worker_poll_interval_secs)),
    );
    let worker_cancel = tokio_util::sync::CancellationToken::new();
    let worker_handle = worker.start(worker_cancel.clone());
    tracing::info!("Worker loop started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        bus: Arc::clone(&bus),
        executor: Arc::clone(&executor),
    };

    // --- Router ---
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

    worker_cancel.cancel();
    if let Some(handle) = worker_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Worker loop stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
