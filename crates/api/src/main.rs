use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursepath_api::background;
use coursepath_api::config::ServerConfig;
use coursepath_api::router::build_app_router;
use coursepath_api::state::AppState;
use coursepath_db::DbPool;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursepath_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        repair_interval_secs = config.repair_interval_secs,
        "Loaded server configuration",
    );

    let pool = connect(&config).await;

    let repair_cancel = CancellationToken::new();
    let repair = spawn_repair(&config, pool.clone(), repair_cancel.clone());

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let shutdown_grace = Duration::from_secs(config.shutdown_timeout_secs);
    let app = build_app_router(AppState {
        pool,
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    repair_cancel.cancel();
    if let Some(handle) = repair {
        match tokio::time::timeout(shutdown_grace, handle).await {
            Ok(_) => tracing::info!("Repair loop stopped"),
            Err(_) => tracing::warn!("Repair loop still running at shutdown deadline"),
        }
    }
    tracing::info!("Shutdown complete");
}

/// Pool, `SELECT 1`, then migrations. Any failure aborts startup.
async fn connect(config: &ServerConfig) -> DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = coursepath_db::create_pool(&database_url, config.db_max_connections)
        .await
        .expect("Failed to connect to database");
    coursepath_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    coursepath_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database ready, migrations applied",
    );
    pool
}

/// Start the periodic repair loop unless `REPAIR_INTERVAL_SECS` is 0.
fn spawn_repair(
    config: &ServerConfig,
    pool: DbPool,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if config.repair_interval_secs == 0 {
        tracing::info!("Periodic repair disabled");
        return None;
    }
    let every = Duration::from_secs(config.repair_interval_secs);
    Some(tokio::spawn(background::repair::run(pool, every, cancel)))
}

/// Resolves on SIGINT, or SIGTERM on Unix.
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
        () = ctrl_c => tracing::info!("SIGINT received, draining connections"),
        () = terminate => tracing::info!("SIGTERM received, draining connections"),
    }
}
