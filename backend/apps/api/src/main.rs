//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request failures are handled by
//! `gateway::GatewayError`.

mod settings;

use std::net::SocketAddr;

use gateway::{
    GatewayConfig, KvBackend, MemoryKeyValueStore, MemoryResponseCache, PgKeyValueStore,
    ReqwestUpstreamClient, gateway_router,
};
use platform::background::BackgroundTasks;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,gateway=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    log_config(&settings.gateway);

    let store = match settings.database_url.as_deref() {
        Some(database_url) => KvBackend::Postgres(connect_postgres(database_url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, rate limit state is kept in memory");
            KvBackend::Memory(MemoryKeyValueStore::default())
        }
    };
    tracing::info!(backend = store.name(), "Key-value store ready");

    let cache = MemoryResponseCache::new(settings.cache_max_entries, settings.gateway.cache_max_age);
    let upstream = ReqwestUpstreamClient::from_defaults()?;
    let tasks = BackgroundTasks::new();

    // Build router
    let app = gateway_router(store, cache, upstream, settings.gateway, tasks.clone())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::new(settings.host, settings.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(pending = tasks.pending(), "Waiting for background cache writes");
    tasks.drain().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn connect_postgres(database_url: &str) -> anyhow::Result<PgKeyValueStore> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Startup cleanup: remove expired rate limit state
    // Errors here should not prevent server startup
    let store = PgKeyValueStore::new(pool);
    if let Err(e) = store.cleanup_expired().await {
        tracing::warn!(
            error = %e,
            "Gateway state cleanup failed, continuing anyway"
        );
    }

    Ok(store)
}

fn log_config(config: &GatewayConfig) {
    if !config.default_region_is_valid() {
        // Requests without a region in the path will fail until fixed
        tracing::warn!(
            default_region = %config.default_region,
            "DEFAULT_REGION is not a known region"
        );
    }

    tracing::info!(
        default_region = %config.default_region,
        upstream = %config.upstream_base_domain,
        cache_max_age_secs = config.cache_max_age.as_secs(),
        client_burst = config.client_rate_limit.burst,
        client_interval_secs = config.client_rate_limit.interval.as_secs(),
        server_burst = config.server_rate_limit.burst,
        server_interval_secs = config.server_rate_limit.interval.as_secs(),
        endpoint_limits = !config.endpoint_limits.is_empty(),
        "Gateway configured"
    );
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
