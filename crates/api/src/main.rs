//! LiveChat API server

use std::sync::Arc;

use anyhow::Context;
use livechat_api::{
    bootstrap::{ensure_admin, AdminSeed},
    routes::create_router,
    store::PgChatStore,
    AppState, Config,
};
use livechat_shared::{create_pool, run_migrations};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "livechat_api=info,tower_http=info";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_json);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "LiveChat API starting");

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Migrations complete");

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        match ensure_admin(&pool, email, password).await? {
            AdminSeed::Created(id) => tracing::info!(user_id = %id, "Bootstrap admin created"),
            AdminSeed::AlreadyExists(id) => {
                tracing::debug!(user_id = %id, "Bootstrap admin already exists")
            }
        }
    }

    let bind_address = config.bind_address.clone();
    let store = Arc::new(PgChatStore::new(pool.clone()));
    let state = AppState::new(config, pool, store);
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!(address = %bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}
