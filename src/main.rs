//! Surety service entry point.
//!
//! Boots the two demo workflows (policy inspection and identity
//! verification) behind one HTTP server: loads configuration, picks the
//! record store (PostgreSQL when a database URL is configured, in-memory
//! otherwise), seeds the catalog, and runs the server until shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use surety_api::{start_server, AppState, Config};
use surety_core::{seed::seed_catalog, storage::Storage, MemoryStore, PgStore, RealClock, RecordStore};
use surety_inspection::InspectionClient;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log);

    info!("Starting surety service");
    info!(
        database_url = %config.database_url_masked(),
        provider_base_url = %config.provider_base_url,
        host = %config.host,
        port = config.port,
        "Configuration loaded"
    );

    let store = build_store(&config).await?;

    let seeded = seed_catalog(&*store).await.context("Failed to seed catalog")?;
    if seeded {
        info!("Seeded empty catalog");
    }

    let inspector = Arc::new(
        InspectionClient::new(config.to_client_config())
            .context("Failed to build inspection client")?,
    );

    let state = AppState::new(store, inspector, Arc::new(RealClock::new()), Arc::new(config));
    start_server(state).await
}

/// Builds the record store the configuration asks for.
///
/// A configured database URL gets a PostgreSQL pool with migrations applied;
/// no URL means the in-memory store, the way the demo deployment runs.
async fn build_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    let Some(database_url) = &config.database_url else {
        info!("No database configured, using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let pool = create_database_pool(database_url, config.database_max_connections).await?;

    sqlx::migrate!("./migrations").run(&pool).await.context("Failed to run migrations")?;
    info!("Database migrations completed");

    Ok(Arc::new(PgStore::new(Arc::new(Storage::new(pool)))))
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(database_url: &str, max_connections: u32) -> Result<sqlx::PgPool> {
    let mut retries = 0;
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    loop {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .fetch_one(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                info!("Database connection pool established");
                return Ok(pool);
            },
            Err(_e) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    "Database connection failed, retrying..."
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}

/// Initializes tracing with the configured filter.
fn init_tracing(rust_log: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(rust_log))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
