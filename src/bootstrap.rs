use std::{sync::Arc, time::Duration};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};
use crate::{
    api::handler::AppState,
    config::{Config, StoreBackend},
    error::{AppError, AppResult},
    ledger::{InMemoryStore, LedgerRepository, RecordStore},
    musicoin::{LedgerApi, MusicoinClient},
    reconcile::{PendingTxDaemon, PlatformHooks, ReconcileScheduleConfig, ReconcileScheduler},
};

/// Everything `main` needs to run the service
pub struct App {
    pub state: AppState,
    pub scheduler: ReconcileScheduler,
}

pub async fn initialize_app(config: &Config) -> AppResult<App> {
    info!("Initializing application components ...");

    let store = initialize_store(config).await?;

    let api: Arc<dyn LedgerApi> = Arc::new(MusicoinClient::new(
        &config.musicoin_api_url,
        &config.musicoin_client_id,
        config.musicoin_api_timeout(),
    )?);
    if config.musicoin_client_id.is_empty() {
        warn!("⚠️  MUSICOIN_CLIENT_ID not set - ledger requests are unauthenticated");
    }
    info!("✅ Musicoin ledger client initialized: {}", config.musicoin_api_url);

    let hooks = Arc::new(PlatformHooks::new(
        store.clone(),
        api.clone(),
        config.invite_reward,
    ));

    let daemon = Arc::new(PendingTxDaemon::new(
        store.clone(),
        api,
        hooks,
        config.reconcile_concurrency,
    ));
    info!(
        "✅ Pending transaction daemon initialized (concurrency {})",
        config.reconcile_concurrency
    );

    let scheduler = ReconcileScheduler::new(
        ReconcileScheduleConfig::new(config.reconcile_interval(), config.reconcile_offset()),
        daemon.clone(),
    );

    Ok(App {
        state: AppState { store, daemon },
        scheduler,
    })
}

async fn initialize_store(config: &Config) -> AppResult<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("⚠️  Using in-memory store - records are lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| AppError::Config("DATABASE_URL must be set".into()))?;
            let pool = initialize_database(database_url).await?;
            Ok(Arc::new(LedgerRepository::new(pool)))
        }
    }
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("✓ Database pool configured: 20 max connections");

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
