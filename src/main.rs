mod api;
mod bootstrap;
mod config;
mod error;
mod ledger;
mod musicoin;
mod reconcile;
mod server;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,musicoin_reconciler=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting Musicoin pending transaction reconciler");

    let config = config::Config::from_env()?;
    let app = bootstrap::initialize_app(&config).await?;

    let timers = app.scheduler.start();

    let router = server::create_app(app.state).await;
    let served = server::run_server(router, &config.bind_address, shutdown_signal()).await;

    timers.shutdown().await;

    served.map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
    info!("👋 Reconciler stopped");
    Ok(())
}
