use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::handler::{
    get_feed, get_profile, get_release, health_check, list_pending, submit_profile,
    submit_profile_update, submit_release, trigger_reconcile, AppState,
};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Transaction bookkeeping
                .route("/releases", post(submit_release))
                .route("/releases/:id", get(get_release))
                .route("/profiles", post(submit_profile))
                .route("/profiles/:id", get(get_profile))
                .route("/profiles/:id/update", post(submit_profile_update))
                // Reconciliation
                .route("/pending", get(list_pending))
                .route("/reconcile", post(trigger_reconcile))
                // Feed
                .route("/feed", get(get_feed)),
        )
        .layer(CompressionLayer::new())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(
    app: Router,
    bind_address: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
