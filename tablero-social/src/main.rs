use std::sync::Arc;

use tablero_shared::persistence::{apply_schema, create_pool};
use tablero_social::config::AppConfig;
use tablero_social::{build_router, AppState, SCHEMA};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tablero_shared::middleware::init_tracing("tablero-social")?;
    let metrics = tablero_shared::middleware::init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;

    let pool = create_pool(&config.database_url, config.pool_size)?;
    apply_schema(&pool, SCHEMA)?;

    let state = Arc::new(AppState::new(config, pool, Some(metrics)));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "tablero-social starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("tablero-social stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
