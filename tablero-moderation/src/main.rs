use std::sync::Arc;

use tablero_moderation::config::AppConfig;
use tablero_moderation::{build_router, spawn_sanction_sweep, AppState, SCHEMA};
use tablero_shared::persistence::{apply_schema, create_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tablero_shared::middleware::init_tracing("tablero-moderation")?;
    let metrics = tablero_shared::middleware::init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;

    let pool = create_pool(&config.database_url, config.pool_size)?;
    apply_schema(&pool, SCHEMA)?;

    let state = Arc::new(AppState::new(config, pool, Some(metrics)));

    let sweep = spawn_sanction_sweep(state.clone());

    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "tablero-moderation starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    tracing::info!("tablero-moderation stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
