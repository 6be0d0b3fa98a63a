use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tablero_shared::persistence::{ContextFactory, ContextRegistry, DbPool, PoolContextFactory};

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod schema;

use config::AppConfig;
use repositories::{ReportRepository, SanctionRepository};

pub use error::ModerationError;

pub const SCHEMA: &str = include_str!("../migrations/2024-05-01-000000_create_moderation/up.sql");

pub struct AppState {
    pub config: AppConfig,
    pub contexts: Arc<ContextRegistry>,
    pub reports: ReportRepository,
    pub sanctions: SanctionRepository,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: DbPool, metrics: Option<PrometheusHandle>) -> Self {
        let contexts = Arc::new(ContextRegistry::new(Arc::new(PoolContextFactory::new(pool))));
        let shared: Arc<dyn ContextFactory> = contexts.clone();
        Self {
            config,
            reports: ReportRepository::new(shared.clone()),
            sanctions: SanctionRepository::new(shared),
            contexts,
            metrics,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/reports", post(routes::reports::create_report))
        .route("/users/:id/reports", get(routes::reports::list_user_reports))
        .route("/users/:id/reports/count", get(routes::reports::count_user_reports))
        .route(
            "/users/:id/sanctions",
            get(routes::sanctions::list_user_sanctions).post(routes::sanctions::apply_ban),
        )
        .route("/users/:id/ban", get(routes::sanctions::ban_status))
        .route("/sanctions/:id", delete(routes::sanctions::lift_sanction))
        .layer(middleware::from_fn(tablero_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically deactivates sanctions whose end timestamp has passed.
///
/// Failures are logged and retried on the next tick.
pub fn spawn_sanction_sweep(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_expired_sanctions(&state).await;
        }
    })
}

/// One sweep pass. The diesel update runs on the blocking pool.
pub async fn sweep_expired_sanctions(state: &Arc<AppState>) -> Option<usize> {
    let state = state.clone();
    match tokio::task::spawn_blocking(move || state.sanctions.expire_sanctions(Utc::now())).await {
        Ok(Ok(0)) => {
            tracing::trace!("sanction sweep found nothing to expire");
            Some(0)
        }
        Ok(Ok(expired)) => {
            tracing::debug!(expired, "sanction sweep finished");
            Some(expired)
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "sanction sweep failed");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "sanction sweep task panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use tablero_shared::persistence::DbContext;
    use tablero_shared::RepositoryError;

    use super::*;
    use crate::repositories::test_support;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(AppConfig::default(), test_support::pool(), None))
    }

    #[tokio::test]
    async fn sweep_pass_deactivates_ended_bans() {
        let state = state();
        state
            .sanctions
            .apply_ban(4, false, Some(Utc::now() - ChronoDuration::minutes(1)), "spam")
            .unwrap();
        state.sanctions.apply_ban(5, true, None, "cheating").unwrap();

        assert_eq!(sweep_expired_sanctions(&state).await, Some(1));
        assert_eq!(sweep_expired_sanctions(&state).await, Some(0));
        assert!(!state.sanctions.sanctions_for_user(4).unwrap()[0].is_active);
        assert!(state.sanctions.sanctions_for_user(5).unwrap()[0].is_active);
    }

    #[tokio::test]
    async fn sweep_pass_survives_storage_failure() {
        let state = state();
        let failing: Arc<dyn ContextFactory> = Arc::new(|| -> Result<DbContext, RepositoryError> {
            Err(RepositoryError::Context("store offline".into()))
        });
        state.contexts.configure(Some(failing)).unwrap();

        assert_eq!(sweep_expired_sanctions(&state).await, None);

        state.contexts.reset();
        assert_eq!(sweep_expired_sanctions(&state).await, Some(0));
    }
}
