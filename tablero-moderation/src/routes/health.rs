use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use tablero_shared::errors::{AppError, AppResult, ErrorCode};
use tablero_shared::persistence::ContextFactory;
use tablero_shared::types::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.contexts.create() {
        Ok(_) => HealthCheck {
            name: "database".into(),
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => HealthCheck {
            name: "database".into(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    };

    Json(HealthResponse::healthy("tablero-moderation", env!("CARGO_PKG_VERSION")).with_checks(vec![database]))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> AppResult<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::new(ErrorCode::ServiceUnavailable, "metrics recorder not installed"))
}
