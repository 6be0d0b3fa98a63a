use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
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
use repositories::{FriendRepository, UserRepository};

pub use error::SocialError;

/// DDL applied at startup; every statement is idempotent.
pub const SCHEMA: &str = include_str!("../migrations/2024-05-01-000000_create_social/up.sql");

pub struct AppState {
    pub config: AppConfig,
    pub contexts: Arc<ContextRegistry>,
    pub users: UserRepository,
    pub friends: FriendRepository,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: DbPool, metrics: Option<PrometheusHandle>) -> Self {
        let contexts = Arc::new(ContextRegistry::new(Arc::new(PoolContextFactory::new(pool))));
        let shared: Arc<dyn ContextFactory> = contexts.clone();
        Self {
            config,
            users: UserRepository::new(shared.clone()),
            friends: FriendRepository::new(shared),
            contexts,
            metrics,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/internal/users", post(routes::users::create_user))
        .route("/friends/requests", post(routes::friends::send_friend_request))
        .route("/friends/requests/:id/accept", post(routes::friends::accept_friend_request))
        .route("/friends/requests/:id/reject", post(routes::friends::reject_friend_request))
        .route("/friends/:user_a/:user_b", delete(routes::friends::remove_friendship))
        .route("/users/:id/friends", get(routes::friends::list_friends))
        .route("/users/:id/friend-requests", get(routes::friends::list_pending_requests))
        .layer(middleware::from_fn(tablero_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
