//! Guestbook service: message store, moderation and threading behind a JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod language;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{extract::State, middleware as axum_middleware, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::MessageStore;
use crate::services::GuestbookService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn MessageStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn guestbook(&self) -> GuestbookService {
        GuestbookService::new(self.store.clone(), &self.config)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .nest("/api", api::routes(state.clone()))
        .layer(axum_middleware::from_fn(middleware::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn readiness_check(State(state): State<AppState>) -> error::Result<Json<serde_json::Value>> {
    state.guestbook().health().await?;
    Ok(Json(json!({ "status": "ready" })))
}
