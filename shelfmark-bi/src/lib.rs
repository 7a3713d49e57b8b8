//! shelfmark-bi library interface
//!
//! Exposes the import pipeline and catalog resolver for integration testing.

pub mod api;
pub mod catalog;
pub mod db;
pub mod error;
pub mod import;
pub mod models;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::import::ImportOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Import pipeline entry point
    pub orchestrator: Arc<ImportOrchestrator>,
}

impl AppState {
    pub fn new(db: SqlitePool, orchestrator: Arc<ImportOrchestrator>) -> Self {
        Self { db, orchestrator }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
