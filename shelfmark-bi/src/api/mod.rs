//! HTTP API for shelfmark-bi

pub mod health;
pub mod imports;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub use health::health_check;
pub use imports::{create_import, get_import, list_imports};

/// Requesting user's id, injected by the upstream auth layer
pub struct UserId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing x-user-id header".to_string()))?;

        let user_id = Uuid::parse_str(header)
            .map_err(|_| ApiError::BadRequest("Malformed x-user-id header".to_string()))?;

        Ok(UserId(user_id))
    }
}

/// Import pipeline routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/imports", post(create_import).get(list_imports))
        .route("/imports/:import_id", get(get_import))
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
