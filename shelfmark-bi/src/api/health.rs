//! Health check handler

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::AppState;

/// GET /health
///
/// Liveness probe; verifies the database answers.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .map_err(shelfmark_common::Error::Database)?;

    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
