//! Import API handlers
//!
//! POST /imports validates and queues an upload, then spawns the
//! orchestrator as a background task; the HTTP caller polls GET /imports/:id
//! for progress.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::UserId;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{ImportIssue, ImportOptions, ImportRecord};
use crate::AppState;

/// POST /imports request
#[derive(Debug, Deserialize)]
pub struct CreateImportRequest {
    pub filename: String,
    /// Raw Goodreads CSV export text
    pub csv: String,
    #[serde(default)]
    pub options: ImportOptions,
}

/// GET /imports/:id response
#[derive(Debug, Serialize)]
pub struct ImportDetailResponse {
    #[serde(flatten)]
    pub record: ImportRecord,
    /// Up to 200 most-recent issues, newest row first
    pub issues: Vec<ImportIssue>,
}

/// POST /imports
///
/// Validates the CSV headers and options synchronously, persists a queued
/// record, and kicks off background processing.
pub async fn create_import(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<CreateImportRequest>,
) -> ApiResult<Json<ImportRecord>> {
    if request.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("Filename must not be empty".to_string()));
    }

    let record = state
        .orchestrator
        .create_queued_import(user_id, request.filename, request.csv, request.options)
        .await?;

    // Background processing; the HTTP request does not wait for it
    let orchestrator = state.orchestrator.clone();
    let import_id = record.import_id;
    tokio::spawn(async move {
        if let Err(e) = orchestrator.process_import(import_id, user_id).await {
            tracing::error!(
                import_id = %import_id,
                error = %e,
                "Background import task failed"
            );
        }
    });

    Ok(Json(record))
}

/// GET /imports
///
/// Most-recent 20 imports for the requesting user, newest first.
pub async fn list_imports(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<Vec<ImportRecord>>> {
    let records = db::imports::list_imports(&state.db, user_id).await?;
    Ok(Json(records))
}

/// GET /imports/:import_id
///
/// Import record plus its audit trail.
pub async fn get_import(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(import_id): Path<Uuid>,
) -> ApiResult<Json<ImportDetailResponse>> {
    let record = db::imports::load_import(&state.db, import_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Import not found: {}", import_id)))?;

    let issues = db::issues::issues_for_import(&state.db, import_id).await?;

    Ok(Json(ImportDetailResponse { record, issues }))
}
