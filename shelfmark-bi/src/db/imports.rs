//! Import record persistence
//!
//! Counters are written after every processed row so that a polling reader
//! always observes monotonically increasing progress.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;
use shelfmark_common::{Error, Result};

use crate::models::{ImportOptions, ImportRecord, ImportStatus, ImportSummary};

/// Insert a freshly created queued record
pub async fn create_import(pool: &SqlitePool, record: &ImportRecord) -> Result<()> {
    let options = serde_json::to_string(&record.options)
        .map_err(|e| Error::Internal(format!("Failed to serialize options: {}", e)))?;
    let summary = serde_json::to_string(&record.summary)
        .map_err(|e| Error::Internal(format!("Failed to serialize summary: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO imports (
            import_id, user_id, filename, csv_payload, options, status,
            total_rows, processed_rows, imported_rows, failed_rows, warning_rows,
            summary, started_at, finished_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.import_id.to_string())
    .bind(record.user_id.to_string())
    .bind(&record.filename)
    .bind(&record.csv_payload)
    .bind(&options)
    .bind(record.status.as_str())
    .bind(record.summary.total_rows)
    .bind(record.summary.processed_rows)
    .bind(record.summary.imported_rows)
    .bind(record.summary.failed_rows)
    .bind(record.summary.warning_rows)
    .bind(&summary)
    .bind(record.started_at.map(|dt| dt.to_rfc3339()))
    .bind(record.finished_at.map(|dt| dt.to_rfc3339()))
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one record scoped to its owning user
pub async fn load_import(
    pool: &SqlitePool,
    import_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ImportRecord>> {
    let row = sqlx::query(
        r#"
        SELECT import_id, user_id, filename, csv_payload, options, status,
               total_rows, processed_rows, imported_rows, failed_rows, warning_rows,
               started_at, finished_at, created_at, updated_at
        FROM imports
        WHERE import_id = ? AND user_id = ?
        "#,
    )
    .bind(import_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(record_from_row).transpose()
}

/// Most-recent 20 records for a user, newest first
pub async fn list_imports(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<ImportRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT import_id, user_id, filename, csv_payload, options, status,
               total_rows, processed_rows, imported_rows, failed_rows, warning_rows,
               started_at, finished_at, created_at, updated_at
        FROM imports
        WHERE user_id = ?
        ORDER BY created_at DESC
        LIMIT 20
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(record_from_row).collect()
}

/// Transition a record to PROCESSING, preserving a prior started_at when the
/// orchestrator re-enters a record that never reached a terminal state.
pub async fn mark_processing(pool: &SqlitePool, import_id: Uuid) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE imports
        SET status = 'processing',
            started_at = COALESCE(started_at, ?),
            updated_at = ?
        WHERE import_id = ?
        "#,
    )
    .bind(&now)
    .bind(&now)
    .bind(import_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist running counters plus the serialized summary snapshot
pub async fn save_counters(
    pool: &SqlitePool,
    import_id: Uuid,
    summary: &ImportSummary,
) -> Result<()> {
    let snapshot = serde_json::to_string(summary)
        .map_err(|e| Error::Internal(format!("Failed to serialize summary: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE imports
        SET total_rows = ?,
            processed_rows = ?,
            imported_rows = ?,
            failed_rows = ?,
            warning_rows = ?,
            summary = ?,
            updated_at = ?
        WHERE import_id = ?
        "#,
    )
    .bind(summary.total_rows)
    .bind(summary.processed_rows)
    .bind(summary.imported_rows)
    .bind(summary.failed_rows)
    .bind(summary.warning_rows)
    .bind(&snapshot)
    .bind(Utc::now().to_rfc3339())
    .bind(import_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a record terminal with its final counters
pub async fn mark_terminal(
    pool: &SqlitePool,
    import_id: Uuid,
    status: ImportStatus,
    summary: &ImportSummary,
) -> Result<()> {
    let snapshot = serde_json::to_string(summary)
        .map_err(|e| Error::Internal(format!("Failed to serialize summary: {}", e)))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE imports
        SET status = ?,
            total_rows = ?,
            processed_rows = ?,
            imported_rows = ?,
            failed_rows = ?,
            warning_rows = ?,
            summary = ?,
            finished_at = ?,
            updated_at = ?
        WHERE import_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(summary.total_rows)
    .bind(summary.processed_rows)
    .bind(summary.imported_rows)
    .bind(summary.failed_rows)
    .bind(summary.warning_rows)
    .bind(&snapshot)
    .bind(&now)
    .bind(&now)
    .bind(import_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

fn record_from_row(row: SqliteRow) -> Result<ImportRecord> {
    let import_id: String = row.get("import_id");
    let import_id = Uuid::parse_str(&import_id)
        .map_err(|e| Error::Internal(format!("Failed to parse import_id: {}", e)))?;

    let user_id: String = row.get("user_id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::Internal(format!("Failed to parse user_id: {}", e)))?;

    let options: String = row.get("options");
    let options: ImportOptions = serde_json::from_str(&options)
        .map_err(|e| Error::Internal(format!("Failed to deserialize options: {}", e)))?;

    let status: String = row.get("status");
    let status = ImportStatus::parse(&status)?;

    let started_at = parse_optional_timestamp(row.get("started_at"), "started_at")?;
    let finished_at = parse_optional_timestamp(row.get("finished_at"), "finished_at")?;
    let created_at = parse_timestamp(row.get("created_at"), "created_at")?;
    let updated_at = parse_timestamp(row.get("updated_at"), "updated_at")?;

    Ok(ImportRecord {
        import_id,
        user_id,
        filename: row.get("filename"),
        csv_payload: row.get("csv_payload"),
        options,
        status,
        summary: ImportSummary {
            total_rows: row.get("total_rows"),
            processed_rows: row.get("processed_rows"),
            imported_rows: row.get("imported_rows"),
            failed_rows: row.get("failed_rows"),
            warning_rows: row.get("warning_rows"),
        },
        started_at,
        finished_at,
        created_at,
        updated_at,
    })
}

fn parse_timestamp(value: String, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn parse_optional_timestamp(value: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>> {
    value.map(|s| parse_timestamp(s, column)).transpose()
}
