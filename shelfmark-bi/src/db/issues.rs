//! Import issue log persistence
//!
//! Issues are written in strictly increasing row-number-then-append order by
//! the sequential import loop; this module never updates or deletes them.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;
use shelfmark_common::{Error, Result};

use crate::models::{ImportIssue, IssueSeverity};

/// Number of issues returned for a status/detail query
const ISSUE_QUERY_LIMIT: i64 = 200;

/// Append one issue
pub async fn insert_issue(pool: &SqlitePool, issue: &ImportIssue) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_issues (
            issue_id, import_id, row_number, title, author,
            severity, code, message, inference, raw_row, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(issue.issue_id.to_string())
    .bind(issue.import_id.to_string())
    .bind(issue.row_number)
    .bind(&issue.title)
    .bind(&issue.author)
    .bind(issue.severity.as_str())
    .bind(&issue.code)
    .bind(&issue.message)
    .bind(&issue.inference)
    .bind(&issue.raw_row)
    .bind(issue.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Up to 200 most-recent issues for an import, by row number descending
pub async fn issues_for_import(pool: &SqlitePool, import_id: Uuid) -> Result<Vec<ImportIssue>> {
    let rows = sqlx::query(
        r#"
        SELECT issue_id, import_id, row_number, title, author,
               severity, code, message, inference, raw_row, created_at
        FROM import_issues
        WHERE import_id = ?
        ORDER BY row_number DESC, created_at DESC
        LIMIT ?
        "#,
    )
    .bind(import_id.to_string())
    .bind(ISSUE_QUERY_LIMIT)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(issue_from_row).collect()
}

fn issue_from_row(row: SqliteRow) -> Result<ImportIssue> {
    let issue_id: String = row.get("issue_id");
    let issue_id = Uuid::parse_str(&issue_id)
        .map_err(|e| Error::Internal(format!("Failed to parse issue_id: {}", e)))?;

    let import_id: String = row.get("import_id");
    let import_id = Uuid::parse_str(&import_id)
        .map_err(|e| Error::Internal(format!("Failed to parse import_id: {}", e)))?;

    let severity: String = row.get("severity");
    let severity = match severity.as_str() {
        "warning" => IssueSeverity::Warning,
        "error" => IssueSeverity::Error,
        other => {
            return Err(Error::Internal(format!("Unknown issue severity: {}", other)));
        }
    };

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(ImportIssue {
        issue_id,
        import_id,
        row_number: row.get("row_number"),
        title: row.get("title"),
        author: row.get("author"),
        severity,
        code: row.get("code"),
        message: row.get("message"),
        inference: row.get("inference"),
        raw_row: row.get("raw_row"),
        created_at,
    })
}
