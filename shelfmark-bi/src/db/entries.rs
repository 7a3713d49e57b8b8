//! Reading and planned-queue entry persistence
//!
//! The planned-queue insert is conflict-safe on (user_id, book_key): a race
//! with itself is a no-op, not an error.

use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;
use shelfmark_common::{Error, Result};

use crate::models::{Judgment, PlannedEntry, ReadingEntry};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fetch the reading entry for (user, book key), if any
pub async fn get_reading_entry(
    pool: &SqlitePool,
    user_id: Uuid,
    book_key: &str,
) -> Result<Option<ReadingEntry>> {
    let row = sqlx::query(
        r#"
        SELECT entry_id, user_id, book_key, started_at, finished_at, judgment,
               created_at, updated_at
        FROM reading_entries
        WHERE user_id = ? AND book_key = ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(book_key)
    .fetch_optional(pool)
    .await?;

    row.map(reading_from_row).transpose()
}

/// Insert a new reading entry
pub async fn insert_reading_entry(pool: &SqlitePool, entry: &ReadingEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reading_entries (
            entry_id, user_id, book_key, started_at, finished_at, judgment,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.entry_id.to_string())
    .bind(entry.user_id.to_string())
    .bind(&entry.book_key)
    .bind(entry.started_at.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(entry.finished_at.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(entry.judgment.map(|j| j.as_str()))
    .bind(entry.created_at.to_rfc3339())
    .bind(entry.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Update the finish date and judgment of an existing reading entry
pub async fn update_reading_entry(
    pool: &SqlitePool,
    entry_id: Uuid,
    finished_at: Option<NaiveDate>,
    judgment: Option<Judgment>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE reading_entries
        SET finished_at = ?, judgment = ?, updated_at = ?
        WHERE entry_id = ?
        "#,
    )
    .bind(finished_at.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(judgment.map(|j| j.as_str()))
    .bind(Utc::now().to_rfc3339())
    .bind(entry_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch the planned entry for (user, book key), if any
pub async fn get_planned_entry(
    pool: &SqlitePool,
    user_id: Uuid,
    book_key: &str,
) -> Result<Option<PlannedEntry>> {
    let row = sqlx::query(
        r#"
        SELECT entry_id, user_id, book_key, created_at
        FROM planned_entries
        WHERE user_id = ? AND book_key = ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(book_key)
    .fetch_optional(pool)
    .await?;

    row.map(planned_from_row).transpose()
}

/// Insert a planned entry; a conflicting existing row is left untouched.
/// Returns whether a row was actually inserted.
pub async fn insert_planned_entry(
    pool: &SqlitePool,
    user_id: Uuid,
    book_key: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO planned_entries (entry_id, user_id, book_key, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id, book_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id.to_string())
    .bind(book_key)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove the planned entry for (user, book key); reading supersedes planned
pub async fn delete_planned_entry(
    pool: &SqlitePool,
    user_id: Uuid,
    book_key: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "DELETE FROM planned_entries WHERE user_id = ? AND book_key = ?",
    )
    .bind(user_id.to_string())
    .bind(book_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn reading_from_row(row: SqliteRow) -> Result<ReadingEntry> {
    let entry_id: String = row.get("entry_id");
    let entry_id = Uuid::parse_str(&entry_id)
        .map_err(|e| Error::Internal(format!("Failed to parse entry_id: {}", e)))?;

    let user_id: String = row.get("user_id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::Internal(format!("Failed to parse user_id: {}", e)))?;

    let judgment: Option<String> = row.get("judgment");
    let judgment = judgment.as_deref().map(Judgment::parse).transpose()?;

    Ok(ReadingEntry {
        entry_id,
        user_id,
        book_key: row.get("book_key"),
        started_at: parse_optional_date(row.get("started_at"), "started_at")?,
        finished_at: parse_optional_date(row.get("finished_at"), "finished_at")?,
        judgment,
        created_at: parse_timestamp(row.get("created_at"), "created_at")?,
        updated_at: parse_timestamp(row.get("updated_at"), "updated_at")?,
    })
}

fn planned_from_row(row: SqliteRow) -> Result<PlannedEntry> {
    let entry_id: String = row.get("entry_id");
    let entry_id = Uuid::parse_str(&entry_id)
        .map_err(|e| Error::Internal(format!("Failed to parse entry_id: {}", e)))?;

    let user_id: String = row.get("user_id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::Internal(format!("Failed to parse user_id: {}", e)))?;

    Ok(PlannedEntry {
        entry_id,
        user_id,
        book_key: row.get("book_key"),
        created_at: parse_timestamp(row.get("created_at"), "created_at")?,
    })
}

fn parse_timestamp(value: String, column: &str) -> Result<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn parse_optional_date(value: Option<String>, column: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
        })
        .transpose()
}
