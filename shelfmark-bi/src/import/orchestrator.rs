//! End-to-end import orchestration
//!
//! Rows are processed strictly sequentially: later rows' merge decisions can
//! depend on mutations made by earlier rows referencing the same book key,
//! and the catalog provider is globally rate limited anyway. Counters and a
//! serialized summary snapshot are persisted after every row so a polling
//! reader never observes progress going backwards.

use anyhow::{anyhow, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::resolver::BookCatalog;
use crate::db;
use crate::import::csv::{self, CsvRow};
use crate::import::planner::{self, RowPlan, TargetCollection};
use crate::import::resolve;
use crate::models::issue::codes;
use crate::models::{
    BookMeta, ImportIssue, ImportOptions, ImportRecord, ImportStatus, ImportSummary,
    IssueSeverity, LookupFailure, ReadingEntry,
};

const UNKNOWN_TITLE: &str = "Unknown title";
const UNKNOWN_AUTHOR: &str = "Unknown author";

/// Drives queued imports to a terminal state
pub struct ImportOrchestrator {
    db: SqlitePool,
    catalog: Arc<dyn BookCatalog>,
}

impl ImportOrchestrator {
    pub fn new(db: SqlitePool, catalog: Arc<dyn BookCatalog>) -> Self {
        Self { db, catalog }
    }

    /// Validate the upload and persist a queued record.
    ///
    /// Header and options validation happens here, before anything is
    /// written; the raw CSV payload is stored verbatim so processing always
    /// reparses identical input.
    pub async fn create_queued_import(
        &self,
        user_id: Uuid,
        filename: String,
        csv_payload: String,
        options: ImportOptions,
    ) -> shelfmark_common::Result<ImportRecord> {
        csv::parse_goodreads_csv(&csv_payload)?;

        let record = ImportRecord::new(user_id, filename, csv_payload, options);
        db::imports::create_import(&self.db, &record).await?;

        tracing::info!(
            import_id = %record.import_id,
            user_id = %record.user_id,
            filename = %record.filename,
            "Import queued"
        );

        Ok(record)
    }

    /// Process one queued import to a terminal state.
    ///
    /// Re-invocation on an already-terminal record is a no-op. Any
    /// unhandled failure marks the record FAILED, logs a synthetic runtime
    /// issue, and is re-raised so the caller can surface it.
    pub async fn process_import(&self, import_id: Uuid, user_id: Uuid) -> Result<()> {
        let record = db::imports::load_import(&self.db, import_id, user_id)
            .await?
            .ok_or_else(|| anyhow!("Import not found: {}", import_id))?;

        if record.status.is_terminal() {
            tracing::info!(
                import_id = %import_id,
                status = record.status.as_str(),
                "Import already terminal, skipping"
            );
            return Ok(());
        }

        db::imports::mark_processing(&self.db, import_id).await?;
        tracing::info!(import_id = %import_id, "Import processing started");

        let mut summary = ImportSummary::default();

        match self.run_rows(&record, &mut summary).await {
            Ok(()) => {
                let status = if summary.failed_rows == 0 && summary.warning_rows == 0 {
                    ImportStatus::Completed
                } else {
                    ImportStatus::CompletedWithErrors
                };
                db::imports::mark_terminal(&self.db, import_id, status, &summary).await?;

                tracing::info!(
                    import_id = %import_id,
                    status = status.as_str(),
                    total = summary.total_rows,
                    imported = summary.imported_rows,
                    failed = summary.failed_rows,
                    warnings = summary.warning_rows,
                    "Import finished"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(import_id = %import_id, error = %e, "Import pipeline failed");

                // Represent the row in flight when the pipeline broke
                summary.failed_rows += 1;

                let issue = ImportIssue::new(
                    import_id,
                    1,
                    UNKNOWN_TITLE,
                    UNKNOWN_AUTHOR,
                    IssueSeverity::Error,
                    codes::IMPORT_RUNTIME_ERROR,
                    format!("Import aborted: {}", e),
                );
                if let Err(log_err) = db::issues::insert_issue(&self.db, &issue).await {
                    tracing::error!(
                        import_id = %import_id,
                        error = %log_err,
                        "Failed to record runtime-error issue"
                    );
                }

                if let Err(mark_err) =
                    db::imports::mark_terminal(&self.db, import_id, ImportStatus::Failed, &summary)
                        .await
                {
                    tracing::error!(
                        import_id = %import_id,
                        error = %mark_err,
                        "Failed to mark import as failed"
                    );
                }

                Err(e)
            }
        }
    }

    async fn run_rows(&self, record: &ImportRecord, summary: &mut ImportSummary) -> Result<()> {
        let rows = csv::parse_goodreads_csv(&record.csv_payload)?;
        summary.total_rows = rows.len() as i64;
        db::imports::save_counters(&self.db, record.import_id, summary).await?;

        let today = Utc::now().date_naive();

        for (index, row) in rows.iter().enumerate() {
            // Header occupies row 1, so the first data row is row 2
            let row_number = index as i64 + 2;
            self.process_row(record, row, row_number, today, summary)
                .await?;
            db::imports::save_counters(&self.db, record.import_id, summary).await?;
        }

        Ok(())
    }

    async fn process_row(
        &self,
        record: &ImportRecord,
        row: &CsvRow,
        row_number: i64,
        today: chrono::NaiveDate,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let title = display_value(row.get("Title"), UNKNOWN_TITLE);
        let author = display_value(row.get("Author"), UNKNOWN_AUTHOR);

        let plan = planner::plan_row(row, &record.options, today);
        let attempts = resolve::attempts_for_row(row);
        let resolution = resolve::resolve_book_key(self.catalog.as_ref(), &attempts).await;

        for warning in &plan.warnings {
            let issue = ImportIssue::new(
                record.import_id,
                row_number,
                &title,
                &author,
                IssueSeverity::Warning,
                warning.code,
                warning.message.clone(),
            )
            .with_inference(warning.inference.clone())
            .with_raw_row(Some(row.to_json()));
            db::issues::insert_issue(&self.db, &issue).await?;
            summary.warning_rows += 1;
        }

        let Some(book_key) = resolution.book_key else {
            let reason = resolve::failure_reason(&resolution.outcomes);
            let (code, message) = match reason {
                LookupFailure::RateLimited => (
                    codes::HARDCOVER_RATE_LIMITED,
                    "Catalog rate limit reached while resolving this book",
                ),
                LookupFailure::UpstreamError => (
                    codes::HARDCOVER_UNAVAILABLE,
                    "Catalog was unavailable while resolving this book",
                ),
                LookupFailure::NotFound => (
                    codes::BOOK_NOT_FOUND,
                    "No catalog entry matched this book's ISBNs or title/author",
                ),
            };

            let issue = ImportIssue::new(
                record.import_id,
                row_number,
                &title,
                &author,
                IssueSeverity::Error,
                code,
                message.to_string(),
            )
            .with_raw_row(Some(row.to_json()));
            db::issues::insert_issue(&self.db, &issue).await?;

            summary.failed_rows += 1;
            summary.processed_rows += 1;

            tracing::debug!(
                import_id = %record.import_id,
                row_number,
                code,
                "Row could not be resolved"
            );
            return Ok(());
        };

        // Best-effort fresh metadata for the resolved key; a failure here
        // degrades to seeding the metadata cache from the row itself so a
        // later detail view is never empty.
        if let Err(e) = self.catalog.hydrate_detail(&book_key).await {
            tracing::warn!(
                import_id = %record.import_id,
                row_number,
                book_key = %book_key,
                error = %e,
                "Metadata hydration failed, seeding from row"
            );

            self.catalog
                .seed_book_meta(BookMeta {
                    book_key: book_key.clone(),
                    title: title.clone(),
                    author: Some(author.clone()),
                    cover_url: None,
                })
                .await;

            let issue = ImportIssue::new(
                record.import_id,
                row_number,
                &title,
                &author,
                IssueSeverity::Warning,
                codes::HARDCOVER_METADATA_UNAVAILABLE,
                "Fresh catalog metadata was unavailable; stored the row's own title and author"
                    .to_string(),
            );
            db::issues::insert_issue(&self.db, &issue).await?;
            summary.warning_rows += 1;
        }

        match plan.target {
            TargetCollection::Reading => {
                self.merge_reading(record.user_id, &book_key, &plan).await?;
            }
            TargetCollection::Planned => {
                self.merge_planned(record, row_number, &title, &author, &book_key, summary)
                    .await?;
            }
        }

        summary.imported_rows += 1;
        summary.processed_rows += 1;
        Ok(())
    }

    /// Merge a reading-target row. Existing non-null values win over the
    /// plan's inferred ones, protecting prior manual edits; the planned
    /// queue entry for the same key is always removed.
    async fn merge_reading(&self, user_id: Uuid, book_key: &str, plan: &RowPlan) -> Result<()> {
        if let Some(existing) = db::entries::get_reading_entry(&self.db, user_id, book_key).await? {
            let merged_finish = existing.finished_at.or(plan.finished_at);
            let merged_judgment = existing.judgment.or(plan.judgment);

            if merged_finish != existing.finished_at || merged_judgment != existing.judgment {
                db::entries::update_reading_entry(
                    &self.db,
                    existing.entry_id,
                    merged_finish,
                    merged_judgment,
                )
                .await?;
            }
        } else {
            let now = Utc::now();
            db::entries::insert_reading_entry(
                &self.db,
                &ReadingEntry {
                    entry_id: Uuid::new_v4(),
                    user_id,
                    book_key: book_key.to_string(),
                    started_at: plan.started_at,
                    finished_at: plan.finished_at,
                    judgment: plan.judgment,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;
        }

        // Reading supersedes planned
        db::entries::delete_planned_entry(&self.db, user_id, book_key).await?;
        Ok(())
    }

    /// Merge a planned-target row. An existing reading record is never
    /// demoted; the row only logs a warning in that case.
    async fn merge_planned(
        &self,
        record: &ImportRecord,
        row_number: i64,
        title: &str,
        author: &str,
        book_key: &str,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let existing =
            db::entries::get_reading_entry(&self.db, record.user_id, book_key).await?;

        if existing.is_some() {
            let issue = ImportIssue::new(
                record.import_id,
                row_number,
                title,
                author,
                IssueSeverity::Warning,
                codes::READING_RECORD_ALREADY_EXISTS,
                "Already on the reading shelf; not moved back to the planned queue".to_string(),
            );
            db::issues::insert_issue(&self.db, &issue).await?;
            summary.warning_rows += 1;
            return Ok(());
        }

        db::entries::insert_planned_entry(&self.db, record.user_id, book_key).await?;
        Ok(())
    }
}

fn display_value(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
