//! Import record state machine
//!
//! An import progresses through a single forward path:
//! QUEUED → PROCESSING → {COMPLETED | COMPLETED_WITH_ERRORS | FAILED}
//!
//! There is no retry-in-place; a failed import is retried by creating a new
//! record. Terminal records are never reprocessed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelfmark_common::{Error, Result};
use uuid::Uuid;

/// Import lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Created, waiting for the background worker
    Queued,
    /// Rows are being processed
    Processing,
    /// Every row reconciled, no warnings or errors
    Completed,
    /// Pipeline ran to completion but some rows warned or failed
    CompletedWithErrors,
    /// The pipeline itself broke mid-run
    Failed,
}

impl ImportStatus {
    /// Terminal statuses are never reprocessed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStatus::Completed | ImportStatus::CompletedWithErrors | ImportStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Queued => "queued",
            ImportStatus::Processing => "processing",
            ImportStatus::Completed => "completed",
            ImportStatus::CompletedWithErrors => "completed_with_errors",
            ImportStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(ImportStatus::Queued),
            "processing" => Ok(ImportStatus::Processing),
            "completed" => Ok(ImportStatus::Completed),
            "completed_with_errors" => Ok(ImportStatus::CompletedWithErrors),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(Error::Internal(format!("Unknown import status: {}", other))),
        }
    }
}

/// Mapped outcome for one star rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingOutcome {
    Accepted,
    Rejected,
    Unjudged,
}

/// User-supplied import options, stored serialized on the record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Whether star ratings are mapped to judgments at all
    pub map_ratings: bool,
    /// 1–5 star mapping table
    #[serde(default)]
    pub ratings: RatingMap,
}

/// Star → judgment mapping table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingMap {
    pub star1: RatingOutcome,
    pub star2: RatingOutcome,
    pub star3: RatingOutcome,
    pub star4: RatingOutcome,
    pub star5: RatingOutcome,
}

impl Default for RatingMap {
    fn default() -> Self {
        Self {
            star1: RatingOutcome::Rejected,
            star2: RatingOutcome::Rejected,
            star3: RatingOutcome::Unjudged,
            star4: RatingOutcome::Accepted,
            star5: RatingOutcome::Accepted,
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            map_ratings: false,
            ratings: RatingMap::default(),
        }
    }
}

impl RatingMap {
    /// Look up the outcome for a clamped 1–5 star rating
    pub fn outcome_for(&self, stars: i64) -> RatingOutcome {
        match stars.clamp(1, 5) {
            1 => self.star1,
            2 => self.star2,
            3 => self.star3,
            4 => self.star4,
            _ => self.star5,
        }
    }
}

/// Running per-import counters, persisted after every row
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: i64,
    pub processed_rows: i64,
    pub imported_rows: i64,
    pub failed_rows: i64,
    pub warning_rows: i64,
}

/// One durable record per user-submitted CSV
#[derive(Debug, Clone, Serialize)]
pub struct ImportRecord {
    pub import_id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    /// Raw CSV payload kept verbatim so a retry import reparses identical input
    #[serde(skip_serializing)]
    pub csv_payload: String,
    pub options: ImportOptions,
    pub status: ImportStatus,
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportRecord {
    /// Create a new queued record
    pub fn new(user_id: Uuid, filename: String, csv_payload: String, options: ImportOptions) -> Self {
        let now = Utc::now();
        Self {
            import_id: Uuid::new_v4(),
            user_id,
            filename,
            csv_payload,
            options,
            status: ImportStatus::Queued,
            summary: ImportSummary::default(),
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
