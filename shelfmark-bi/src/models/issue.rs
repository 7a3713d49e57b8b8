//! Per-row import issue log entries
//!
//! Issues are append-only: created during row processing, never mutated, and
//! deleted only by cascade with their parent import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Warning => "warning",
            IssueSeverity::Error => "error",
        }
    }
}

/// Stable machine codes recorded on issues
pub mod codes {
    pub const INFERRED_START_DATE: &str = "INFERRED_START_DATE";
    pub const INFERRED_END_DATE: &str = "INFERRED_END_DATE";
    pub const INFERRED_STATUS: &str = "INFERRED_STATUS";
    pub const BOOK_NOT_FOUND: &str = "BOOK_NOT_FOUND";
    pub const HARDCOVER_RATE_LIMITED: &str = "HARDCOVER_RATE_LIMITED";
    pub const HARDCOVER_UNAVAILABLE: &str = "HARDCOVER_UNAVAILABLE";
    pub const HARDCOVER_METADATA_UNAVAILABLE: &str = "HARDCOVER_METADATA_UNAVAILABLE";
    pub const READING_RECORD_ALREADY_EXISTS: &str = "READING_RECORD_ALREADY_EXISTS";
    pub const IMPORT_RUNTIME_ERROR: &str = "IMPORT_RUNTIME_ERROR";
}

/// One audit-trail entry keyed to an import
#[derive(Debug, Clone, Serialize)]
pub struct ImportIssue {
    pub issue_id: Uuid,
    pub import_id: Uuid,
    /// 1-based CSV row number; the header is row 1, so the first data row is 2
    pub row_number: i64,
    pub title: String,
    pub author: String,
    pub severity: IssueSeverity,
    pub code: String,
    pub message: String,
    /// Short inference-rule string for audit (warnings only)
    pub inference: Option<String>,
    /// JSON snapshot of the raw CSV row
    pub raw_row: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ImportIssue {
    pub fn new(
        import_id: Uuid,
        row_number: i64,
        title: &str,
        author: &str,
        severity: IssueSeverity,
        code: &str,
        message: String,
    ) -> Self {
        Self {
            issue_id: Uuid::new_v4(),
            import_id,
            row_number,
            title: title.to_string(),
            author: author.to_string(),
            severity,
            code: code.to_string(),
            message,
            inference: None,
            raw_row: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_inference(mut self, inference: Option<String>) -> Self {
        self.inference = inference;
        self
    }

    pub fn with_raw_row(mut self, raw_row: Option<String>) -> Self {
        self.raw_row = raw_row;
        self
    }
}
