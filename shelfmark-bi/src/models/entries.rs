//! Reading and planned-queue collection entries
//!
//! A given (user, book key) pair is never present in both collections at
//! once: moving a book into Reading removes it from Planned and vice versa.
//! The import orchestrator enforces this when merging rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shelfmark_common::{Error, Result};
use uuid::Uuid;

/// Post-reading verdict; absent means unjudged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    Accepted,
    Rejected,
}

impl Judgment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Judgment::Accepted => "accepted",
            Judgment::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "accepted" => Ok(Judgment::Accepted),
            "rejected" => Ok(Judgment::Rejected),
            other => Err(Error::Internal(format!("Unknown judgment: {}", other))),
        }
    }
}

/// A book the user has started, optionally finished
#[derive(Debug, Clone, Serialize)]
pub struct ReadingEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    /// Opaque provider-prefixed catalog identifier
    pub book_key: String,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
    pub judgment: Option<Judgment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A book the user intends to read
#[derive(Debug, Clone, Serialize)]
pub struct PlannedEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub book_key: String,
    pub created_at: DateTime<Utc>,
}
