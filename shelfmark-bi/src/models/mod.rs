//! Data models for shelfmark-bi (Book Ingest service)

pub mod catalog;
pub mod entries;
pub mod import_record;
pub mod issue;

pub use catalog::{BookDetail, BookMeta, LookupFailure, LookupOutcome, SearchResult, SeriesDetail};
pub use entries::{Judgment, PlannedEntry, ReadingEntry};
pub use import_record::{ImportOptions, ImportRecord, ImportStatus, ImportSummary, RatingOutcome};
pub use issue::{ImportIssue, IssueSeverity};
