//! Catalog provider data shapes
//!
//! Book keys are opaque provider-prefixed numeric ids ("hardcover:123").

use serde::{Deserialize, Serialize};

/// Prefix applied to provider numeric ids to form book keys
pub const BOOK_KEY_PREFIX: &str = "hardcover:";

/// Build a book key from a provider numeric id
pub fn book_key(id: i64) -> String {
    format!("{}{}", BOOK_KEY_PREFIX, id)
}

/// Parse the provider numeric id out of a book key
pub fn parse_book_key(key: &str) -> Option<i64> {
    key.strip_prefix(BOOK_KEY_PREFIX)?.parse().ok()
}

/// One catalog search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub book_key: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub release_year: Option<i32>,
}

/// Full book detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDetail {
    pub book_key: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub release_year: Option<i32>,
}

impl BookDetail {
    /// Minimal detail carrying only the key as title, used when neither a
    /// cached entry nor a remote fetch is available.
    pub fn stub(book_key: &str) -> Self {
        Self {
            book_key: book_key.to_string(),
            title: book_key.to_string(),
            author: None,
            description: None,
            cover_url: None,
            release_year: None,
        }
    }
}

/// Lightweight book facts seeded into the long-TTL metadata cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMeta {
    pub book_key: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
}

impl From<&SearchResult> for BookMeta {
    fn from(result: &SearchResult) -> Self {
        Self {
            book_key: result.book_key.clone(),
            title: result.title.clone(),
            author: result.author.clone(),
            cover_url: result.cover_url.clone(),
        }
    }
}

impl BookMeta {
    /// Expand metadata into a detail with the unavailable fields left empty
    pub fn into_detail(self) -> BookDetail {
        BookDetail {
            book_key: self.book_key,
            title: self.title,
            author: self.author,
            description: None,
            cover_url: self.cover_url,
            release_year: None,
        }
    }
}

/// Series detail with ordered member books
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDetail {
    pub series_id: i64,
    pub name: String,
    pub books: Vec<SeriesMember>,
}

/// One book within a series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesMember {
    pub book_key: String,
    pub title: String,
    pub author: Option<String>,
    pub position: Option<f64>,
    /// Provider popularity signal, used as an ordering tie-break
    pub readers: i64,
}

/// Why a single lookup attempt produced no book key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailure {
    NotFound,
    RateLimited,
    UpstreamError,
}

/// Result of one catalog resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Matched { book_key: String },
    Failed { reason: LookupFailure },
}
