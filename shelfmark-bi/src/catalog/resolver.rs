//! Catalog resolution operations
//!
//! Read-through caching over the GraphQL client: search, book detail,
//! series detail, and the two lookup wrappers the import pipeline drives.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::cache::Cache;
use crate::catalog::client::{classify_graph_errors, CatalogClient, CatalogError, GraphProbe};
use crate::catalog::queries;
use crate::models::catalog::parse_book_key;
use crate::models::{BookDetail, BookMeta, LookupFailure, LookupOutcome, SearchResult, SeriesDetail};

const SEARCH_TTL: Duration = Duration::from_secs(6 * 60 * 60);
const DETAIL_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const SERIES_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Catalog identity rarely changes; metadata entries are near-permanent
const META_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Exact case-insensitive title match
const EXACT_TITLE_SCORE: i32 = 4;
/// Substring title match, either direction
const PARTIAL_TITLE_SCORE: i32 = 2;
/// Author substring hit, either direction
const AUTHOR_SCORE: i32 = 3;
/// Candidates scoring below this are treated as no match
const MIN_MATCH_SCORE: i32 = 3;

/// How `get_detail` is allowed to resolve
#[derive(Debug, Clone, Copy)]
pub struct DetailFetch {
    pub allow_remote_fetch: bool,
    /// Skip both cache tiers and query the provider
    pub force_remote_fetch: bool,
    pub allow_metadata_fallback: bool,
}

impl Default for DetailFetch {
    fn default() -> Self {
        Self {
            allow_remote_fetch: true,
            force_remote_fetch: false,
            allow_metadata_fallback: true,
        }
    }
}

/// The catalog operations the import pipeline depends on
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Resolve an already-normalized ISBN (10 or 13 digits) to a book key
    async fn resolve_by_isbn(&self, isbn: &str) -> LookupOutcome;

    /// Fuzzy title/author search resolution
    async fn search_by_title_author(&self, title: &str, author: &str) -> LookupOutcome;

    /// Fetch fresh detail from the provider, bypassing caches
    async fn hydrate_detail(&self, book_key: &str) -> Result<BookDetail, CatalogError>;

    /// Seed the long-TTL metadata cache
    async fn seed_book_meta(&self, meta: BookMeta);
}

/// Cache-fronted catalog resolver
pub struct CatalogResolver {
    client: Arc<CatalogClient>,
    cache: Arc<dyn Cache>,
}

impl CatalogResolver {
    pub fn new(client: Arc<CatalogClient>, cache: Arc<dyn Cache>) -> Self {
        Self { client, cache }
    }

    /// Search the catalog, trying the alternate query strategy when the
    /// deployed schema rejects the primary one.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CatalogError> {
        let normalized = query.trim().to_lowercase();
        let cache_key = format!("search:{}", normalized);

        if let Some(payload) = self.cache.get(&cache_key).await {
            if let Ok(results) = serde_json::from_str::<Vec<SearchResult>>(&payload) {
                return Ok(results);
            }
        }

        let results = match self
            .client
            .execute(queries::SEARCH_PRIMARY, json!({ "query": normalized }))
            .await
        {
            Ok(data) => queries::map_primary_search(data)?,
            Err(CatalogError::Graph(messages))
                if classify_graph_errors(&messages) == GraphProbe::SchemaIncompatible =>
            {
                tracing::warn!(
                    query = %normalized,
                    "Primary search strategy rejected by schema, using alternate"
                );
                let data = self
                    .client
                    .execute(
                        queries::SEARCH_ALTERNATE,
                        json!({ "pattern": format!("%{}%", normalized) }),
                    )
                    .await?;
                queries::map_alternate_search(data)?
            }
            Err(e) => return Err(e),
        };

        if let Ok(payload) = serde_json::to_string(&results) {
            self.cache.put(&cache_key, payload, SEARCH_TTL).await;
        }

        // Opportunistically seed lightweight metadata from results so later
        // detail views have something to show without another provider call.
        let cache = Arc::clone(&self.cache);
        let metas: Vec<BookMeta> = results.iter().map(BookMeta::from).collect();
        tokio::spawn(async move {
            for meta in metas {
                seed_meta(cache.as_ref(), &meta).await;
            }
        });

        Ok(results)
    }

    /// Three-tier detail resolution: cached detail, seeded metadata, remote
    /// fetch. A disallowed remote fetch (or an unparseable key) degrades to
    /// a stub detail carrying only the key as title.
    pub async fn get_detail(
        &self,
        book_key: &str,
        fetch: DetailFetch,
    ) -> Result<BookDetail, CatalogError> {
        let detail_key = format!("detail:{}", book_key);

        if !fetch.force_remote_fetch {
            if let Some(payload) = self.cache.get(&detail_key).await {
                if let Ok(detail) = serde_json::from_str::<BookDetail>(&payload) {
                    return Ok(detail);
                }
            }

            if fetch.allow_metadata_fallback {
                let meta_key = format!("book-meta:{}", book_key);
                if let Some(payload) = self.cache.get(&meta_key).await {
                    if let Ok(meta) = serde_json::from_str::<BookMeta>(&payload) {
                        return Ok(meta.into_detail());
                    }
                }
            }
        }

        let Some(id) = parse_book_key(book_key) else {
            return Ok(BookDetail::stub(book_key));
        };

        if !fetch.allow_remote_fetch {
            return Ok(BookDetail::stub(book_key));
        }

        let data = self
            .client
            .execute(queries::BOOK_DETAIL, json!({ "id": id }))
            .await?;

        let detail = queries::map_detail(data)?
            .ok_or_else(|| CatalogError::Upstream(format!("book {} missing upstream", id)))?;

        if let Ok(payload) = serde_json::to_string(&detail) {
            self.cache.put(&detail_key, payload, DETAIL_TTL).await;
        }
        seed_meta(
            self.cache.as_ref(),
            &BookMeta {
                book_key: detail.book_key.clone(),
                title: detail.title.clone(),
                author: detail.author.clone(),
                cover_url: detail.cover_url.clone(),
            },
        )
        .await;

        Ok(detail)
    }

    /// Cache-or-fetch series detail; members arrive ordered and their
    /// metadata is seeded for later detail views.
    pub async fn get_series_detail(
        &self,
        series_id: i64,
    ) -> Result<Option<SeriesDetail>, CatalogError> {
        let cache_key = format!("series:{}", series_id);

        if let Some(payload) = self.cache.get(&cache_key).await {
            if let Ok(series) = serde_json::from_str::<SeriesDetail>(&payload) {
                return Ok(Some(series));
            }
        }

        let data = self
            .client
            .execute(queries::SERIES_DETAIL, json!({ "id": series_id }))
            .await?;

        let Some(series) = queries::map_series(data)? else {
            return Ok(None);
        };

        if let Ok(payload) = serde_json::to_string(&series) {
            self.cache.put(&cache_key, payload, SERIES_TTL).await;
        }

        for member in &series.books {
            seed_meta(
                self.cache.as_ref(),
                &BookMeta {
                    book_key: member.book_key.clone(),
                    title: member.title.clone(),
                    author: member.author.clone(),
                    cover_url: None,
                },
            )
            .await;
        }

        Ok(Some(series))
    }
}

async fn seed_meta(cache: &dyn Cache, meta: &BookMeta) {
    let meta_key = format!("book-meta:{}", meta.book_key);
    if let Ok(payload) = serde_json::to_string(meta) {
        cache.put(&meta_key, payload, META_TTL).await;
    }
}

#[async_trait]
impl BookCatalog for CatalogResolver {
    async fn resolve_by_isbn(&self, isbn: &str) -> LookupOutcome {
        let query = if isbn.len() == 13 {
            queries::BOOK_BY_ISBN13
        } else {
            queries::BOOK_BY_ISBN10
        };

        match self.client.execute(query, json!({ "isbn": isbn })).await {
            Ok(data) => match queries::map_isbn_match(data) {
                Ok(Some(book_key)) => LookupOutcome::Matched { book_key },
                Ok(None) => LookupOutcome::Failed {
                    reason: LookupFailure::NotFound,
                },
                Err(e) => LookupOutcome::Failed {
                    reason: e.lookup_failure(),
                },
            },
            Err(e) => LookupOutcome::Failed {
                reason: e.lookup_failure(),
            },
        }
    }

    async fn search_by_title_author(&self, title: &str, author: &str) -> LookupOutcome {
        let results = match self.search(title).await {
            Ok(results) => results,
            Err(e) => {
                return LookupOutcome::Failed {
                    reason: e.lookup_failure(),
                }
            }
        };

        match best_match(&results, title, author) {
            Some(result) => LookupOutcome::Matched {
                book_key: result.book_key.clone(),
            },
            None => LookupOutcome::Failed {
                reason: LookupFailure::NotFound,
            },
        }
    }

    async fn hydrate_detail(&self, book_key: &str) -> Result<BookDetail, CatalogError> {
        self.get_detail(
            book_key,
            DetailFetch {
                allow_remote_fetch: true,
                force_remote_fetch: true,
                allow_metadata_fallback: false,
            },
        )
        .await
    }

    async fn seed_book_meta(&self, meta: BookMeta) {
        seed_meta(self.cache.as_ref(), &meta).await;
    }
}

/// Highest-scoring candidate at or above the acceptance threshold. Ties keep
/// the first candidate in provider-returned order.
pub fn best_match<'a>(
    results: &'a [SearchResult],
    title: &str,
    author: &str,
) -> Option<&'a SearchResult> {
    let mut best: Option<(&SearchResult, i32)> = None;

    for result in results {
        let score = match_score(result, title, author);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((result, score));
        }
    }

    best.and_then(|(result, score)| (score >= MIN_MATCH_SCORE).then_some(result))
}

fn match_score(candidate: &SearchResult, title: &str, author: &str) -> i32 {
    let mut score = 0;

    let want_title = title.trim().to_lowercase();
    let got_title = candidate.title.trim().to_lowercase();
    if !want_title.is_empty() && !got_title.is_empty() {
        if got_title == want_title {
            score += EXACT_TITLE_SCORE;
        } else if got_title.contains(&want_title) || want_title.contains(&got_title) {
            score += PARTIAL_TITLE_SCORE;
        }
    }

    let want_author = author.trim().to_lowercase();
    if !want_author.is_empty() {
        if let Some(got_author) = &candidate.author {
            let got_author = got_author.trim().to_lowercase();
            if !got_author.is_empty()
                && (got_author.contains(&want_author) || want_author.contains(&got_author))
            {
                score += AUTHOR_SCORE;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, author: Option<&str>) -> SearchResult {
        SearchResult {
            book_key: format!("hardcover:{}", title.len()),
            title: title.to_string(),
            author: author.map(String::from),
            cover_url: None,
            release_year: None,
        }
    }

    #[test]
    fn exact_title_scores_four() {
        let candidate = result("Dune", None);
        assert_eq!(match_score(&candidate, "dune", ""), 4);
    }

    #[test]
    fn substring_title_scores_two_and_is_rejected_alone() {
        let candidates = vec![result("Dune Messiah", None)];
        assert_eq!(match_score(&candidates[0], "dune", ""), 2);
        // Combined score 2 is below the acceptance threshold
        assert!(best_match(&candidates, "dune", "").is_none());
    }

    #[test]
    fn author_hit_lifts_partial_title_over_threshold() {
        let candidates = vec![result("Dune Messiah", Some("Frank Herbert"))];
        assert_eq!(
            match_score(&candidates[0], "dune", "frank herbert"),
            2 + 3
        );
        assert!(best_match(&candidates, "dune", "frank herbert").is_some());
    }

    #[test]
    fn author_alone_scores_three_and_is_accepted() {
        let candidate = result("Completely Different", Some("Frank Herbert"));
        assert_eq!(match_score(&candidate, "dune", "herbert"), 3);
    }

    #[test]
    fn tie_keeps_provider_order() {
        let candidates = vec![
            result("Dune", Some("Someone Else")),
            result("Dune", Some("Another Person")),
        ];
        let best = best_match(&candidates, "dune", "").unwrap();
        assert_eq!(best.book_key, candidates[0].book_key);
    }

    #[test]
    fn empty_inputs_never_match() {
        let candidates = vec![result("", None)];
        assert!(best_match(&candidates, "", "").is_none());
    }
}
