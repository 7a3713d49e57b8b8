//! GraphQL query strategies and response mapping for the Hardcover schema
//!
//! Two search strategies exist because deployed schema revisions differ: the
//! primary strategy uses the `search` root field; when the deployed schema
//! rejects its shape, the alternate strategy filters the `books` table
//! directly.

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::client::CatalogError;
use crate::models::catalog::{book_key, SeriesMember};
use crate::models::{BookDetail, SearchResult, SeriesDetail};

/// Primary search strategy: provider-side full-text search
pub const SEARCH_PRIMARY: &str = r#"
query BookSearch($query: String!) {
  search(query: $query, query_type: "Book", per_page: 25) {
    results
  }
}
"#;

/// Alternate search strategy: direct table filter, for deployments whose
/// schema lacks the `search` field
pub const SEARCH_ALTERNATE: &str = r#"
query BookSearchDirect($pattern: String!) {
  books(where: {title: {_ilike: $pattern}}, order_by: {users_count: desc}, limit: 25) {
    id
    title
    release_year
    image { url }
    contributions { author { name } }
  }
}
"#;

pub const BOOK_DETAIL: &str = r#"
query BookDetail($id: Int!) {
  books_by_pk(id: $id) {
    id
    title
    description
    release_year
    image { url }
    contributions { author { name } }
  }
}
"#;

pub const BOOK_BY_ISBN13: &str = r#"
query BookByIsbn13($isbn: String!) {
  books(where: {editions: {isbn_13: {_eq: $isbn}}}, limit: 1) {
    id
    title
  }
}
"#;

pub const BOOK_BY_ISBN10: &str = r#"
query BookByIsbn10($isbn: String!) {
  books(where: {editions: {isbn_10: {_eq: $isbn}}}, limit: 1) {
    id
    title
  }
}
"#;

pub const SERIES_DETAIL: &str = r#"
query SeriesDetail($id: Int!) {
  series_by_pk(id: $id) {
    id
    name
    book_series {
      position
      book {
        id
        title
        users_count
        image { url }
        contributions { author { name } }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    search: SearchPayload,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    results: Value,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    document: SearchDocument,
}

#[derive(Debug, Deserialize)]
struct SearchDocument {
    id: String,
    title: String,
    #[serde(default)]
    author_names: Vec<String>,
    image: Option<ImageRef>,
    release_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BooksEnvelope {
    #[serde(default)]
    books: Vec<BookRow>,
}

#[derive(Debug, Deserialize)]
struct BookRow {
    id: i64,
    title: String,
    release_year: Option<i32>,
    image: Option<ImageRef>,
    #[serde(default)]
    contributions: Vec<Contribution>,
}

#[derive(Debug, Deserialize)]
struct Contribution {
    author: Option<AuthorRef>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    books_by_pk: Option<DetailRow>,
}

#[derive(Debug, Deserialize)]
struct DetailRow {
    id: i64,
    title: String,
    description: Option<String>,
    release_year: Option<i32>,
    image: Option<ImageRef>,
    #[serde(default)]
    contributions: Vec<Contribution>,
}

#[derive(Debug, Deserialize)]
struct IsbnEnvelope {
    #[serde(default)]
    books: Vec<IsbnRow>,
}

#[derive(Debug, Deserialize)]
struct IsbnRow {
    id: i64,
    #[allow(dead_code)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SeriesEnvelope {
    series_by_pk: Option<SeriesRow>,
}

#[derive(Debug, Deserialize)]
struct SeriesRow {
    id: i64,
    name: String,
    #[serde(default)]
    book_series: Vec<SeriesBookRow>,
}

#[derive(Debug, Deserialize)]
struct SeriesBookRow {
    position: Option<f64>,
    book: SeriesBookRef,
}

#[derive(Debug, Deserialize)]
struct SeriesBookRef {
    id: i64,
    title: String,
    #[serde(default)]
    users_count: i64,
    #[allow(dead_code)]
    image: Option<ImageRef>,
    #[serde(default)]
    contributions: Vec<Contribution>,
}

fn first_author(contributions: Vec<Contribution>) -> Option<String> {
    contributions
        .into_iter()
        .find_map(|c| c.author.map(|a| a.name))
}

/// Map a primary-strategy response
pub fn map_primary_search(data: Value) -> Result<Vec<SearchResult>, CatalogError> {
    let envelope: SearchEnvelope =
        serde_json::from_value(data).map_err(|e| CatalogError::Parse(e.to_string()))?;
    let hits: SearchHits = serde_json::from_value(envelope.search.results)
        .map_err(|e| CatalogError::Parse(e.to_string()))?;

    let results = hits
        .hits
        .into_iter()
        .filter_map(|hit| {
            let doc = hit.document;
            // Documents with a non-numeric id are not catalog books
            let id: i64 = doc.id.parse().ok()?;
            Some(SearchResult {
                book_key: book_key(id),
                title: doc.title,
                author: doc.author_names.into_iter().next(),
                cover_url: doc.image.and_then(|i| i.url),
                release_year: doc.release_year,
            })
        })
        .collect();

    Ok(results)
}

/// Map an alternate-strategy response
pub fn map_alternate_search(data: Value) -> Result<Vec<SearchResult>, CatalogError> {
    let envelope: BooksEnvelope =
        serde_json::from_value(data).map_err(|e| CatalogError::Parse(e.to_string()))?;

    Ok(envelope
        .books
        .into_iter()
        .map(|row| SearchResult {
            book_key: book_key(row.id),
            title: row.title,
            author: first_author(row.contributions),
            cover_url: row.image.and_then(|i| i.url),
            release_year: row.release_year,
        })
        .collect())
}

/// Map a detail response; `None` when the id is unknown upstream
pub fn map_detail(data: Value) -> Result<Option<BookDetail>, CatalogError> {
    let envelope: DetailEnvelope =
        serde_json::from_value(data).map_err(|e| CatalogError::Parse(e.to_string()))?;

    Ok(envelope.books_by_pk.map(|row| BookDetail {
        book_key: book_key(row.id),
        title: row.title,
        author: first_author(row.contributions),
        description: row.description,
        cover_url: row.image.and_then(|i| i.url),
        release_year: row.release_year,
    }))
}

/// Map an ISBN lookup response to the matched book key, if any
pub fn map_isbn_match(data: Value) -> Result<Option<String>, CatalogError> {
    let envelope: IsbnEnvelope =
        serde_json::from_value(data).map_err(|e| CatalogError::Parse(e.to_string()))?;

    Ok(envelope.books.first().map(|row| book_key(row.id)))
}

/// Map a series response with members ordered by ascending position, then
/// descending popularity, then title.
pub fn map_series(data: Value) -> Result<Option<SeriesDetail>, CatalogError> {
    let envelope: SeriesEnvelope =
        serde_json::from_value(data).map_err(|e| CatalogError::Parse(e.to_string()))?;

    let Some(row) = envelope.series_by_pk else {
        return Ok(None);
    };

    let mut books: Vec<SeriesMember> = row
        .book_series
        .into_iter()
        .map(|member| SeriesMember {
            book_key: book_key(member.book.id),
            title: member.book.title,
            author: first_author(member.book.contributions),
            position: member.position,
            readers: member.book.users_count,
        })
        .collect();

    books.sort_by(|a, b| {
        let pos_a = a.position.unwrap_or(f64::MAX);
        let pos_b = b.position.unwrap_or(f64::MAX);
        pos_a
            .partial_cmp(&pos_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.readers.cmp(&a.readers))
            .then_with(|| a.title.cmp(&b.title))
    });

    Ok(Some(SeriesDetail {
        series_id: row.id,
        name: row.name,
        books,
    }))
}
