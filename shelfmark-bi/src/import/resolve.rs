//! Book key resolution for import rows
//!
//! Attempts run strictly in order (ISBN-13, ISBN-10, then the universal
//! title/author fallback), short-circuiting on the first match. Every
//! outcome is kept so an unresolved row can be classified by the strongest
//! failure seen anywhere in the chain.

use crate::catalog::resolver::BookCatalog;
use crate::import::csv::CsvRow;
use crate::models::{LookupFailure, LookupOutcome};

/// One entry in the ordered lookup chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupAttempt {
    Isbn(String),
    TitleAuthor { title: String, author: String },
}

/// Resolution result plus the full outcome trail
#[derive(Debug, Clone)]
pub struct Resolution {
    pub book_key: Option<String>,
    pub outcomes: Vec<LookupOutcome>,
}

/// Strip Goodreads/Excel artifacts from an ISBN column value
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '=' | '-') && !c.is_whitespace())
        .collect();

    (!cleaned.is_empty()).then_some(cleaned)
}

/// Standard attempt chain for one import row
pub fn attempts_for_row(row: &CsvRow) -> Vec<LookupAttempt> {
    let mut attempts = Vec::new();

    if let Some(isbn13) = normalize_isbn(row.get("ISBN13")) {
        attempts.push(LookupAttempt::Isbn(isbn13));
    }
    if let Some(isbn10) = normalize_isbn(row.get("ISBN")) {
        attempts.push(LookupAttempt::Isbn(isbn10));
    }

    // Title/author search is always the last-resort attempt
    attempts.push(LookupAttempt::TitleAuthor {
        title: row.get("Title").trim().to_string(),
        author: row.get("Author").trim().to_string(),
    });

    attempts
}

/// Run the attempt chain, stopping at the first match
pub async fn resolve_book_key(
    catalog: &dyn BookCatalog,
    attempts: &[LookupAttempt],
) -> Resolution {
    let mut outcomes = Vec::with_capacity(attempts.len());

    for attempt in attempts {
        let outcome = match attempt {
            LookupAttempt::Isbn(isbn) => catalog.resolve_by_isbn(isbn).await,
            LookupAttempt::TitleAuthor { title, author } => {
                catalog.search_by_title_author(title, author).await
            }
        };

        let matched = match &outcome {
            LookupOutcome::Matched { book_key } => Some(book_key.clone()),
            LookupOutcome::Failed { .. } => None,
        };
        outcomes.push(outcome);

        if let Some(book_key) = matched {
            return Resolution {
                book_key: Some(book_key),
                outcomes,
            };
        }
    }

    Resolution {
        book_key: None,
        outcomes,
    }
}

/// Collapse a fully failed chain into one reason:
/// rate limiting beats upstream errors, which beat not-found.
pub fn failure_reason(outcomes: &[LookupOutcome]) -> LookupFailure {
    let mut saw_upstream = false;

    for outcome in outcomes {
        match outcome {
            LookupOutcome::Failed {
                reason: LookupFailure::RateLimited,
            } => return LookupFailure::RateLimited,
            LookupOutcome::Failed {
                reason: LookupFailure::UpstreamError,
            } => saw_upstream = true,
            _ => {}
        }
    }

    if saw_upstream {
        LookupFailure::UpstreamError
    } else {
        LookupFailure::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_excel_isbn_artifacts() {
        assert_eq!(
            normalize_isbn("=\"9780441013593\"").as_deref(),
            Some("9780441013593")
        );
        assert_eq!(
            normalize_isbn("978-0-441-01359-3").as_deref(),
            Some("9780441013593")
        );
        assert_eq!(normalize_isbn("=\"\""), None);
        assert_eq!(normalize_isbn("   "), None);
    }

    #[test]
    fn attempt_chain_orders_isbn13_first_and_search_last() {
        let row = CsvRow::from_pairs(&[
            ("Title", "Dune"),
            ("Author", "Frank Herbert"),
            ("ISBN", "=\"0441013593\""),
            ("ISBN13", "=\"9780441013593\""),
        ]);

        let attempts = attempts_for_row(&row);
        assert_eq!(
            attempts,
            vec![
                LookupAttempt::Isbn("9780441013593".to_string()),
                LookupAttempt::Isbn("0441013593".to_string()),
                LookupAttempt::TitleAuthor {
                    title: "Dune".to_string(),
                    author: "Frank Herbert".to_string(),
                },
            ]
        );
    }

    #[test]
    fn blank_isbns_leave_only_the_search_attempt() {
        let row = CsvRow::from_pairs(&[("Title", "Dune"), ("Author", "Frank Herbert")]);
        let attempts = attempts_for_row(&row);
        assert_eq!(attempts.len(), 1);
        assert!(matches!(attempts[0], LookupAttempt::TitleAuthor { .. }));
    }

    #[test]
    fn failure_precedence() {
        use LookupFailure::*;

        let failed = |reason| LookupOutcome::Failed { reason };

        assert_eq!(
            failure_reason(&[failed(NotFound), failed(RateLimited), failed(UpstreamError)]),
            RateLimited
        );
        assert_eq!(
            failure_reason(&[failed(UpstreamError), failed(NotFound)]),
            UpstreamError
        );
        assert_eq!(failure_reason(&[failed(NotFound)]), NotFound);
        assert_eq!(failure_reason(&[]), NotFound);
    }
}
