//! Catalog client and resolver behavior against a mock GraphQL endpoint
//!
//! Exercises the retry/backoff policy, Retry-After handling, the
//! fail-immediately paths, and the alternate search strategy fallback.

use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfmark_bi::catalog::cache::{Cache, MemoryCache};
use shelfmark_bi::catalog::resolver::BookCatalog;
use shelfmark_bi::catalog::{CatalogClient, CatalogError, CatalogResolver};
use shelfmark_bi::models::{LookupFailure, LookupOutcome};

fn client_for(server: &MockServer) -> CatalogClient {
    CatalogClient::new(format!("{}/graphql", server.uri()), "test-token".to_string()).unwrap()
}

fn resolver_for(server: &MockServer) -> CatalogResolver {
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    CatalogResolver::new(Arc::new(client_for(server)), cache)
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;

    // Two transient failures, then a healthy response
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"books": [{"id": 42, "title": "Dune"}]}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data = client
        .execute("query { books { id title } }", json!({}))
        .await
        .unwrap();

    assert_eq!(data["books"][0]["id"], 42);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn retry_after_header_is_honored() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(
            ResponseTemplate::new(429).append_header("Retry-After", "2"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": true}})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let start = Instant::now();
    client.execute("query { ok }", json!({})).await.unwrap();

    // The second attempt had to wait out the advertised two seconds
    assert!(start.elapsed().as_millis() >= 2000);
}

#[tokio::test]
async fn graphql_errors_fail_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "permission denied"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.execute("query { ok }", json!({})).await.unwrap_err();

    assert!(matches!(err, CatalogError::Graph(_)));
}

#[tokio::test]
async fn client_errors_fail_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.execute("query { ok }", json!({})).await.unwrap_err();

    assert!(matches!(err, CatalogError::Upstream(_)));
}

#[tokio::test]
async fn schema_incompatible_primary_search_falls_back_to_alternate() {
    let server = MockServer::start().await;

    // Primary strategy is rejected by the deployed schema
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("search(query:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Unknown field 'search' on type 'query_root'"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Alternate strategy answers
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("_ilike"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "books": [{
                    "id": 42,
                    "title": "Dune",
                    "contributions": [{"author": {"name": "Frank Herbert"}}]
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let results = resolver.search("Dune").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].book_key, "hardcover:42");
}

#[tokio::test]
async fn search_results_are_served_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"search": {"results": {"hits": [
                {"document": {"id": "42", "title": "Dune",
                              "author_names": ["Frank Herbert"]}}
            ]}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let first = resolver.search("Dune").await.unwrap();
    // Same normalized query: answered from cache, not the provider
    let second = resolver.search("  DUNE ").await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].book_key, "hardcover:42");
}

#[tokio::test]
async fn isbn_resolution_maps_outcomes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("isbn_13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"books": [{"id": 100, "title": "Dune"}]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("isbn_10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"books": []}
        })))
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);

    let matched = resolver.resolve_by_isbn("9780441013593").await;
    assert_eq!(
        matched,
        LookupOutcome::Matched {
            book_key: "hardcover:100".to_string()
        }
    );

    let missed = resolver.resolve_by_isbn("0441013593").await;
    assert_eq!(
        missed,
        LookupOutcome::Failed {
            reason: LookupFailure::NotFound
        }
    );
}

#[tokio::test]
async fn title_search_below_threshold_is_not_found() {
    let server = MockServer::start().await;

    // Only a partial title hit with no author: combined score 2
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"search": {"results": {"hits": [
                {"document": {"id": "9", "title": "Dune Messiah"}}
            ]}}}
        })))
        .mount(&server)
        .await;

    let resolver = resolver_for(&server);
    let outcome = resolver.search_by_title_author("Dune", "").await;

    assert_eq!(
        outcome,
        LookupOutcome::Failed {
            reason: LookupFailure::NotFound
        }
    );
}
