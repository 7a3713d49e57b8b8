//! Hardcover GraphQL transport
//!
//! Every outbound call passes the shared rate limiter, carries a bounded
//! timeout, and is retried with capped exponential backoff plus jitter on
//! transient failures (timeouts, 429, 5xx). Non-retryable HTTP statuses and
//! GraphQL-level errors fail immediately.

use rand::Rng;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::ratelimit::RateLimiter;
use crate::models::LookupFailure;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Minimum spacing between any two provider requests, process-wide
const RATE_LIMIT_MS: u64 = 1000;
/// Retry ceiling per logical call
const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 8_000;
const JITTER_MS: u64 = 250;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Provider rate limit still active after retries
    #[error("Catalog rate limit exceeded")]
    RateLimited,

    /// Network failure, timeout, or HTTP error from the provider
    #[error("Catalog upstream error: {0}")]
    Upstream(String),

    /// GraphQL-level errors returned in an otherwise successful response
    #[error("Catalog GraphQL errors: {}", .0.join("; "))]
    Graph(Vec<String>),

    /// Response body did not match the expected shape
    #[error("Catalog response parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Collapse a client error into the lookup failure taxonomy: 429 or any
    /// "rate" wording maps to rate limiting, everything else is upstream.
    pub fn lookup_failure(&self) -> LookupFailure {
        match self {
            CatalogError::RateLimited => LookupFailure::RateLimited,
            other if other.to_string().to_lowercase().contains("rate") => {
                LookupFailure::RateLimited
            }
            _ => LookupFailure::UpstreamError,
        }
    }
}

/// Outcome of classifying a GraphQL error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphProbe {
    /// The query shape is not understood by the deployed schema
    SchemaIncompatible,
    /// Any other GraphQL failure
    Other,
}

/// Classify GraphQL error messages as a schema-shape mismatch or not.
///
/// The provider exposes no structured error codes, so this is a substring
/// heuristic kept isolated here rather than inside the retry loop.
pub fn classify_graph_errors(messages: &[String]) -> GraphProbe {
    let incompatible = messages.iter().any(|msg| {
        let msg = msg.to_lowercase();
        msg.contains("unknown field")
            || msg.contains("unknown argument")
            || msg.contains("validation-failure")
    });

    if incompatible {
        GraphProbe::SchemaIncompatible
    } else {
        GraphProbe::Other
    }
}

/// Rate-limited, retrying GraphQL client
pub struct CatalogClient {
    http_client: reqwest::Client,
    endpoint: String,
    token: String,
    rate_limiter: Arc<RateLimiter>,
}

impl CatalogClient {
    pub fn new(endpoint: String, token: String) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Upstream(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            token,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// Execute one GraphQL query, returning the `data` payload.
    ///
    /// Retries up to the attempt ceiling on timeouts, network failures,
    /// HTTP 429 and 5xx; honors `Retry-After` when the provider sends one.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value, CatalogError> {
        let body = json!({ "query": query, "variables": variables });
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.rate_limiter.wait().await;

            let response = self
                .http_client
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    // Timeout or network failure: retryable
                    if attempt >= MAX_ATTEMPTS {
                        return Err(CatalogError::Upstream(format!(
                            "request failed after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    let delay = backoff_delay(attempt, None);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Catalog request failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let retry_after = parse_retry_after(&response);

                if attempt >= MAX_ATTEMPTS {
                    return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                        CatalogError::RateLimited
                    } else {
                        CatalogError::Upstream(format!(
                            "status {} after {} attempts",
                            status, attempt
                        ))
                    });
                }

                let delay = backoff_delay(attempt, retry_after);
                tracing::warn!(
                    attempt,
                    status = status.as_u16(),
                    delay_ms = delay.as_millis() as u64,
                    "Catalog returned retryable status, will retry"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                // Non-retryable client error
                let text = response.text().await.unwrap_or_default();
                return Err(CatalogError::Upstream(format!(
                    "status {}: {}",
                    status, text
                )));
            }

            let payload: Value = response
                .json()
                .await
                .map_err(|e| CatalogError::Parse(e.to_string()))?;

            if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
                if !errors.is_empty() {
                    let messages = errors
                        .iter()
                        .map(|e| {
                            e.get("message")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown GraphQL error")
                                .to_string()
                        })
                        .collect();
                    return Err(CatalogError::Graph(messages));
                }
            }

            return payload
                .get("data")
                .cloned()
                .ok_or_else(|| CatalogError::Parse("response carried no data".to_string()));
        }
    }
}

/// Exponential backoff with jitter; an upstream Retry-After wins (capped).
fn backoff_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(retry_after) = retry_after {
        return retry_after.min(Duration::from_millis(BACKOFF_CAP_MS));
    }

    let exp = BACKOFF_BASE_MS
        .saturating_mul(1u64 << (attempt - 1).min(10))
        .min(BACKOFF_CAP_MS);
    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
    Duration::from_millis(exp + jitter)
}

fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_detects_schema_incompatibility() {
        let probe = classify_graph_errors(&[
            "Unknown field 'search' on type 'query_root'".to_string(),
        ]);
        assert_eq!(probe, GraphProbe::SchemaIncompatible);

        let probe = classify_graph_errors(&["validation-failure: bad selection".to_string()]);
        assert_eq!(probe, GraphProbe::SchemaIncompatible);

        let probe = classify_graph_errors(&["permission denied".to_string()]);
        assert_eq!(probe, GraphProbe::Other);
    }

    #[test]
    fn lookup_failure_classification() {
        assert_eq!(
            CatalogError::RateLimited.lookup_failure(),
            LookupFailure::RateLimited
        );
        assert_eq!(
            CatalogError::Graph(vec!["rate limit budget exhausted".to_string()]).lookup_failure(),
            LookupFailure::RateLimited
        );
        assert_eq!(
            CatalogError::Upstream("status 500".to_string()).lookup_failure(),
            LookupFailure::UpstreamError
        );
    }

    #[test]
    fn backoff_grows_and_caps() {
        let first = backoff_delay(1, None);
        assert!(first >= Duration::from_millis(BACKOFF_BASE_MS));
        assert!(first < Duration::from_millis(BACKOFF_BASE_MS + JITTER_MS));

        let capped = backoff_delay(10, None);
        assert!(capped <= Duration::from_millis(BACKOFF_CAP_MS + JITTER_MS));
    }

    #[test]
    fn retry_after_overrides_backoff() {
        let delay = backoff_delay(1, Some(Duration::from_secs(3)));
        assert_eq!(delay, Duration::from_secs(3));

        // Capped when the upstream asks for more than the ceiling
        let delay = backoff_delay(1, Some(Duration::from_secs(120)));
        assert_eq!(delay, Duration::from_millis(BACKOFF_CAP_MS));
    }
}
