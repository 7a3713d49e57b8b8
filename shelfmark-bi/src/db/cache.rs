//! Durable catalog cache table
//!
//! Key/value JSON payloads with an absolute expiry; reads apply the expiry
//! predicate so stale rows are simply invisible (they are overwritten on the
//! next write to the same key).

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use shelfmark_common::Result;

/// Read an unexpired cache payload
pub async fn cache_get(pool: &SqlitePool, cache_key: &str) -> Result<Option<String>> {
    let payload: Option<String> = sqlx::query_scalar(
        r#"
        SELECT payload
        FROM catalog_cache
        WHERE cache_key = ? AND expires_at > ?
        "#,
    )
    .bind(cache_key)
    .bind(Utc::now().to_rfc3339())
    .fetch_optional(pool)
    .await?;

    Ok(payload)
}

/// Upsert a cache payload with a TTL from now
pub async fn cache_put(
    pool: &SqlitePool,
    cache_key: &str,
    payload: &str,
    ttl: Duration,
) -> Result<()> {
    let expires_at = (Utc::now() + ttl).to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO catalog_cache (cache_key, payload, expires_at)
        VALUES (?, ?, ?)
        ON CONFLICT(cache_key) DO UPDATE SET
            payload = excluded.payload,
            expires_at = excluded.expires_at
        "#,
    )
    .bind(cache_key)
    .bind(payload)
    .bind(&expires_at)
    .execute(pool)
    .await?;

    Ok(())
}
