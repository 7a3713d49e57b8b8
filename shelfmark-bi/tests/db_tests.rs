//! Database initialization and cache-table behavior

use chrono::Duration;
use shelfmark_bi::db;

#[tokio::test]
async fn init_creates_database_file_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("shelfmark.db");

    let pool = db::init_database_pool(&db_path).await.unwrap();
    assert!(db_path.exists());

    // Schema is queryable immediately
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM imports")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn cache_respects_expiry_predicate() {
    let pool = db::init_memory_pool().await.unwrap();

    db::cache::cache_put(&pool, "search:dune", "[]", Duration::hours(6))
        .await
        .unwrap();
    assert_eq!(
        db::cache::cache_get(&pool, "search:dune").await.unwrap(),
        Some("[]".to_string())
    );

    // An already-expired entry is invisible
    db::cache::cache_put(&pool, "search:stale", "[]", Duration::seconds(-1))
        .await
        .unwrap();
    assert_eq!(db::cache::cache_get(&pool, "search:stale").await.unwrap(), None);
}

#[tokio::test]
async fn cache_put_overwrites_existing_key() {
    let pool = db::init_memory_pool().await.unwrap();

    db::cache::cache_put(&pool, "detail:hardcover:1", "{\"a\":1}", Duration::hours(1))
        .await
        .unwrap();
    db::cache::cache_put(&pool, "detail:hardcover:1", "{\"a\":2}", Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(
        db::cache::cache_get(&pool, "detail:hardcover:1")
            .await
            .unwrap(),
        Some("{\"a\":2}".to_string())
    );
}
