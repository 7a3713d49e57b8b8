//! shelfmark-bi - Book Ingest service
//!
//! Imports Goodreads CSV exports into Shelfmark reading/planned collections,
//! reconciling each row against the Hardcover catalog.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shelfmark_bi::catalog::cache::{Cache, DurableCache, MemoryCache, TieredCache};
use shelfmark_bi::catalog::{CatalogClient, CatalogResolver};
use shelfmark_bi::import::ImportOrchestrator;
use shelfmark_bi::AppState;

const LISTEN_ADDR: &str = "127.0.0.1:5741";
const DEFAULT_CATALOG_ENDPOINT: &str = "https://api.hardcover.app/v1/graphql";

#[tokio::main]
async fn main() -> Result<()> {
    let toml_config = shelfmark_common::config::load_toml_config()?;

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting shelfmark-bi (Book Ingest) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let root_folder = shelfmark_common::config::resolve_root_folder(&toml_config);
    let db_path = root_folder.join("shelfmark.db");
    info!("Database: {}", db_path.display());

    let db_pool = shelfmark_bi::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let endpoint = toml_config
        .catalog_endpoint
        .clone()
        .unwrap_or_else(|| DEFAULT_CATALOG_ENDPOINT.to_string());
    let token = shelfmark_common::config::resolve_catalog_token(&toml_config)?;

    let client = Arc::new(CatalogClient::new(endpoint, token)?);
    let cache: Arc<dyn Cache> = Arc::new(TieredCache::new(
        Arc::new(MemoryCache::new()),
        Arc::new(DurableCache::new(db_pool.clone())),
    ));
    let resolver = Arc::new(CatalogResolver::new(client, cache));
    info!("Catalog resolver initialized");

    let orchestrator = Arc::new(ImportOrchestrator::new(db_pool.clone(), resolver));
    let state = AppState::new(db_pool, orchestrator);

    let app = shelfmark_bi::build_router(state);

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    info!("Listening on http://{}", LISTEN_ADDR);

    axum::serve(listener, app).await?;

    Ok(())
}
