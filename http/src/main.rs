use anyhow::Result;
use plugin_catalog_core::{
    CatalogConfig, CatalogDeclarations, CatalogPipeline, NpmRegistryClient, RegistryFetcher,
    SnapshotCache,
};
use plugin_catalog_http::{build_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = CatalogConfig::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Starting Plugin Catalog HTTP server");
    info!("Declarations: {}", config.declarations_path.display());

    let declarations = Arc::new(CatalogDeclarations::load(&config.declarations_path).await?);
    info!(
        plugins = declarations.len(),
        icons = declarations.icons().len(),
        "Loaded plugin declarations"
    );

    let client = NpmRegistryClient::new(&config.registry_url, &config.downloads_url)?;
    let fetcher = RegistryFetcher::new(Arc::new(client), config.fetch_timeout);
    let cache = SnapshotCache::new(CatalogPipeline::new(declarations, fetcher), config.ttl);

    // Warm the cache so the first visitor does not pay for the fan-out.
    if let Err(e) = cache.get_snapshot().await {
        warn!(error = %format!("{:#}", e), "Initial catalog snapshot failed, will retry on request");
    }

    if config.admin_token.is_none() {
        info!("CATALOG_ADMIN_TOKEN not set, snapshot invalidation endpoint disabled");
    }

    let state = Arc::new(AppState::new(cache).with_admin_token(config.admin_token.clone()));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
