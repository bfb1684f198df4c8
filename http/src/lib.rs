//! HTTP surface for the plugin catalog.
//!
//! Every endpoint reads through the [`SnapshotCache`], so a request after
//! the TTL has elapsed is the one that triggers regeneration.

pub mod api;
pub mod auth;
pub mod version;

use api::models::*;
use api::server::*;
use async_trait::async_trait;
use auth::{require_admin, AdminAuth};
use axum::http::header;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use plugin_catalog_core::present::{marketplace_items, marketplace_page};
use plugin_catalog_core::{CatalogEntry, Snapshot, SnapshotCache};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    cache: SnapshotCache,
    admin: AdminAuth,
}

impl AppState {
    /// State with administrative routes disabled.
    pub fn new(cache: SnapshotCache) -> Self {
        Self {
            cache,
            admin: AdminAuth::default(),
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin = AdminAuth::new(token);
        self
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    async fn snapshot(&self) -> Result<Arc<Snapshot>, ApiError> {
        self.cache.get_snapshot().await.map_err(unavailable)
    }

    async fn view_response(
        &self,
        select: impl FnOnce(&Snapshot) -> &[Arc<CatalogEntry>],
    ) -> Result<axum::response::Response, ApiError> {
        let snapshot = self.snapshot().await?;
        let items = marketplace_items(select(snapshot.as_ref()), self.cache.declarations().icons());
        Ok(cached_json(&snapshot, items))
    }
}

fn unavailable(e: anyhow::Error) -> ApiError {
    ApiError {
        status: 503,
        code: "unavailable".to_string(),
        message: format!("{:#}", e),
    }
}

/// JSON response cacheable until the snapshot goes stale.
fn cached_json<T: serde::Serialize>(snapshot: &Snapshot, body: T) -> axum::response::Response {
    let cache_control = format!("public, max-age={}", snapshot.remaining().as_secs());
    ([(header::CACHE_CONTROL, cache_control)], Json(body)).into_response()
}

#[async_trait]
impl CatalogServiceHandler for AppState {
    async fn get_marketplace(&self) -> Result<axum::response::Response, ApiError> {
        let snapshot = self.snapshot().await?;
        let page = marketplace_page(&snapshot, self.cache.declarations());
        Ok(cached_json(&snapshot, page))
    }

    async fn get_trending(&self) -> Result<axum::response::Response, ApiError> {
        self.view_response(|s| s.trending()).await
    }

    async fn get_recently_updated(&self) -> Result<axum::response::Response, ApiError> {
        self.view_response(|s| s.recently_updated()).await
    }

    async fn get_all(&self) -> Result<axum::response::Response, ApiError> {
        self.view_response(|s| s.all()).await
    }
}

#[async_trait]
impl SnapshotServiceHandler for AppState {
    async fn get_info(&self) -> Result<SnapshotInfo, ApiError> {
        let snapshot = self.snapshot().await?;
        Ok(SnapshotInfo {
            created_at: snapshot.created_at(),
            ttl_secs: snapshot.ttl().as_secs(),
            age_secs: snapshot.age().as_secs(),
            trending: snapshot.trending().len(),
            recently_updated: snapshot.recently_updated().len(),
            all: snapshot.all().len(),
            degraded: snapshot.degraded().to_vec(),
        })
    }

    async fn invalidate(&self) -> Result<InvalidateResponse, ApiError> {
        self.cache.invalidate();
        Ok(InvalidateResponse {
            status: "invalidated".to_string(),
        })
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "plugin-catalog".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let admin_routes = snapshot_admin_routes::<AppState>()
        .route_layer(middleware::from_fn_with_state(state.admin.clone(), require_admin));

    let router = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .merge(create_router::<AppState>())
        .merge(admin_routes);

    version::with_version_headers(router, env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
