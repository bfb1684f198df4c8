//! Handler traits and routers for the catalog API.
//!
//! Implement the handler traits and mount [`create_router`].

use super::models::*;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[async_trait]
pub trait CatalogServiceHandler: Send + Sync + 'static {
    async fn get_marketplace(&self) -> Result<axum::response::Response, ApiError>;
    async fn get_trending(&self) -> Result<axum::response::Response, ApiError>;
    async fn get_recently_updated(&self) -> Result<axum::response::Response, ApiError>;
    async fn get_all(&self) -> Result<axum::response::Response, ApiError>;
}

async fn catalog_service_get_marketplace<S: CatalogServiceHandler>(
    State(state): State<Arc<S>>,
) -> Result<axum::response::Response, ApiError> {
    state.get_marketplace().await
}

async fn catalog_service_get_trending<S: CatalogServiceHandler>(
    State(state): State<Arc<S>>,
) -> Result<axum::response::Response, ApiError> {
    state.get_trending().await
}

async fn catalog_service_get_recently_updated<S: CatalogServiceHandler>(
    State(state): State<Arc<S>>,
) -> Result<axum::response::Response, ApiError> {
    state.get_recently_updated().await
}

async fn catalog_service_get_all<S: CatalogServiceHandler>(
    State(state): State<Arc<S>>,
) -> Result<axum::response::Response, ApiError> {
    state.get_all().await
}

pub fn catalog_service_routes<S: CatalogServiceHandler>() -> Router<Arc<S>> {
    Router::new()
        .route("/v1/marketplace.json", get(catalog_service_get_marketplace::<S>))
        .route("/v1/plugins/trending.json", get(catalog_service_get_trending::<S>))
        .route("/v1/plugins/recent.json", get(catalog_service_get_recently_updated::<S>))
        .route("/v1/plugins/all.json", get(catalog_service_get_all::<S>))
}

#[async_trait]
pub trait SnapshotServiceHandler: Send + Sync + 'static {
    async fn get_info(&self) -> Result<SnapshotInfo, ApiError>;
    async fn invalidate(&self) -> Result<InvalidateResponse, ApiError>;
}

async fn snapshot_service_get_info<S: SnapshotServiceHandler>(
    State(state): State<Arc<S>>,
) -> Result<Json<SnapshotInfo>, ApiError> {
    let result = state.get_info().await?;
    Ok(Json(result))
}

async fn snapshot_service_invalidate<S: SnapshotServiceHandler>(
    State(state): State<Arc<S>>,
) -> Result<(StatusCode, Json<InvalidateResponse>), ApiError> {
    let result = state.invalidate().await?;
    Ok((StatusCode::ACCEPTED, Json(result)))
}

pub fn snapshot_service_routes<S: SnapshotServiceHandler>() -> Router<Arc<S>> {
    Router::new().route("/v1/snapshot.json", get(snapshot_service_get_info::<S>))
}

/// Routes that change server state. Mount behind an authentication layer.
pub fn snapshot_admin_routes<S: SnapshotServiceHandler>() -> Router<Arc<S>> {
    Router::new().route("/v1/snapshot/invalidate", post(snapshot_service_invalidate::<S>))
}

/// Public read-only routes.
pub fn create_router<S: CatalogServiceHandler + SnapshotServiceHandler>() -> Router<Arc<S>> {
    Router::new()
        .merge(catalog_service_routes())
        .merge(snapshot_service_routes())
}
