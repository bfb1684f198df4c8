use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

/// Stamp every response with the service name and version.
pub fn with_version_headers<S>(router: Router<S>, service: &'static str, version: &'static str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-service-name"),
            HeaderValue::from_static(service),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-service-version"),
            HeaderValue::from_static(version),
        ))
}
