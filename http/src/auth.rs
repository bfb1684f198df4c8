//! Bearer token guard for administrative routes.
//!
//! Administrative routes are disabled (404) unless a token is configured.

use crate::api::server::ApiError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

#[derive(Clone, Default)]
pub struct AdminAuth {
    pub token: Option<String>,
}

impl AdminAuth {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth")
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

fn error(status: u16, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        code: code.to_string(),
        message: message.to_string(),
    }
}

pub async fn require_admin(
    State(auth): State<AdminAuth>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = auth.token.as_deref() else {
        return Err(error(404, "not_found", "Administrative endpoints are disabled"));
    };

    let authorized = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected);

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated admin request");
        return Err(error(401, "unauthorized", "Missing or invalid bearer token"));
    }

    Ok(next.run(request).await)
}
