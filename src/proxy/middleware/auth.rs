// API Key authentication middleware
use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::proxy::server::AppState;

/// Key presented in `Authorization`, with an optional `Bearer ` prefix.
///
/// `None` only when the header is absent or empty; any other value (including
/// a non-ASCII one, read as `""`) counts as a presented key.
fn presented_key(request: &Request) -> Option<&str> {
    let raw = request.headers().get(header::AUTHORIZATION)?;
    if raw.is_empty() {
        return None;
    }
    let value = raw.to_str().unwrap_or_default();
    Some(value.strip_prefix("Bearer ").unwrap_or(value).trim())
}

/// API Key authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    tracing::info!("Request: {} {}", request.method(), request.uri());

    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    match presented_key(&request) {
        None => ProxyError::Auth("Missing API key".to_string()).into_response(),
        Some(key) if key != state.config.api_key => {
            tracing::warn!("Rejected request with invalid API key");
            ProxyError::Auth("Invalid API key".to_string()).into_response()
        }
        Some(_) => next.run(request).await,
    }
}
