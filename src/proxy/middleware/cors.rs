// CORS middleware
use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// `Access-Control-Allow-Origin: *` on every response; preflight is answered
/// here before auth runs.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
