use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy shared by the translator and the HTTP layer.
///
/// The `Display` text of the translator-level variants is exactly what the
/// client sees inside an error chunk.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Failed to create conversation")]
    ConversationCreationFailed,

    #[error("HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("JSONDecodeError: {0}")]
    UpstreamParse(String),

    #[error("{0}")]
    UpstreamNetwork(String),

    #[error("TimeoutError: no upstream data for {0}s")]
    IdleTimeout(u64),

    #[error("{0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Wrap a transport error as `<Kind>: <message>`.
    pub fn network(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "TimeoutError"
        } else if e.is_connect() {
            "ConnectError"
        } else if e.is_body() || e.is_decode() {
            "BodyError"
        } else {
            "NetworkError"
        };
        ProxyError::UpstreamNetwork(format!("{}: {}", kind, e))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Auth(_) => StatusCode::UNAUTHORIZED,
            ProxyError::UnsupportedModel(_) | ProxyError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::ConversationCreationFailed
            | ProxyError::UpstreamHttp { .. }
            | ProxyError::UpstreamParse(_)
            | ProxyError::UpstreamNetwork(_) => StatusCode::BAD_GATEWAY,
            ProxyError::IdleTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Config(_) | ProxyError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
