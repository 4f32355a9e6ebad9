// proxy module - OpenAI-compatible reverse proxy for the AI search service

pub mod config;
pub mod server;
pub mod session_manager;
pub mod translator;

pub mod handlers; // API endpoint handlers
pub mod mappers; // Protocol mappers
pub mod middleware; // Axum middleware
pub mod upstream; // Upstream client

pub use config::ProxyConfig;
pub use server::{build_router, AppState, AxumServer};
pub use session_manager::SessionManager;
pub use translator::Translator;
pub use upstream::client::UpstreamClient;
